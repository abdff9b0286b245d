// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Multi-pass aggregation and light certificate derivation.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::validation::{self, ValidCertificate, ValidationError};
use super::{
    HealthCertificate, LightDccRequest, LightDccResult, MultiPassFailure, MultiPassRequest,
    MultiPassResult,
};
use crate::api::call::{authenticated_status_error, send_authenticated};
use crate::api::{ClientConfig, DeviceContext, ProtocolError, ProtocolResult};
use crate::crypto::MacPrefix;
use crate::network::wire::{
    paths, ErrorBody, MultiPassAggregateResponseContent, MultiPassErrorResponse,
};
use crate::network::{ApiRequest, ApiResponse, Transport};
use crate::registration::{DeviceKeyPair, SharedSecret, KEY_DEVICE_PRIVATE};

/// Certificate operations against the aggregation server.
///
/// Calls are independent; any number may run concurrently with each other
/// and with a status sync.
pub struct CertificateAggregator<T: Transport> {
    ctx: Arc<DeviceContext>,
    transport: Arc<T>,
    config: ClientConfig,
}

impl<T: Transport> CertificateAggregator<T> {
    pub fn new(ctx: Arc<DeviceContext>, transport: Arc<T>, config: ClientConfig) -> Self {
        CertificateAggregator {
            ctx,
            transport,
            config,
        }
    }

    /// Checks a certificate's structure. Does not modify it.
    pub fn validate(&self, cert: &HealthCertificate) -> Result<ValidCertificate, ValidationError> {
        validation::validate(cert)
    }

    /// Builds a request bound to this device's public key.
    pub fn request_for(
        &self,
        certificates: Vec<ValidCertificate>,
    ) -> ProtocolResult<MultiPassRequest> {
        self.require_secret()?;
        let stored = self.ctx.key_store().load_key(KEY_DEVICE_PRIVATE)?;
        let bytes: [u8; 32] = stored
            .and_then(|b| b.try_into().ok())
            .ok_or(ProtocolError::NotRegistered)?;
        let pair = DeviceKeyPair::from_secret_bytes(bytes);
        Ok(MultiPassRequest::from_valid(
            pair.public_key_base64(),
            certificates,
        ))
    }

    /// Submits certificates for aggregation.
    ///
    /// A refusal is returned as [`MultiPassResult::Failure`], not as an
    /// error, so the caller can show per-certificate status.
    #[instrument(skip_all, fields(certificates = request.certificates.len()))]
    pub async fn aggregate(&self, request: &MultiPassRequest) -> ProtocolResult<MultiPassResult> {
        if request.certificates.is_empty() {
            return Err(ProtocolError::EmptyAggregate);
        }
        let secret = self.require_secret()?;

        let response = self
            .send(&secret, paths::MULTIPASS_AGGREGATE, MacPrefix::Aggregate, request)
            .await?;

        match response.status {
            200..=299 => {
                let content: MultiPassAggregateResponseContent =
                    response.parse().map_err(|e| {
                        ProtocolError::IncompatibleProtocol(format!("aggregate response: {}", e))
                    })?;
                info!("multi-pass issued");
                Ok(MultiPassResult::Success {
                    certificate: content.certificate,
                })
            }
            401 | 403 | 408 | 410 | 426 | 429 => Err(authenticated_status_error(response.status)),
            400..=499 => {
                let failure = parse_failure(&response, request.certificates.len())?;
                warn!(
                    status = failure.status,
                    refused = failure.failed_indices().len(),
                    "multi-pass refused"
                );
                Ok(MultiPassResult::Failure(failure))
            }
            status => Err(authenticated_status_error(status)),
        }
    }

    /// Asks the server for a light certificate derived from `original`.
    #[instrument(skip_all)]
    pub async fn derive_light_certificate(
        &self,
        key: &str,
        original: &HealthCertificate,
    ) -> ProtocolResult<LightDccResult> {
        let secret = self.require_secret()?;
        let request = LightDccRequest {
            key: key.to_string(),
            original_certificate: original.clone(),
        };

        let response = self
            .send(&secret, paths::LIGHT_DCC, MacPrefix::LightCertificate, &request)
            .await?;

        match response.status {
            200..=299 => {
                let result: LightDccResult = response.parse().map_err(|e| {
                    ProtocolError::IncompatibleProtocol(format!("light response: {}", e))
                })?;
                debug!("light certificate derived");
                Ok(result)
            }
            400 | 404 | 410 | 422 => {
                let body: ErrorBody = response.parse().unwrap_or_default();
                let reason = body
                    .message
                    .or(body.code)
                    .unwrap_or_else(|| "certificate rejected".to_string());
                warn!(status = response.status, "light certificate refused");
                Err(ProtocolError::DerivationRejected {
                    status: response.status,
                    reason,
                })
            }
            status => Err(authenticated_status_error(status)),
        }
    }

    fn require_secret(&self) -> ProtocolResult<SharedSecret> {
        self.ctx
            .current_secret()
            .ok_or(ProtocolError::NotRegistered)
    }

    async fn send<B: serde::Serialize>(
        &self,
        secret: &SharedSecret,
        path: &str,
        prefix: MacPrefix,
        body: &B,
    ) -> ProtocolResult<ApiResponse> {
        let request = ApiRequest::post_json(path, body)
            .map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        let payload = request.body.clone();
        let request = secret.authorize(request, prefix, self.ctx.clock().now(), &payload);
        send_authenticated(self.transport.as_ref(), request, self.config.request_timeout).await
    }
}

/// Reads a structured refusal. Only a body without a readable
/// `{status, errors}` envelope falls back to a failure carrying the HTTP
/// status and no per-certificate errors.
fn parse_failure(response: &ApiResponse, submitted: usize) -> ProtocolResult<MultiPassFailure> {
    let Ok(body) = response.parse::<MultiPassErrorResponse>() else {
        return Ok(MultiPassFailure {
            status: response.status,
            errors: Vec::new(),
        });
    };
    let errors = body.descriptors();
    if errors.len() > submitted {
        return Err(ProtocolError::IncompatibleProtocol(format!(
            "{} errors for {} certificates",
            errors.len(),
            submitted
        )));
    }
    Ok(MultiPassFailure {
        status: body.status,
        errors,
    })
}
