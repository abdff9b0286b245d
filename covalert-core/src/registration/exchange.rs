// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Captcha-gated key exchange with the server.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tracing::{debug, info, instrument, warn};

use super::captcha::CaptchaChallenge;
use super::keypair::DeviceKeyPair;
use super::secret::SharedSecret;
use super::{Registration, KEY_DEVICE_PRIVATE, KEY_REQUEST_AUTH};
use crate::api::call::{
    authenticated_status_error, send_authenticated, send_unauthenticated,
    unauthenticated_status_error,
};
use crate::api::{ClientConfig, CovAlertEvent, DeviceContext, ProtocolError, ProtocolResult};
use crate::crypto::MacPrefix;
use crate::network::wire::{
    paths, CaptchaCreateRequest, CaptchaCreateResponse, CaptchaKind, PushInfo, RegisterRequest,
    RegisterResponse,
};
use crate::network::{ApiRequest, Transport};

/// Registration and identity lifecycle for one device.
pub struct KeyExchange<T: Transport> {
    ctx: Arc<DeviceContext>,
    transport: Arc<T>,
    config: ClientConfig,
}

impl<T: Transport> KeyExchange<T> {
    pub fn new(ctx: Arc<DeviceContext>, transport: Arc<T>, config: ClientConfig) -> Self {
        KeyExchange {
            ctx,
            transport,
            config,
        }
    }

    /// Requests a captcha and downloads its payload.
    ///
    /// Only the network legs are timed; the caller may take as long as it
    /// needs to solve the challenge before calling [`register`](Self::register).
    #[instrument(skip(self))]
    pub async fn fetch_captcha(
        &self,
        kind: CaptchaKind,
        locale: &str,
    ) -> ProtocolResult<CaptchaChallenge> {
        let request = ApiRequest::post_json(paths::CAPTCHA, &CaptchaCreateRequest { kind, locale })
            .map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        let response =
            send_unauthenticated(self.transport.as_ref(), request, self.config.request_timeout)
                .await?;
        if !response.is_success() {
            return Err(unauthenticated_status_error(response.status));
        }
        let created: CaptchaCreateResponse = response.parse().map_err(|e| {
            ProtocolError::IncompatibleProtocol(format!("captcha response: {}", e))
        })?;
        if !paths::is_path_segment(&created.id) {
            return Err(ProtocolError::IncompatibleProtocol(
                "captcha id is not a plain path segment".into(),
            ));
        }

        let download = ApiRequest::get(paths::captcha_payload(&created.id, kind));
        let payload =
            send_unauthenticated(self.transport.as_ref(), download, self.config.request_timeout)
                .await?;
        if !payload.is_success() {
            return Err(unauthenticated_status_error(payload.status));
        }

        debug!(bytes = payload.body.len(), "captcha fetched");
        Ok(CaptchaChallenge::new(created.id, kind, payload.body))
    }

    /// Returns the device key pair, creating and storing it on first use.
    ///
    /// Calling again before registration returns the same pair. Once the
    /// device is registered this fails with `AlreadyRegistered`; the pair is
    /// never replaced.
    pub fn generate_key_pair(&self) -> ProtocolResult<DeviceKeyPair> {
        let _guard = self.ctx.key_lock();

        if self.ctx.is_registered() {
            return Err(ProtocolError::AlreadyRegistered);
        }

        let key_store = self.ctx.key_store();
        let existing = key_store
            .load_key(KEY_DEVICE_PRIVATE)
            .map_err(|e| ProtocolError::KeyGeneration(e.to_string()))?;

        if let Some(bytes) = existing {
            let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
                ProtocolError::KeyGeneration("stored private key has wrong length".into())
            })?;
            return Ok(DeviceKeyPair::from_secret_bytes(bytes));
        }

        let pair = DeviceKeyPair::generate();
        key_store
            .save_key(KEY_DEVICE_PRIVATE, pair.secret_bytes().as_ref())
            .map_err(|e| ProtocolError::KeyGeneration(e.to_string()))?;
        info!("device key pair created");
        Ok(pair)
    }

    /// Registers the device with a solved captcha and derives the shared
    /// secret.
    ///
    /// A rejected captcha fails with `CaptchaRejected`; fetch a new
    /// challenge. Network failures fail with `TransientNetwork` and leave
    /// the device unregistered.
    #[instrument(skip_all)]
    pub async fn register(
        &self,
        challenge: CaptchaChallenge,
        solved_answer: &str,
        push_info: Option<PushInfo>,
    ) -> ProtocolResult<SharedSecret> {
        let _gate = self.ctx.registration_gate().lock().await;

        if self.ctx.is_registered() {
            return Err(ProtocolError::AlreadyRegistered);
        }

        let pair = self.generate_key_pair()?;
        let body = RegisterRequest {
            captcha: solved_answer.to_string(),
            captcha_id: challenge.id().to_string(),
            client_public_ecdh_key: pair.public_key_base64(),
            push_info,
        };
        let request = ApiRequest::post_json(paths::REGISTER, &body)
            .map_err(|e| ProtocolError::Serialization(e.to_string()))?;

        let response =
            send_unauthenticated(self.transport.as_ref(), request, self.config.request_timeout)
                .await?;
        if !response.is_success() {
            let err = unauthenticated_status_error(response.status);
            warn!(status = response.status, "registration refused");
            return Err(err);
        }

        let registered: RegisterResponse = response.parse().map_err(|e| {
            ProtocolError::IncompatibleProtocol(format!("register response: {}", e))
        })?;
        let server_public_key = self.check_response(&registered)?;
        let mac_key = pair.derive_mac_key(&server_public_key).ok_or_else(|| {
            ProtocolError::IncompatibleProtocol("server key is a low-order point".into())
        })?;

        let registration = Registration {
            device_id: registered.device_id,
            server_public_key,
            protocol_version: self.config.protocol_version,
            registered_at: self.ctx.clock().now(),
        };

        {
            let _guard = self.ctx.key_lock();
            self.ctx
                .key_store()
                .save_key(KEY_REQUEST_AUTH, mac_key.as_bytes())?;
            self.ctx.storage().save_registration(&registration)?;
        }

        let secret = SharedSecret::new(registration.device_id.clone(), mac_key);
        self.ctx.set_secret(Some(secret.clone()));
        info!("device registered");
        self.ctx.emit(CovAlertEvent::Registered {
            device_id: registration.device_id,
        });
        Ok(secret)
    }

    fn check_response(&self, response: &RegisterResponse) -> ProtocolResult<[u8; 32]> {
        if let Some(version) = response.protocol_version {
            if version != self.config.protocol_version {
                return Err(ProtocolError::IncompatibleProtocol(format!(
                    "server speaks protocol {}, client {}",
                    version, self.config.protocol_version
                )));
            }
        }
        if response.device_id.is_empty() {
            return Err(ProtocolError::IncompatibleProtocol(
                "empty device id".into(),
            ));
        }
        BASE64
            .decode(&response.server_public_key)
            .ok()
            .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
            .ok_or_else(|| ProtocolError::IncompatibleProtocol("malformed server key".into()))
    }

    /// The shared secret, None before registration completes.
    pub fn current_secret(&self) -> Option<SharedSecret> {
        self.ctx.current_secret()
    }

    /// Tells the server to forget this device, then wipes local state.
    ///
    /// If the server no longer knows the device (401, 403, 404) the local
    /// wipe still happens.
    #[instrument(skip(self))]
    pub async fn unregister(&self) -> ProtocolResult<()> {
        let secret = self
            .ctx
            .current_secret()
            .ok_or(ProtocolError::NotRegistered)?;

        let request = ApiRequest::post_json(paths::UNREGISTER, &serde_json::json!({}))
            .map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        let body = request.body.clone();
        let request = secret.authorize(
            request,
            MacPrefix::Unregister,
            self.ctx.clock().now(),
            &body,
        );

        let response =
            send_authenticated(self.transport.as_ref(), request, self.config.request_timeout)
                .await?;
        match response.status {
            200..=299 => {}
            401 | 403 | 404 => warn!(status = response.status, "server no longer knows device"),
            status => return Err(authenticated_status_error(status)),
        }

        self.reset()
    }

    /// Wipes key pair, secret, registration, pending contacts and exposure
    /// status without contacting the server.
    pub fn reset(&self) -> ProtocolResult<()> {
        {
            let _guard = self.ctx.key_lock();
            let key_store = self.ctx.key_store();
            key_store.delete_key(KEY_REQUEST_AUTH)?;
            key_store.delete_key(KEY_DEVICE_PRIVATE)?;
            self.ctx.storage().wipe_protocol_state()?;
        }
        self.ctx.set_secret(None);
        info!("device identity wiped");
        self.ctx.emit(CovAlertEvent::Unregistered);
        Ok(())
    }
}
