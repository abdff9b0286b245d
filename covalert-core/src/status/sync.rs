// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Status sync protocol.

use std::borrow::Cow;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::{ExposureStatus, SyncPhase};
use crate::api::call::{authenticated_status_error, send_authenticated};
use crate::api::{ClientConfig, CovAlertEvent, DeviceContext, ProtocolError, ProtocolResult};
use crate::contact::{ContactBatch, ContactCodec};
use crate::crypto::MacPrefix;
use crate::network::wire::{paths, StatusRequest, StatusResponse};
use crate::network::{ApiRequest, Transport};
use crate::registration::SharedSecret;

/// Moves the device's phase forward and marks it `Failed` if dropped before
/// [`finish`](PhaseGuard::finish), which covers errors and cancelled futures.
struct PhaseGuard<'a> {
    ctx: &'a DeviceContext,
    done: bool,
}

impl<'a> PhaseGuard<'a> {
    fn enter(ctx: &'a DeviceContext) -> Self {
        ctx.set_phase(SyncPhase::Authenticating);
        PhaseGuard { ctx, done: false }
    }

    fn advance(&self, phase: SyncPhase) {
        self.ctx.set_phase(phase);
    }

    fn finish(mut self) {
        self.done = true;
        self.ctx.set_phase(SyncPhase::Idle);
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.ctx.set_phase(SyncPhase::Failed);
        }
    }
}

/// Submits contact batches and fetches exposure verdicts for one device.
///
/// At most one exchange runs per device. A call made while another is in
/// flight fails with `SyncInProgress` and leaves everything untouched.
pub struct StatusSync<T: Transport> {
    ctx: Arc<DeviceContext>,
    transport: Arc<T>,
    config: ClientConfig,
}

impl<T: Transport> StatusSync<T> {
    pub fn new(ctx: Arc<DeviceContext>, transport: Arc<T>, config: ClientConfig) -> Self {
        StatusSync {
            ctx,
            transport,
            config,
        }
    }

    /// Current phase of this device's exchange.
    pub fn phase(&self) -> SyncPhase {
        self.ctx.sync_phase()
    }

    /// Reports `batch` and returns the new verdict.
    ///
    /// On success the verdict is stored and `batch` is cleared under the
    /// storage lock. On any error `batch` is unchanged.
    #[instrument(skip_all, fields(records = batch.len()))]
    pub async fn submit_and_fetch_status(
        &self,
        batch: &mut ContactBatch,
    ) -> ProtocolResult<ExposureStatus> {
        let secret = self
            .ctx
            .current_secret()
            .ok_or(ProtocolError::NotRegistered)?;
        let _gate = self
            .ctx
            .sync_gate()
            .try_lock()
            .map_err(|_| ProtocolError::SyncInProgress)?;

        let phase = PhaseGuard::enter(&self.ctx);
        let status = match self.exchange(&secret, batch, &phase).await {
            Ok(status) => status,
            Err(e) => return Err(self.fail(phase, e)),
        };

        let reported = batch.len();
        {
            let storage = self.ctx.storage();
            if let Err(e) = storage.save_exposure_status(&status) {
                drop(storage);
                return Err(self.fail(phase, e.into()));
            }
            batch.clear();
        }

        self.succeed(phase, &status, reported);
        Ok(status)
    }

    /// Reports the device's persisted pending batch.
    ///
    /// Only the rows that were sent are deleted; contacts recorded while the
    /// exchange was in flight stay for the next report.
    #[instrument(skip_all)]
    pub async fn sync_pending(&self) -> ProtocolResult<ExposureStatus> {
        let secret = self
            .ctx
            .current_secret()
            .ok_or(ProtocolError::NotRegistered)?;
        let _gate = self
            .ctx
            .sync_gate()
            .try_lock()
            .map_err(|_| ProtocolError::SyncInProgress)?;

        let phase = PhaseGuard::enter(&self.ctx);
        let loaded = self.ctx.storage().load_pending_batch();
        let pending = match loaded {
            Ok(pending) => pending,
            Err(e) => return Err(self.fail(phase, e.into())),
        };

        let status = match self.exchange(&secret, &pending.batch, &phase).await {
            Ok(status) => status,
            Err(e) => return Err(self.fail(phase, e)),
        };

        let committed = self
            .ctx
            .storage()
            .commit_status_report(pending.through_id, &status);
        if let Err(e) = committed {
            return Err(self.fail(phase, e.into()));
        }

        self.succeed(phase, &status, pending.batch.len());
        Ok(status)
    }

    /// Asks the server to drop this device's exposure history, then clears
    /// the pending batch and the stored status.
    ///
    /// Waits for an in-flight status exchange to finish first.
    #[instrument(skip(self))]
    pub async fn delete_exposure_history(&self) -> ProtocolResult<()> {
        let secret = self
            .ctx
            .current_secret()
            .ok_or(ProtocolError::NotRegistered)?;
        let _gate = self.ctx.sync_gate().lock().await;

        let request = ApiRequest::post_json(paths::DELETE_EXPOSURE_HISTORY, &serde_json::json!({}))
            .map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        let body = request.body.clone();
        let request = secret.authorize(
            request,
            MacPrefix::DeleteExposureHistory,
            self.ctx.clock().now(),
            &body,
        );

        let response =
            send_authenticated(self.transport.as_ref(), request, self.config.request_timeout)
                .await?;
        if !response.is_success() {
            return Err(authenticated_status_error(response.status));
        }

        self.ctx.storage().clear_exposure_history()?;
        info!("exposure history deleted");
        self.ctx.emit(CovAlertEvent::ExposureHistoryDeleted);
        Ok(())
    }

    async fn exchange(
        &self,
        secret: &SharedSecret,
        batch: &ContactBatch,
        phase: &PhaseGuard<'_>,
    ) -> ProtocolResult<ExposureStatus> {
        let payload = ContactCodec::encode(batch);
        let body = StatusRequest {
            contacts: Cow::Borrowed(batch.records()),
        };
        let request = ApiRequest::post_json(paths::STATUS, &body)
            .map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        let request = secret.authorize(request, MacPrefix::Status, self.ctx.clock().now(), &payload);

        phase.advance(SyncPhase::Submitting);
        let response =
            send_authenticated(self.transport.as_ref(), request, self.config.request_timeout)
                .await?;

        phase.advance(SyncPhase::AwaitingVerdict);
        if !response.is_success() {
            return Err(authenticated_status_error(response.status));
        }
        let verdict: StatusResponse = response.parse().map_err(|e| {
            ProtocolError::IncompatibleProtocol(format!("status response: {}", e))
        })?;

        Ok(ExposureStatus {
            at_risk: verdict.at_risk,
            last_status_received_date: self.ctx.clock().now(),
            last_exposure_date: verdict.last_exposure_time,
        })
    }

    fn succeed(&self, phase: PhaseGuard<'_>, status: &ExposureStatus, reported: usize) {
        phase.finish();
        info!(reported, at_risk = status.at_risk, "status updated");
        self.ctx.emit(CovAlertEvent::StatusUpdated {
            status: status.clone(),
            reported,
        });
    }

    fn fail(&self, phase: PhaseGuard<'_>, error: ProtocolError) -> ProtocolError {
        drop(phase);
        warn!(error = %error, retryable = error.is_retryable(), "status sync failed");
        self.ctx.emit(CovAlertEvent::SyncFailed {
            error: error.to_string(),
            retryable: error.is_retryable(),
        });
        error
    }
}
