//! Network legs and HTTP status classification shared by the protocol flows.

use std::time::Duration;

use tracing::{debug, warn};

use super::error::{ProtocolError, ProtocolResult};
use crate::network::{ApiRequest, ApiResponse, NetworkError, Transport};

enum LegError {
    Timeout,
    Transport(NetworkError),
}

async fn send<T: Transport + ?Sized>(
    transport: &T,
    request: ApiRequest,
    deadline: Duration,
) -> Result<ApiResponse, LegError> {
    let path = request.path.clone();
    match tokio::time::timeout(deadline, transport.execute(request)).await {
        Err(_) | Ok(Err(NetworkError::Timeout)) => {
            warn!(%path, "request timed out");
            Err(LegError::Timeout)
        }
        Ok(Err(e)) => {
            warn!(%path, error = %e, "request failed");
            Err(LegError::Transport(e))
        }
        Ok(Ok(response)) => {
            debug!(%path, status = response.status, "response");
            Ok(response)
        }
    }
}

/// Sends a request outside an authenticated session. Every failure to
/// complete the exchange is a [`ProtocolError::TransientNetwork`].
pub(crate) async fn send_unauthenticated<T: Transport + ?Sized>(
    transport: &T,
    request: ApiRequest,
    deadline: Duration,
) -> ProtocolResult<ApiResponse> {
    send(transport, request, deadline)
        .await
        .map_err(|e| match e {
            LegError::Timeout => ProtocolError::TransientNetwork("request timed out".into()),
            LegError::Transport(e) => ProtocolError::TransientNetwork(e.to_string()),
        })
}

/// Sends an authenticated request. A timeout is a retryable server error so
/// callers keep their state for the next attempt.
pub(crate) async fn send_authenticated<T: Transport + ?Sized>(
    transport: &T,
    request: ApiRequest,
    deadline: Duration,
) -> ProtocolResult<ApiResponse> {
    send(transport, request, deadline)
        .await
        .map_err(|e| match e {
            LegError::Timeout => ProtocolError::RetryableServer { status: None },
            LegError::Transport(e) => ProtocolError::TransientNetwork(e.to_string()),
        })
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500..=599)
}

/// Error for a non-success answer outside a session (captcha, register).
pub(crate) fn unauthenticated_status_error(status: u16) -> ProtocolError {
    match status {
        401 | 403 => ProtocolError::CaptchaRejected,
        s if is_retryable_status(s) => {
            ProtocolError::TransientNetwork(format!("server returned {}", s))
        }
        s => ProtocolError::IncompatibleProtocol(format!("server returned {}", s)),
    }
}

/// Error for a non-success answer to an authenticated call.
pub(crate) fn authenticated_status_error(status: u16) -> ProtocolError {
    match status {
        401 | 403 => ProtocolError::ReauthenticationRequired,
        s if is_retryable_status(s) => ProtocolError::RetryableServer { status: Some(s) },
        410 | 426 => {
            ProtocolError::IncompatibleProtocol(format!("server returned {}", status))
        }
        s => ProtocolError::UnexpectedStatus(s),
    }
}
