// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! API Error Types
//!
//! Unified error type for the protocol operations, grouped into categories
//! that tell the caller what kind of recovery applies.

use thiserror::Error;

use crate::certificate::ValidationError;
use crate::contact::{CodecError, ContactError, ProximityError};
use crate::storage::StorageError;

/// How a caller should react to a [`ProtocolError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller logic error. Not retried automatically.
    Precondition,
    /// Safe to retry with backoff; local state was preserved.
    Transient,
    /// An earlier protocol step (captcha, registration) must be re-run.
    Session,
    /// Surfaced to the user, never retried.
    Fatal,
}

/// Unified error type for protocol operations.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The secure key store could not create or persist the key pair.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// A registration already exists for this device.
    #[error("device already registered")]
    AlreadyRegistered,

    /// The server refused the captcha answer; fetch a new challenge.
    #[error("captcha rejected")]
    CaptchaRejected,

    /// The request never completed; retry with a fresh challenge or later.
    #[error("transient network failure: {0}")]
    TransientNetwork(String),

    /// The server speaks a protocol this client cannot.
    #[error("incompatible protocol: {0}")]
    IncompatibleProtocol(String),

    /// No shared secret yet.
    #[error("device not registered")]
    NotRegistered,

    /// Rate limit, 5xx-class answer or timeout. `status` is None on timeout.
    #[error("server temporarily unavailable (status {status:?})")]
    RetryableServer { status: Option<u16> },

    /// The server no longer accepts this device's secret.
    #[error("re-authentication required")]
    ReauthenticationRequired,

    /// A contact batch could not be encoded or decoded.
    #[error("malformed contact batch: {0}")]
    MalformedBatch(#[from] CodecError),

    /// An aggregate request without certificates.
    #[error("aggregate request contains no certificates")]
    EmptyAggregate,

    /// The server refused to derive a light certificate.
    #[error("derivation rejected (status {status}): {reason}")]
    DerivationRejected { status: u16, reason: String },

    /// Another status exchange is in flight for this device.
    #[error("status sync already in progress")]
    SyncInProgress,

    /// Certificate failed local validation.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(#[from] ValidationError),

    /// Contact record rejected at construction.
    #[error("invalid contact: {0}")]
    InvalidContact(#[from] ContactError),

    /// The server answered with a status this call does not expect.
    #[error("unexpected server status {0}")]
    UnexpectedStatus(u16),

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The proximity source failed.
    #[error("proximity source error: {0}")]
    Proximity(#[from] ProximityError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ProtocolError {
    /// Returns the recovery category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProtocolError::NotRegistered
            | ProtocolError::EmptyAggregate
            | ProtocolError::AlreadyRegistered
            | ProtocolError::SyncInProgress
            | ProtocolError::InvalidCertificate(_)
            | ProtocolError::InvalidContact(_) => ErrorCategory::Precondition,

            ProtocolError::TransientNetwork(_) | ProtocolError::RetryableServer { .. } => {
                ErrorCategory::Transient
            }

            ProtocolError::ReauthenticationRequired | ProtocolError::CaptchaRejected => {
                ErrorCategory::Session
            }

            ProtocolError::IncompatibleProtocol(_)
            | ProtocolError::MalformedBatch(_)
            | ProtocolError::DerivationRejected { .. }
            | ProtocolError::KeyGeneration(_)
            | ProtocolError::UnexpectedStatus(_)
            | ProtocolError::Storage(_)
            | ProtocolError::Proximity(_)
            | ProtocolError::Serialization(_) => ErrorCategory::Fatal,
        }
    }

    /// True when a blind retry with backoff is safe.
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::Serialization(err.to_string())
    }
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy() {
        assert_eq!(
            ProtocolError::NotRegistered.category(),
            ErrorCategory::Precondition
        );
        assert_eq!(
            ProtocolError::AlreadyRegistered.category(),
            ErrorCategory::Precondition
        );
        assert_eq!(
            ProtocolError::EmptyAggregate.category(),
            ErrorCategory::Precondition
        );
        assert_eq!(
            ProtocolError::RetryableServer { status: Some(503) }.category(),
            ErrorCategory::Transient
        );
        assert_eq!(
            ProtocolError::TransientNetwork("reset".into()).category(),
            ErrorCategory::Transient
        );
        assert_eq!(
            ProtocolError::CaptchaRejected.category(),
            ErrorCategory::Session
        );
        assert_eq!(
            ProtocolError::ReauthenticationRequired.category(),
            ErrorCategory::Session
        );
        assert_eq!(
            ProtocolError::DerivationRejected {
                status: 400,
                reason: "expired".into()
            }
            .category(),
            ErrorCategory::Fatal
        );
        assert_eq!(
            ProtocolError::MalformedBatch(CodecError::Misaligned { len: 5 }).category(),
            ErrorCategory::Fatal
        );
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(ProtocolError::RetryableServer { status: None }.is_retryable());
        assert!(!ProtocolError::ReauthenticationRequired.is_retryable());
        assert!(!ProtocolError::IncompatibleProtocol("v5".into()).is_retryable());
    }
}
