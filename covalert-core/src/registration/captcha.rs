//! Captcha challenge.

use crate::network::wire::CaptchaKind;

/// A captcha fetched from the server.
///
/// Consumed by value by `KeyExchange::register`, so one challenge backs at
/// most one registration attempt. Expired or rejected challenges are
/// replaced, never resubmitted. It is deliberately not `Clone`:
///
/// ```compile_fail
/// fn copyable<T: Clone>() {}
/// copyable::<covalert_core::CaptchaChallenge>();
/// ```
#[derive(Debug, PartialEq, Eq)]
pub struct CaptchaChallenge {
    id: String,
    kind: CaptchaKind,
    payload: Vec<u8>,
}

impl CaptchaChallenge {
    pub fn new(id: impl Into<String>, kind: CaptchaKind, payload: Vec<u8>) -> Self {
        CaptchaChallenge {
            id: id.into(),
            kind,
            payload,
        }
    }

    /// Opaque server token.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> CaptchaKind {
        self.kind
    }

    /// Image or audio bytes to render to the user.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}
