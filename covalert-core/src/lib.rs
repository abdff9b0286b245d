//! CovAlert Core Library
//!
//! Client core of an anonymous proximity-tracing and health-certificate
//! protocol: captcha-gated device registration, contact batch reporting
//! and certificate aggregation.
//! All cryptographic operations use `ring` and `x25519-dalek`.

pub mod api;
pub mod certificate;
pub mod contact;
pub mod crypto;
pub mod network;
pub mod registration;
pub mod status;
pub mod storage;

pub use api::{
    ClientConfig, CovAlertEvent, DeviceContext, ErrorCategory, ProtocolError, ProtocolResult,
    PROTOCOL_VERSION,
};
pub use certificate::{
    CertificateAggregator, CertificateFormat, HealthCertificate, LightDccRequest, LightDccResult,
    MultiPassFailure, MultiPassRequest, MultiPassResult, ValidCertificate, ValidationError,
};
pub use contact::{CodecError, ContactBatch, ContactCodec, ContactRecord, ProximitySource};
pub use crypto::{decrypt, encrypt, SymmetricKey};
#[cfg(feature = "http")]
pub use network::HttpTransport;
pub use network::wire::{CaptchaKind, PushInfo};
pub use network::{MockTransport, NetworkError, Transport};
pub use registration::{CaptchaChallenge, DeviceKeyPair, KeyExchange, SharedSecret};
pub use status::{ExposureStatus, StatusSync, SyncPhase};
pub use storage::{SecureStorage, Storage, StorageError};
