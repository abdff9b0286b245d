// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Health Certificates
//!
//! Certificates are opaque encoded strings. The client checks their
//! structure, then asks the server either to merge several into one
//! multi-pass credential or to derive a compact light certificate from one.
//! Neither operation changes the input certificates.

mod aggregator;
pub mod validation;

pub use aggregator::CertificateAggregator;
pub use validation::{validate, ValidCertificate, ValidationError};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use crate::network::wire::CertificateErrorDescriptor;

/// Encoding family of a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CertificateFormat {
    /// European Digital COVID Certificate (`HC1:` + base45).
    EuropeanDcc,
    /// French 2D-DOC (`DC` header, signed message).
    TwoDDoc,
    Unknown,
}

impl CertificateFormat {
    pub(crate) const DCC_PREFIX: &'static str = "HC1:";
    const DDOC_PREFIX: &'static str = "DC";

    /// Detects the format from the encoded string.
    pub fn detect(raw: &str) -> Self {
        if raw.starts_with(Self::DCC_PREFIX) {
            CertificateFormat::EuropeanDcc
        } else if raw.starts_with(Self::DDOC_PREFIX) {
            CertificateFormat::TwoDDoc
        } else {
            CertificateFormat::Unknown
        }
    }
}

/// An encoded health certificate. Never mutated.
///
/// Serializes as its raw string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HealthCertificate {
    raw: String,
    format: CertificateFormat,
}

impl HealthCertificate {
    /// Wraps an encoded certificate, detecting its format.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let format = CertificateFormat::detect(&raw);
        HealthCertificate { raw, format }
    }

    /// The encoded certificate as scanned.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn format(&self) -> CertificateFormat {
        self.format
    }
}

impl Serialize for HealthCertificate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for HealthCertificate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(HealthCertificate::new)
    }
}

/// `{publicKey, certificates}`. Certificate order is significant: the
/// server resolves conflicting fields by it, and per-certificate errors are
/// reported by index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiPassRequest {
    /// Base64 key binding the aggregate to this device.
    pub public_key: String,
    pub certificates: Vec<HealthCertificate>,
}

impl MultiPassRequest {
    pub fn new(public_key: impl Into<String>, certificates: Vec<HealthCertificate>) -> Self {
        MultiPassRequest {
            public_key: public_key.into(),
            certificates,
        }
    }

    /// Builds a request from certificates that passed validation, keeping
    /// their order.
    pub fn from_valid<I>(public_key: impl Into<String>, certificates: I) -> Self
    where
        I: IntoIterator<Item = ValidCertificate>,
    {
        Self::new(
            public_key,
            certificates
                .into_iter()
                .map(ValidCertificate::into_inner)
                .collect(),
        )
    }
}

/// Outcome of an aggregation: a merged certificate or a structured refusal,
/// never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultiPassResult {
    Success { certificate: String },
    Failure(MultiPassFailure),
}

impl MultiPassResult {
    pub fn is_success(&self) -> bool {
        matches!(self, MultiPassResult::Success { .. })
    }
}

/// Server refusal of an aggregation.
///
/// `errors[i]` describes `certificates[i]` of the request. `None` entries,
/// and indices past the end of `errors`, are certificates that passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiPassFailure {
    pub status: u16,
    pub errors: Vec<Option<CertificateErrorDescriptor>>,
}

impl MultiPassFailure {
    /// The error for the certificate at `index`, if it was refused.
    pub fn error_for(&self, index: usize) -> Option<&CertificateErrorDescriptor> {
        self.errors.get(index).and_then(Option::as_ref)
    }

    /// Indices of refused certificates, ascending.
    pub fn failed_indices(&self) -> Vec<usize> {
        self.errors
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|_| i))
            .collect()
    }
}

/// Request for a light certificate derived from one original.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightDccRequest {
    /// Derivation key or identifier.
    pub key: String,
    pub original_certificate: HealthCertificate,
}

/// A derived light certificate, `{response}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightDccResult {
    pub response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        assert_eq!(
            CertificateFormat::detect("HC1:6BF"),
            CertificateFormat::EuropeanDcc
        );
        assert_eq!(
            CertificateFormat::detect("DC04FR..."),
            CertificateFormat::TwoDDoc
        );
        assert_eq!(CertificateFormat::detect("cert1"), CertificateFormat::Unknown);
    }

    #[test]
    fn test_multipass_request_wire_shape() {
        let request = MultiPassRequest::new(
            "pk1",
            vec![
                HealthCertificate::new("cert1"),
                HealthCertificate::new("cert2"),
            ],
        );
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(
            json,
            r#"{"publicKey":"pk1","certificates":["cert1","cert2"]}"#
        );
    }

    #[test]
    fn test_light_request_wire_shape() {
        let request = LightDccRequest {
            key: "k1".into(),
            original_certificate: HealthCertificate::new("HC1:ABC"),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["key"], "k1");
        assert_eq!(json["originalCertificate"], "HC1:ABC");
    }

    #[test]
    fn test_failure_index_lookup() {
        let failure = MultiPassFailure {
            status: 400,
            errors: vec![
                None,
                Some(CertificateErrorDescriptor {
                    code: Some("EXPIRED".into()),
                    ..Default::default()
                }),
            ],
        };
        assert!(failure.error_for(0).is_none());
        assert_eq!(failure.error_for(1).unwrap().code.as_deref(), Some("EXPIRED"));
        assert!(failure.error_for(2).is_none());
        assert_eq!(failure.failed_indices(), vec![1]);
    }

    #[test]
    fn test_from_valid_preserves_order() {
        let certs = ["HC1:AAA", "HC1:BBB", "HC1:CCC"]
            .iter()
            .map(|raw| validate(&HealthCertificate::new(*raw)).unwrap());
        let request = MultiPassRequest::from_valid("pk", certs);
        let raws: Vec<&str> = request.certificates.iter().map(|c| c.raw()).collect();
        assert_eq!(raws, vec!["HC1:AAA", "HC1:BBB", "HC1:CCC"]);
    }
}
