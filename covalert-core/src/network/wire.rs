// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Wire Payloads
//!
//! JSON bodies exchanged with the server. Field names are load-bearing for
//! server compatibility; do not rename.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::contact::ContactRecord;

/// Header carrying the server-assigned device identifier.
pub const HEADER_DEVICE_ID: &str = "X-Device-Id";
/// Header carrying the request time (seconds, decimal).
pub const HEADER_REQUEST_TIME: &str = "X-Request-Time";
/// Header carrying the base64 request MAC.
pub const HEADER_REQUEST_MAC: &str = "X-Request-Mac";
/// Header carrying a per-request correlation id.
pub const HEADER_REQUEST_ID: &str = "X-Request-Id";

/// Endpoint paths relative to the versioned API base.
pub mod paths {
    pub const CAPTCHA: &str = "captcha";
    pub const REGISTER: &str = "register";
    pub const STATUS: &str = "status";
    pub const UNREGISTER: &str = "unregister";
    pub const DELETE_EXPOSURE_HISTORY: &str = "deleteExposureHistory";
    pub const MULTIPASS_AGGREGATE: &str = "multipass/aggregate";
    pub const LIGHT_DCC: &str = "dcc/light";

    /// Whether a server-issued id can be used as one path segment as is:
    /// non-empty, unreserved URL characters only, and not `.` or `..`.
    pub fn is_path_segment(id: &str) -> bool {
        !id.is_empty()
            && id.bytes().any(|b| b != b'.')
            && id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~'))
    }

    /// Path of a captcha payload download. `id` must pass
    /// [`is_path_segment`].
    pub fn captcha_payload(id: &str, kind: super::CaptchaKind) -> String {
        let suffix = match kind {
            super::CaptchaKind::Image => "image",
            super::CaptchaKind::Audio => "audio",
        };
        format!("{}/{}/{}", CAPTCHA, id, suffix)
    }
}

/// Kind of captcha challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CaptchaKind {
    Image,
    Audio,
}

#[derive(Debug, Serialize)]
pub struct CaptchaCreateRequest<'a> {
    #[serde(rename = "type")]
    pub kind: CaptchaKind,
    pub locale: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct CaptchaCreateResponse {
    pub id: String,
}

/// Push-delivery descriptor sent at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushInfo {
    pub token: String,
    pub locale: String,
    pub timezone: String,
}

/// `{captcha, captchaId, clientPublicECDHKey, pushInfo}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub captcha: String,
    #[serde(rename = "captchaId")]
    pub captcha_id: String,
    #[serde(rename = "clientPublicECDHKey")]
    pub client_public_ecdh_key: String,
    #[serde(rename = "pushInfo", skip_serializing_if = "Option::is_none", default)]
    pub push_info: Option<PushInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    /// Base64 server X25519 public key.
    pub server_public_key: String,
    /// Identifier used on every authenticated call.
    pub device_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusRequest<'a> {
    pub contacts: std::borrow::Cow<'a, [ContactRecord]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub at_risk: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_exposure_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `{certificate}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiPassAggregateResponseContent {
    pub certificate: String,
}

/// `{status, errors?}`
///
/// Entries are kept as raw JSON so one entry the client does not understand
/// cannot hide the others; see [`descriptors`](Self::descriptors).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiPassErrorResponse {
    pub status: u16,
    #[serde(default)]
    pub errors: Option<Vec<Value>>,
}

impl MultiPassErrorResponse {
    /// Per-certificate errors in submission order. `null` entries are
    /// certificates that passed; every other entry is a refusal.
    pub fn descriptors(&self) -> Vec<Option<CertificateErrorDescriptor>> {
        self.errors
            .iter()
            .flatten()
            .map(CertificateErrorDescriptor::from_entry)
            .collect()
    }
}

/// Server description of why one certificate was refused.
///
/// Every field is optional; fields the client does not know are kept in
/// `details`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateErrorDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl CertificateErrorDescriptor {
    fn from_entry(entry: &Value) -> Option<Self> {
        match entry {
            Value::Null => None,
            Value::String(text) => Some(CertificateErrorDescriptor {
                message: Some(text.clone()),
                ..Default::default()
            }),
            other => Some(
                serde_json::from_value(other.clone()).unwrap_or_else(|_| {
                    CertificateErrorDescriptor {
                        message: Some(other.to_string()),
                        ..Default::default()
                    }
                }),
            ),
        }
    }

    /// Text to show for this refusal: the message, else the code.
    pub fn reason(&self) -> &str {
        self.message
            .as_deref()
            .or(self.code.as_deref())
            .unwrap_or("certificate refused")
    }
}

/// Body of a refused request on the certificate endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_field_names() {
        let request = RegisterRequest {
            captcha: "ABC123".into(),
            captcha_id: "c-1".into(),
            client_public_ecdh_key: "a2V5".into(),
            push_info: None,
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["captcha"], "ABC123");
        assert_eq!(json["captchaId"], "c-1");
        assert_eq!(json["clientPublicECDHKey"], "a2V5");
        assert!(json.get("pushInfo").is_none());
    }

    #[test]
    fn test_captcha_create_request() {
        let json = serde_json::to_string(&CaptchaCreateRequest {
            kind: CaptchaKind::Audio,
            locale: "fr",
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"AUDIO","locale":"fr"}"#);
    }

    #[test]
    fn test_multipass_error_response_positional_nulls() {
        let body = r#"{"status":400,"errors":[null,{"code":"EXPIRED"}]}"#;
        let parsed: MultiPassErrorResponse = serde_json::from_str(body).unwrap();
        let errors = parsed.descriptors();

        assert_eq!(errors.len(), 2);
        assert!(errors[0].is_none());
        assert_eq!(errors[1].as_ref().unwrap().code.as_deref(), Some("EXPIRED"));
    }

    #[test]
    fn test_descriptor_without_code_is_kept() {
        let body = r#"{"status":400,"errors":[null,{"message":"expired","field":"dt"},null]}"#;
        let parsed: MultiPassErrorResponse = serde_json::from_str(body).unwrap();
        let errors = parsed.descriptors();

        assert_eq!(errors.len(), 3);
        let refused = errors[1].as_ref().unwrap();
        assert_eq!(refused.code, None);
        assert_eq!(refused.reason(), "expired");
        assert_eq!(refused.details["field"], "dt");
        assert!(errors[0].is_none() && errors[2].is_none());
    }

    #[test]
    fn test_unusual_descriptor_entries_still_count_as_refusals() {
        let body = r#"{"status":400,"errors":["revoked",{"code":7},{}]}"#;
        let parsed: MultiPassErrorResponse = serde_json::from_str(body).unwrap();
        let errors = parsed.descriptors();

        assert_eq!(errors[0].as_ref().unwrap().reason(), "revoked");
        assert_eq!(errors[1].as_ref().unwrap().reason(), r#"{"code":7}"#);
        assert_eq!(errors[2].as_ref().unwrap().reason(), "certificate refused");
    }

    #[test]
    fn test_path_segment_check() {
        assert!(paths::is_path_segment("3f2a-b_c.d~e"));
        for id in ["", ".", "..", "../register", "a/b", "a?x=1", "a#b", "a%2F", "a b"] {
            assert!(!paths::is_path_segment(id), "{:?}", id);
        }
    }

    #[test]
    fn test_captcha_payload_path() {
        assert_eq!(
            paths::captcha_payload("abc", CaptchaKind::Image),
            "captcha/abc/image"
        );
    }
}
