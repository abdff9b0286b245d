//! Shared secret and request authentication.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::crypto::{MacKey, MacPrefix};
use crate::network::wire::{
    HEADER_DEVICE_ID, HEADER_REQUEST_ID, HEADER_REQUEST_MAC, HEADER_REQUEST_TIME,
};
use crate::network::ApiRequest;

/// Key material and identifier for authenticated calls.
///
/// Derived once at registration from the device private key and the
/// server's public key. `Debug` never prints the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedSecret {
    device_id: String,
    mac_key: MacKey,
}

impl SharedSecret {
    pub(crate) fn new(device_id: String, mac_key: MacKey) -> Self {
        SharedSecret { device_id, mac_key }
    }

    /// Server-assigned device identifier.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub(crate) fn mac_key(&self) -> &MacKey {
        &self.mac_key
    }

    /// Adds the authentication headers to `request`.
    ///
    /// `payload` is the byte string the MAC covers; it is not necessarily
    /// the request body.
    pub fn authorize(
        &self,
        request: ApiRequest,
        prefix: MacPrefix,
        time: u64,
        payload: &[u8],
    ) -> ApiRequest {
        let mac = self.mac_key.sign(prefix, &self.device_id, time, payload);
        request
            .with_header(HEADER_DEVICE_ID, self.device_id.clone())
            .with_header(HEADER_REQUEST_TIME, time.to_string())
            .with_header(HEADER_REQUEST_MAC, BASE64.encode(mac))
            .with_header(HEADER_REQUEST_ID, uuid::Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_sets_verifiable_headers() {
        let secret = SharedSecret::new("dev-9".into(), MacKey::from_bytes([1u8; 32]));
        let request = secret.authorize(ApiRequest::get("status"), MacPrefix::Status, 77, b"xyz");

        assert_eq!(request.header(HEADER_DEVICE_ID), Some("dev-9"));
        assert_eq!(request.header(HEADER_REQUEST_TIME), Some("77"));
        assert!(request.header(HEADER_REQUEST_ID).is_some());

        let mac = BASE64
            .decode(request.header(HEADER_REQUEST_MAC).unwrap())
            .unwrap();
        assert!(secret
            .mac_key()
            .verify(MacPrefix::Status, "dev-9", 77, b"xyz", &mac));
    }

    #[test]
    fn test_debug_hides_key() {
        let secret = SharedSecret::new("dev-9".into(), MacKey::from_bytes([0xAB; 32]));
        let debug = format!("{:?}", secret);
        assert!(debug.contains("dev-9"));
        assert!(!debug.contains("171"));
        assert!(debug.contains("REDACTED"));
    }
}
