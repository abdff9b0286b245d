// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Test Fixtures
//!
//! A scripted server that performs the real key agreement and checks request
//! MACs, plus helpers that build devices wired to it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use parking_lot::Mutex;
use x25519_dalek::{PublicKey, StaticSecret};

use covalert_core::api::{CallbackHandler, FixedClock};
use covalert_core::crypto::{MacKey, MacPrefix, HKDF};
use covalert_core::network::wire::{
    paths, RegisterRequest, RegisterResponse, StatusRequest, StatusResponse, HEADER_DEVICE_ID,
    HEADER_REQUEST_MAC, HEADER_REQUEST_TIME,
};
use covalert_core::network::{ApiRequest, ApiResponse};
use covalert_core::storage::MemoryKeyStorage;
use covalert_core::{
    CaptchaKind, CertificateAggregator, ClientConfig, ContactBatch, ContactCodec, ContactRecord,
    CovAlertEvent, DeviceContext, KeyExchange, MockTransport, SecureStorage, StatusSync, Storage,
    SymmetricKey,
};

/// Captcha id handed out by [`FakeServer`].
pub const CAPTCHA_ID: &str = "captcha-1";
/// The only answer [`FakeServer`] accepts.
pub const CAPTCHA_ANSWER: &str = "ABC123";
/// Fixed clock origin for protocol tests (seconds).
pub const T0: u64 = 1_700_000_000;

// ============================================================
// Fake Server
// ============================================================

/// In-process server speaking the registration and status endpoints.
pub struct FakeServer {
    secret: StaticSecret,
    devices: Mutex<HashMap<String, MacKey>>,
    verdict: Mutex<StatusResponse>,
    next_device: Mutex<u32>,
}

impl FakeServer {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeServer {
            secret: StaticSecret::random_from_rng(rand::rngs::OsRng),
            devices: Mutex::new(HashMap::new()),
            verdict: Mutex::new(StatusResponse {
                at_risk: false,
                last_exposure_time: None,
                message: None,
            }),
            next_device: Mutex::new(0),
        })
    }

    pub fn public_key_base64(&self) -> String {
        BASE64.encode(PublicKey::from(&self.secret).as_bytes())
    }

    /// Sets the verdict returned by the status endpoint.
    pub fn set_verdict(&self, at_risk: bool, last_exposure_time: Option<u64>) {
        *self.verdict.lock() = StatusResponse {
            at_risk,
            last_exposure_time,
            message: None,
        };
    }

    /// Number of devices the server has registered.
    pub fn device_count(&self) -> usize {
        self.devices.lock().len()
    }

    /// The MAC key the server derived for `device_id`.
    pub fn mac_key_for(&self, device_id: &str) -> Option<MacKey> {
        self.devices.lock().get(device_id).cloned()
    }

    /// Installs handlers for every endpoint on `transport`.
    pub fn install(self: &Arc<Self>, transport: &MockTransport) {
        transport.on(paths::CAPTCHA, |_| {
            ApiResponse::json(200, &serde_json::json!({ "id": CAPTCHA_ID }))
        });
        transport.on(&paths::captcha_payload(CAPTCHA_ID, CaptchaKind::Image), |_| {
            ApiResponse::new(200, b"\x89PNG".to_vec())
        });
        transport.on(&paths::captcha_payload(CAPTCHA_ID, CaptchaKind::Audio), |_| {
            ApiResponse::new(200, b"RIFF".to_vec())
        });

        let server = self.clone();
        transport.on(paths::REGISTER, move |req| server.handle_register(req));

        let server = self.clone();
        transport.on(paths::STATUS, move |req| server.handle_status(req));

        for (path, prefix) in [
            (paths::UNREGISTER, MacPrefix::Unregister),
            (
                paths::DELETE_EXPOSURE_HISTORY,
                MacPrefix::DeleteExposureHistory,
            ),
        ] {
            let server = self.clone();
            transport.on(path, move |req| {
                if server.authenticate(req, prefix, &req.body) {
                    ApiResponse::json(200, &serde_json::json!({}))
                } else {
                    ApiResponse::status(401)
                }
            });
        }
    }

    fn handle_register(&self, request: &ApiRequest) -> ApiResponse {
        let Ok(body) = request.json::<RegisterRequest>() else {
            return ApiResponse::status(400);
        };
        if body.captcha_id != CAPTCHA_ID || body.captcha != CAPTCHA_ANSWER {
            return ApiResponse::status(403);
        }
        let Some(client_key) = BASE64
            .decode(&body.client_public_ecdh_key)
            .ok()
            .and_then(|b| <[u8; 32]>::try_from(b).ok())
        else {
            return ApiResponse::status(400);
        };

        let shared = self.secret.diffie_hellman(&PublicKey::from(client_key));
        let mac_key = MacKey::from_bytes(HKDF::derive_key(
            None,
            shared.as_bytes(),
            b"CovAlert_Mac_Key",
        ));

        let device_id = {
            let mut next = self.next_device.lock();
            *next += 1;
            format!("device-{}", *next)
        };
        self.devices.lock().insert(device_id.clone(), mac_key);

        ApiResponse::json(
            200,
            &RegisterResponse {
                server_public_key: self.public_key_base64(),
                device_id,
                protocol_version: Some(6),
            },
        )
    }

    /// Answers a status report with the configured verdict.
    pub fn handle_status(&self, request: &ApiRequest) -> ApiResponse {
        let Ok(body) = request.json::<StatusRequest<'static>>() else {
            return ApiResponse::status(400);
        };
        let batch = ContactBatch::from(body.contacts.into_owned());
        if !self.authenticate(request, MacPrefix::Status, &ContactCodec::encode(&batch)) {
            return ApiResponse::status(401);
        }
        ApiResponse::json(200, &*self.verdict.lock())
    }

    /// Checks the authentication headers against `payload`.
    pub fn authenticate(&self, request: &ApiRequest, prefix: MacPrefix, payload: &[u8]) -> bool {
        let Some(device_id) = request.header(HEADER_DEVICE_ID) else {
            return false;
        };
        let Some(time) = request
            .header(HEADER_REQUEST_TIME)
            .and_then(|t| t.parse::<u64>().ok())
        else {
            return false;
        };
        let Some(mac) = request
            .header(HEADER_REQUEST_MAC)
            .and_then(|m| BASE64.decode(m).ok())
        else {
            return false;
        };
        match self.devices.lock().get(device_id) {
            Some(key) => key.verify(prefix, device_id, time, payload, &mac),
            None => false,
        }
    }
}

// ============================================================
// Devices
// ============================================================

/// Routes library logs to the test output. Filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Client configuration pointing at a placeholder host.
pub fn test_config() -> ClientConfig {
    ClientConfig::default()
        .with_server_url("https://covalert.test")
        .with_request_timeout(Duration::from_secs(5))
}

/// One simulated device wired to a [`FakeServer`] through a mock transport.
pub struct TestDevice {
    pub ctx: Arc<DeviceContext>,
    pub transport: Arc<MockTransport>,
    pub server: Arc<FakeServer>,
    pub clock: Arc<FixedClock>,
    pub key_store: Arc<MemoryKeyStorage>,
    pub config: ClientConfig,
}

impl TestDevice {
    /// A fresh, unregistered device with its own server.
    pub fn new() -> Self {
        Self::with_server(FakeServer::new())
    }

    /// A fresh, unregistered device talking to `server`.
    pub fn with_server(server: Arc<FakeServer>) -> Self {
        let key_store = Arc::new(MemoryKeyStorage::new());
        Self::with_key_store(server, key_store)
    }

    pub fn with_key_store(server: Arc<FakeServer>, key_store: Arc<MemoryKeyStorage>) -> Self {
        init_tracing();
        let clock = Arc::new(FixedClock::new(T0));
        let storage = Storage::in_memory(SymmetricKey::generate()).unwrap();
        let store: Arc<dyn SecureStorage> = key_store.clone();
        let ctx = Arc::new(DeviceContext::from_parts(storage, store, clock.clone()).unwrap());
        let transport = Arc::new(MockTransport::new());
        server.install(&transport);

        TestDevice {
            ctx,
            transport,
            server,
            clock,
            key_store,
            config: test_config(),
        }
    }

    /// A device that has completed registration.
    pub async fn registered() -> Self {
        let device = Self::new();
        device.register().await;
        device
    }

    /// Runs captcha and registration against the fake server.
    pub async fn register(&self) {
        let exchange = self.key_exchange();
        let challenge = exchange
            .fetch_captcha(CaptchaKind::Image, "en")
            .await
            .unwrap();
        exchange
            .register(challenge, CAPTCHA_ANSWER, None)
            .await
            .unwrap();
    }

    pub fn key_exchange(&self) -> KeyExchange<MockTransport> {
        KeyExchange::new(
            self.ctx.clone(),
            self.transport.clone(),
            self.config.clone(),
        )
    }

    pub fn status_sync(&self) -> StatusSync<MockTransport> {
        StatusSync::new(
            self.ctx.clone(),
            self.transport.clone(),
            self.config.clone(),
        )
    }

    pub fn aggregator(&self) -> CertificateAggregator<MockTransport> {
        CertificateAggregator::new(
            self.ctx.clone(),
            self.transport.clone(),
            self.config.clone(),
        )
    }

    /// Records every event the device emits.
    pub fn record_events(&self) -> Arc<Mutex<Vec<CovAlertEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        self.ctx
            .add_event_handler(Arc::new(CallbackHandler::new(move |event| {
                sink.lock().push(event)
            })));
        events
    }
}

// ============================================================
// Data
// ============================================================

/// A contact record with typical signal strengths.
pub fn contact(time: u64, mac: &str) -> ContactRecord {
    ContactRecord::new(time, 120, mac, -70, -64).unwrap()
}

/// A batch of `n` distinct contacts.
pub fn contact_batch(n: usize) -> ContactBatch {
    (0..n)
        .map(|i| contact(3_800_000_000 + i as u64, &format!("mac-{:02}", i)))
        .collect()
}
