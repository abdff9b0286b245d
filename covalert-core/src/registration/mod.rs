// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Device Registration
//!
//! Establishes the pseudonymous device identity:
//!
//! 1. [`KeyExchange::fetch_captcha`] gets a challenge for the user to solve.
//! 2. [`KeyExchange::register`] sends the answer with the device public key.
//!    The server answers with its public key and a device identifier.
//! 3. X25519 agreement plus HKDF yields the [`SharedSecret`] that
//!    authenticates every later call.
//!
//! The private key and derived key are kept in the device's
//! [`SecureStorage`](crate::storage::SecureStorage); only the registration
//! record is written to the database.

mod captcha;
mod exchange;
mod keypair;
mod secret;

pub use captcha::CaptchaChallenge;
pub use exchange::KeyExchange;
pub use keypair::DeviceKeyPair;
pub use secret::SharedSecret;

/// Key store entry holding the X25519 private key.
pub const KEY_DEVICE_PRIVATE: &str = "covalert_device_private_key";
/// Key store entry holding the derived request-authentication key.
pub const KEY_REQUEST_AUTH: &str = "covalert_request_auth_key";

/// Server-assigned identity, persisted after a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub device_id: String,
    pub server_public_key: [u8; 32],
    pub protocol_version: u32,
    /// Seconds since the Unix epoch.
    pub registered_at: u64,
}
