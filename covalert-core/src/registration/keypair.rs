// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Device Key Pair (X25519)

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::crypto::{MacKey, HKDF};

/// HKDF info for the request-authentication key.
const MAC_KEY_INFO: &[u8] = b"CovAlert_Mac_Key";

/// The device's X25519 key pair.
///
/// The private half has no public accessor; only the public key and keys
/// derived from the agreement leave this type.
#[derive(Clone)]
pub struct DeviceKeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl std::fmt::Debug for DeviceKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceKeyPair")
            .field("public", &hex::encode(self.public.as_bytes()))
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl DeviceKeyPair {
    /// Generates a fresh key pair from the OS RNG.
    pub fn generate() -> Self {
        Self::from_secret(StaticSecret::random_from_rng(OsRng))
    }

    pub(crate) fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        Self::from_secret(StaticSecret::from(bytes))
    }

    fn from_secret(secret: StaticSecret) -> Self {
        let public = PublicKey::from(&secret);
        DeviceKeyPair { secret, public }
    }

    pub(crate) fn secret_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.secret.to_bytes())
    }

    /// Raw public key bytes.
    pub fn public_key(&self) -> [u8; 32] {
        self.public.to_bytes()
    }

    /// Base64 public key as sent in `clientPublicECDHKey`.
    pub fn public_key_base64(&self) -> String {
        BASE64.encode(self.public.as_bytes())
    }

    /// Derives the request-authentication key shared with the server.
    ///
    /// Returns None if the server key is a low-order point, which would make
    /// the agreement output predictable.
    pub(crate) fn derive_mac_key(&self, server_public: &[u8; 32]) -> Option<MacKey> {
        let shared = self.secret.diffie_hellman(&PublicKey::from(*server_public));
        if !shared.was_contributory() {
            return None;
        }
        let key = HKDF::derive_key(None, shared.as_bytes(), MAC_KEY_INFO);
        Some(MacKey::from_bytes(key))
    }
}
