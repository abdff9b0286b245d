// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Request Authentication (HMAC-SHA256)
//!
//! Every authenticated request carries
//! `HMAC-SHA256(K_A, prefix || device_id || time_be || payload)`.
//! The one-byte prefix separates the endpoints so a MAC computed for one
//! request type can never be replayed against another.

use ring::hmac;
use zeroize::Zeroize;

/// Size of a request MAC in bytes.
pub const MAC_SIZE: usize = 32;

/// Domain prefix for a request MAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MacPrefix {
    Status = 0x02,
    Unregister = 0x03,
    DeleteExposureHistory = 0x04,
    Aggregate = 0x05,
    LightCertificate = 0x06,
}

/// Key used to authenticate requests to the server.
#[derive(Clone)]
pub struct MacKey {
    bytes: [u8; 32],
}

impl std::fmt::Debug for MacKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

impl Drop for MacKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl PartialEq for MacKey {
    fn eq(&self, other: &Self) -> bool {
        ring::constant_time::verify_slices_are_equal(&self.bytes, &other.bytes).is_ok()
    }
}

impl Eq for MacKey {}

impl MacKey {
    /// Creates a MAC key from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        MacKey { bytes }
    }

    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Computes the MAC for a request.
    pub fn sign(
        &self,
        prefix: MacPrefix,
        device_id: &str,
        time: u64,
        payload: &[u8],
    ) -> [u8; MAC_SIZE] {
        let key = hmac::Key::new(hmac::HMAC_SHA256, &self.bytes);
        let mut ctx = hmac::Context::with_key(&key);
        ctx.update(&[prefix as u8]);
        ctx.update(device_id.as_bytes());
        ctx.update(&time.to_be_bytes());
        ctx.update(payload);

        let mut mac = [0u8; MAC_SIZE];
        mac.copy_from_slice(ctx.sign().as_ref());
        mac
    }

    /// Verifies a request MAC in constant time.
    pub fn verify(
        &self,
        prefix: MacPrefix,
        device_id: &str,
        time: u64,
        payload: &[u8],
        mac: &[u8],
    ) -> bool {
        let expected = self.sign(prefix, device_id, time, payload);
        ring::constant_time::verify_slices_are_equal(&expected, mac).is_ok()
    }
}
