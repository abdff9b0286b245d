// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! HKDF Key Derivation Function
//!
//! HMAC-based Extract-and-Expand Key Derivation Function (RFC 5869).
//! Turns the raw X25519 output of registration into the keys used to
//! authenticate protocol requests.

use ring::hmac;
use thiserror::Error;

const HASH_LEN: usize = 32;

/// KDF error types.
#[derive(Error, Debug)]
pub enum KDFError {
    #[error("Output length exceeds maximum (255 * hash_len)")]
    OutputTooLong,
}

/// HKDF-SHA256 key derivation.
pub struct HKDF;

impl HKDF {
    /// HKDF Extract: PRK = HMAC-SHA256(salt, IKM)
    ///
    /// If salt is None, uses a string of HashLen zeros.
    pub fn extract(salt: Option<&[u8]>, ikm: &[u8]) -> [u8; HASH_LEN] {
        let default_salt = [0u8; HASH_LEN];
        let key = hmac::Key::new(hmac::HMAC_SHA256, salt.unwrap_or(&default_salt));
        let mut prk = [0u8; HASH_LEN];
        prk.copy_from_slice(hmac::sign(&key, ikm).as_ref());
        prk
    }

    /// HKDF Expand: OKM = T(1) || T(2) || ...
    /// where T(i) = HMAC-SHA256(PRK, T(i-1) || info || i)
    pub fn expand(prk: &[u8; HASH_LEN], info: &[u8], length: usize) -> Result<Vec<u8>, KDFError> {
        if length > 255 * HASH_LEN {
            return Err(KDFError::OutputTooLong);
        }

        let key = hmac::Key::new(hmac::HMAC_SHA256, prk);
        let mut okm = Vec::with_capacity(length.div_ceil(HASH_LEN) * HASH_LEN);
        let mut t_prev: Vec<u8> = Vec::new();

        for i in 1..=length.div_ceil(HASH_LEN) {
            let mut ctx = hmac::Context::with_key(&key);
            ctx.update(&t_prev);
            ctx.update(info);
            ctx.update(&[i as u8]);
            t_prev = ctx.sign().as_ref().to_vec();
            okm.extend_from_slice(&t_prev);
        }

        okm.truncate(length);
        Ok(okm)
    }

    /// Derives a fixed-size 32-byte key.
    ///
    /// A single expand block, so the length check cannot fail.
    pub fn derive_key(salt: Option<&[u8]>, ikm: &[u8], info: &[u8]) -> [u8; HASH_LEN] {
        let prk = Self::extract(salt, ikm);
        let key = hmac::Key::new(hmac::HMAC_SHA256, &prk);

        let mut ctx = hmac::Context::with_key(&key);
        ctx.update(info);
        ctx.update(&[1u8]);

        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(ctx.sign().as_ref());
        out
    }
}
