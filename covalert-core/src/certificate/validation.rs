// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Structural certificate validation.
//!
//! Checks that a certificate is well formed for its format before it is
//! sent anywhere. Signature trust is the aggregation server's job.

use thiserror::Error;

use super::{CertificateFormat, HealthCertificate};

/// Alphabet of base45 (RFC 9285).
const BASE45_ALPHABET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

/// Length of a 2D-DOC header (versions 02 and 03).
const DDOC_HEADER_LEN: usize = 22;

/// 2D-DOC unit separator between message and signature.
const DDOC_SIGNATURE_SEPARATOR: char = '\u{1F}';

/// Certificate validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("certificate is empty")]
    Empty,

    #[error("unrecognized certificate format")]
    UnknownFormat,

    #[error("invalid character {ch:?} at position {position}")]
    InvalidCharacter { position: usize, ch: char },

    #[error("payload length {len} is not a valid encoding length")]
    InvalidLength { len: usize },

    #[error("2D-DOC header is truncated")]
    TruncatedHeader,

    #[error("2D-DOC signature is missing")]
    MissingSignature,

    #[error("2D-DOC signature is not base32")]
    InvalidSignature,
}

/// A certificate that passed [`validate`]. Only obtainable through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCertificate(HealthCertificate);

impl ValidCertificate {
    pub fn certificate(&self) -> &HealthCertificate {
        &self.0
    }

    pub fn into_inner(self) -> HealthCertificate {
        self.0
    }
}

/// Validates one certificate without modifying it.
pub fn validate(cert: &HealthCertificate) -> Result<ValidCertificate, ValidationError> {
    let raw = cert.raw();
    if raw.is_empty() {
        return Err(ValidationError::Empty);
    }
    match cert.format() {
        CertificateFormat::EuropeanDcc => validate_dcc(raw)?,
        CertificateFormat::TwoDDoc => validate_2ddoc(raw)?,
        CertificateFormat::Unknown => return Err(ValidationError::UnknownFormat),
    }
    Ok(ValidCertificate(cert.clone()))
}

fn validate_dcc(raw: &str) -> Result<(), ValidationError> {
    let prefix = CertificateFormat::DCC_PREFIX.len();
    let payload = &raw[prefix..];
    if payload.is_empty() {
        return Err(ValidationError::InvalidLength { len: 0 });
    }
    if let Some((i, ch)) = payload
        .chars()
        .enumerate()
        .find(|(_, c)| !BASE45_ALPHABET.contains(*c))
    {
        return Err(ValidationError::InvalidCharacter {
            position: prefix + i,
            ch,
        });
    }
    // Base45 encodes 2 bytes in 3 chars and a trailing byte in 2
    if payload.len() % 3 == 1 {
        return Err(ValidationError::InvalidLength { len: payload.len() });
    }
    Ok(())
}

/// Printable ASCII plus the group, record and unit separators.
fn is_2ddoc_char(c: char) -> bool {
    c.is_ascii_graphic() || matches!(c, ' ' | '\u{1D}' | '\u{1E}' | DDOC_SIGNATURE_SEPARATOR)
}

fn validate_2ddoc(raw: &str) -> Result<(), ValidationError> {
    if let Some((position, ch)) = raw.chars().enumerate().find(|(_, c)| !is_2ddoc_char(*c)) {
        return Err(ValidationError::InvalidCharacter { position, ch });
    }
    if raw.len() < DDOC_HEADER_LEN {
        return Err(ValidationError::TruncatedHeader);
    }
    if let Some((position, ch)) = raw
        .char_indices()
        .skip(2)
        .take(2)
        .find(|(_, c)| !c.is_ascii_digit())
    {
        return Err(ValidationError::InvalidCharacter { position, ch });
    }

    let (message, signature) = raw
        .rsplit_once(DDOC_SIGNATURE_SEPARATOR)
        .ok_or(ValidationError::MissingSignature)?;
    if message.len() < DDOC_HEADER_LEN {
        return Err(ValidationError::TruncatedHeader);
    }
    if signature.is_empty() {
        return Err(ValidationError::MissingSignature);
    }
    let signature = signature.trim_end_matches('=');
    if signature.is_empty()
        || !signature
            .chars()
            .all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c))
    {
        return Err(ValidationError::InvalidSignature);
    }
    Ok(())
}
