// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Contact Batch Binary Codec
//!
//! Fixed-layout encoding, one 32-byte record per contact, concatenated in
//! batch order. All integers are big-endian.
//!
//! ```text
//! 0      1        2               10          12            28        30        32
//! | tag  | macLen | timeCollected | helloTime | mac (padded) | rssiRaw | rssiCal |
//! ```
//!
//! The encoding is the canonical form the status MAC is computed over, and
//! the form pending contacts are persisted in.

use thiserror::Error;

use super::{ContactBatch, ContactRecord, MAX_MAC_LEN};

/// Size of one encoded record.
pub const RECORD_SIZE: usize = 32;

/// Record tag of the current layout.
const RECORD_TAG: u8 = 0x01;

const OFFSET_MAC_LEN: usize = 1;
const OFFSET_TIME_COLLECTED: usize = 2;
const OFFSET_HELLO_TIME: usize = 10;
const OFFSET_MAC: usize = 12;
const OFFSET_RSSI_RAW: usize = 28;
const OFFSET_RSSI_CALIBRATED: usize = 30;

/// Decoding errors. Every variant means the input is not a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("batch length {len} is not a multiple of {RECORD_SIZE}")]
    Misaligned { len: usize },

    #[error("record {index}: unknown tag {tag:#04x}")]
    UnknownTag { index: usize, tag: u8 },

    #[error("record {index}: mac length {len} out of range")]
    MacLengthOutOfRange { index: usize, len: u8 },

    #[error("record {index}: non-zero padding")]
    NonZeroPadding { index: usize },

    #[error("record {index}: mac is not valid UTF-8")]
    InvalidMac { index: usize },
}

/// Encoder/decoder for [`ContactBatch`].
pub struct ContactCodec;

impl ContactCodec {
    /// Encodes a batch. Deterministic: equal batches produce equal bytes.
    pub fn encode(batch: &ContactBatch) -> Vec<u8> {
        let mut out = Vec::with_capacity(batch.len() * RECORD_SIZE);
        for record in batch {
            out.extend_from_slice(&Self::encode_record(record));
        }
        out
    }

    /// Encodes a single record.
    pub fn encode_record(record: &ContactRecord) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        let mac = record.mac().as_bytes();

        buf[0] = RECORD_TAG;
        // ContactRecord::new guarantees mac.len() <= MAX_MAC_LEN
        buf[OFFSET_MAC_LEN] = mac.len() as u8;
        buf[OFFSET_TIME_COLLECTED..OFFSET_HELLO_TIME]
            .copy_from_slice(&record.time_collected_on_device().to_be_bytes());
        buf[OFFSET_HELLO_TIME..OFFSET_MAC]
            .copy_from_slice(&record.time_from_hello_message().to_be_bytes());
        buf[OFFSET_MAC..OFFSET_MAC + mac.len()].copy_from_slice(mac);
        buf[OFFSET_RSSI_RAW..OFFSET_RSSI_CALIBRATED]
            .copy_from_slice(&record.rssi_raw().to_be_bytes());
        buf[OFFSET_RSSI_CALIBRATED..RECORD_SIZE]
            .copy_from_slice(&record.rssi_calibrated().to_be_bytes());
        buf
    }

    /// Decodes a batch.
    pub fn decode(bytes: &[u8]) -> Result<ContactBatch, CodecError> {
        if bytes.len() % RECORD_SIZE != 0 {
            return Err(CodecError::Misaligned { len: bytes.len() });
        }

        bytes
            .chunks_exact(RECORD_SIZE)
            .enumerate()
            .map(|(index, chunk)| Self::decode_record(index, chunk))
            .collect()
    }

    /// Decodes one record. `chunk` must be exactly [`RECORD_SIZE`] bytes.
    pub fn decode_record(index: usize, chunk: &[u8]) -> Result<ContactRecord, CodecError> {
        if chunk.len() != RECORD_SIZE {
            return Err(CodecError::Misaligned { len: chunk.len() });
        }
        if chunk[0] != RECORD_TAG {
            return Err(CodecError::UnknownTag {
                index,
                tag: chunk[0],
            });
        }

        let mac_len = chunk[OFFSET_MAC_LEN];
        if mac_len as usize > MAX_MAC_LEN {
            return Err(CodecError::MacLengthOutOfRange {
                index,
                len: mac_len,
            });
        }

        let mac_end = OFFSET_MAC + mac_len as usize;
        if chunk[mac_end..OFFSET_RSSI_RAW].iter().any(|b| *b != 0) {
            return Err(CodecError::NonZeroPadding { index });
        }
        let mac = std::str::from_utf8(&chunk[OFFSET_MAC..mac_end])
            .map_err(|_| CodecError::InvalidMac { index })?;

        let time_collected = u64::from_be_bytes(read_array(chunk, OFFSET_TIME_COLLECTED));
        let hello_time = u16::from_be_bytes(read_array(chunk, OFFSET_HELLO_TIME));
        let rssi_raw = i16::from_be_bytes(read_array(chunk, OFFSET_RSSI_RAW));
        let rssi_calibrated = i16::from_be_bytes(read_array(chunk, OFFSET_RSSI_CALIBRATED));

        ContactRecord::new(time_collected, hello_time, mac, rssi_raw, rssi_calibrated).map_err(
            |_| CodecError::MacLengthOutOfRange {
                index,
                len: mac_len,
            },
        )
    }
}

fn read_array<const N: usize>(chunk: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&chunk[offset..offset + N]);
    out
}
