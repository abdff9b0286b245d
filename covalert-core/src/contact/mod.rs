// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Proximity Contacts
//!
//! A [`ContactRecord`] is one observed short-range proximity event, produced
//! by the scanning collaborator. Records are collected into a
//! [`ContactBatch`] and reported to the server as a single unit.

pub mod codec;
pub mod proximity;

pub use codec::{CodecError, ContactCodec, RECORD_SIZE};
pub use proximity::{MockProximitySource, ProximityError, ProximitySource};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length of the pseudonymous identifier in bytes.
pub const MAX_MAC_LEN: usize = 16;

/// Errors raised when constructing a contact record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContactError {
    #[error("mac identifier is {len} bytes (max {MAX_MAC_LEN})")]
    MacTooLong { len: usize },
}

/// One observed proximity event.
///
/// Immutable once created. The serde form is the wire shape
/// `{timeCollectedOnDevice, timeFromHelloMessage, mac, rssiRaw, rssiCalibrated}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawContactRecord")]
pub struct ContactRecord {
    time_collected_on_device: u64,
    time_from_hello_message: u16,
    mac: String,
    rssi_raw: i16,
    rssi_calibrated: i16,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContactRecord {
    time_collected_on_device: u64,
    time_from_hello_message: u16,
    mac: String,
    rssi_raw: i16,
    rssi_calibrated: i16,
}

impl TryFrom<RawContactRecord> for ContactRecord {
    type Error = ContactError;

    fn try_from(raw: RawContactRecord) -> Result<Self, Self::Error> {
        ContactRecord::new(
            raw.time_collected_on_device,
            raw.time_from_hello_message,
            raw.mac,
            raw.rssi_raw,
            raw.rssi_calibrated,
        )
    }
}

impl ContactRecord {
    /// Creates a record, rejecting identifiers that do not fit the binary layout.
    pub fn new(
        time_collected_on_device: u64,
        time_from_hello_message: u16,
        mac: impl Into<String>,
        rssi_raw: i16,
        rssi_calibrated: i16,
    ) -> Result<Self, ContactError> {
        let mac = mac.into();
        if mac.len() > MAX_MAC_LEN {
            return Err(ContactError::MacTooLong { len: mac.len() });
        }
        Ok(ContactRecord {
            time_collected_on_device,
            time_from_hello_message,
            mac,
            rssi_raw,
            rssi_calibrated,
        })
    }

    pub fn time_collected_on_device(&self) -> u64 {
        self.time_collected_on_device
    }

    pub fn time_from_hello_message(&self) -> u16 {
        self.time_from_hello_message
    }

    /// Rotating pseudonymous identifier of the remote device.
    pub fn mac(&self) -> &str {
        &self.mac
    }

    pub fn rssi_raw(&self) -> i16 {
        self.rssi_raw
    }

    pub fn rssi_calibrated(&self) -> i16 {
        self.rssi_calibrated
    }
}

/// Ordered sequence of contact records reported together.
///
/// Order is irrelevant to the server but preserved so that encoding is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactBatch {
    records: Vec<ContactRecord>,
}

impl ContactBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        ContactBatch {
            records: Vec::new(),
        }
    }

    /// Appends a record.
    pub fn push(&mut self, record: ContactRecord) {
        self.records.push(record);
    }

    /// Returns the records in insertion order.
    pub fn records(&self) -> &[ContactRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ContactRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Removes all records. Only called after a committed report.
    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }
}

impl From<Vec<ContactRecord>> for ContactBatch {
    fn from(records: Vec<ContactRecord>) -> Self {
        ContactBatch { records }
    }
}

impl FromIterator<ContactRecord> for ContactBatch {
    fn from_iter<I: IntoIterator<Item = ContactRecord>>(iter: I) -> Self {
        ContactBatch {
            records: iter.into_iter().collect(),
        }
    }
}

impl Extend<ContactRecord> for ContactBatch {
    fn extend<I: IntoIterator<Item = ContactRecord>>(&mut self, iter: I) {
        self.records.extend(iter);
    }
}

impl<'a> IntoIterator for &'a ContactBatch {
    type Item = &'a ContactRecord;
    type IntoIter = std::slice::Iter<'a, ContactRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_rejects_long_mac() {
        let result = ContactRecord::new(1, 2, "x".repeat(MAX_MAC_LEN + 1), -60, -55);
        assert_eq!(result, Err(ContactError::MacTooLong { len: 17 }));
    }

    #[test]
    fn test_record_wire_field_names() {
        let record = ContactRecord::new(3_800_000_000, 150, "AbCdEfGh", -70, -64).unwrap();
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["timeCollectedOnDevice"], 3_800_000_000u64);
        assert_eq!(json["timeFromHelloMessage"], 150);
        assert_eq!(json["mac"], "AbCdEfGh");
        assert_eq!(json["rssiRaw"], -70);
        assert_eq!(json["rssiCalibrated"], -64);
    }

    #[test]
    fn test_record_deserialize_applies_checks() {
        let json = r#"{"timeCollectedOnDevice":1,"timeFromHelloMessage":2,
            "mac":"ABCDEFGHIJKLMNOPQ","rssiRaw":-1,"rssiCalibrated":-2}"#;
        assert!(serde_json::from_str::<ContactRecord>(json).is_err());
    }

    #[test]
    fn test_time_from_hello_rejects_out_of_range() {
        let json = r#"{"timeCollectedOnDevice":1,"timeFromHelloMessage":70000,
            "mac":"m","rssiRaw":-1,"rssiCalibrated":-2}"#;
        assert!(serde_json::from_str::<ContactRecord>(json).is_err());
    }

    #[test]
    fn test_batch_preserves_order() {
        let batch: ContactBatch = (0..3)
            .map(|i| ContactRecord::new(i, 0, format!("m{}", i), -50, -50).unwrap())
            .collect();

        let macs: Vec<&str> = batch.iter().map(|r| r.mac()).collect();
        assert_eq!(macs, vec!["m0", "m1", "m2"]);
    }
}
