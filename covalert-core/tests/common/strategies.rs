// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Proptest Strategies
//!
//! Reusable proptest strategies for property-based testing.

use covalert_core::{ContactBatch, ContactRecord};
use proptest::prelude::*;

// ============================================================
// Contact Strategies
// ============================================================

/// Strategy for pseudonymous identifiers that fit the 16-byte slot,
/// including multi-byte UTF-8.
pub fn mac_strategy() -> impl Strategy<Value = String> {
    prop_oneof!["[A-Za-z0-9+/=]{0,16}", "[a-zé€]{0,5}"]
        .prop_filter("fits the record layout", |s| s.len() <= 16)
}

/// Strategy for contact records across the full integer domains.
pub fn contact_record_strategy() -> impl Strategy<Value = ContactRecord> {
    (
        any::<u64>(),
        any::<u16>(),
        mac_strategy(),
        any::<i16>(),
        any::<i16>(),
    )
        .prop_map(|(time, hello, mac, raw, calibrated)| {
            ContactRecord::new(time, hello, mac, raw, calibrated).unwrap()
        })
}

/// Strategy for batches of fewer than `max` records.
pub fn contact_batch_strategy(max: usize) -> impl Strategy<Value = ContactBatch> {
    prop::collection::vec(contact_record_strategy(), 0..max).prop_map(ContactBatch::from)
}

// ============================================================
// Byte Strategies
// ============================================================

/// Strategy for generating variable-length byte vectors.
pub fn byte_vec_strategy(min: usize, max: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), min..max)
}
