// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Pending contact storage operations.
//!
//! Each row holds one encrypted 32-byte record encoding. Rows are read in
//! insertion order and deleted only up to the last row a report covered.

use rusqlite::params;

use super::{Storage, StorageError};
use crate::contact::{ContactBatch, ContactCodec, ContactRecord};
use crate::crypto::{decrypt_bound, encrypt_bound};

/// Encryption context of a pending contact row.
const ROW_CONTEXT: &[u8] = b"pending_contact";

/// The stored batch together with the highest row id it covers.
#[derive(Debug, Clone, Default)]
pub struct PendingBatch {
    pub batch: ContactBatch,
    /// Highest `pending_contacts.id` included in `batch`, None when empty.
    pub through_id: Option<i64>,
}

impl Storage {
    // === Pending Contact Operations ===

    /// Appends records to the pending batch. Returns the number stored.
    pub fn append_pending_contacts(
        &self,
        records: &[ContactRecord],
        added_at: u64,
    ) -> Result<usize, StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO pending_contacts (record_encrypted, added_at) VALUES (?1, ?2)",
            )?;
            for record in records {
                let encoded = ContactCodec::encode_record(record);
                let encrypted = encrypt_bound(&self.encryption_key, ROW_CONTEXT, &encoded)
                    .map_err(|e| StorageError::Encryption(e.to_string()))?;
                stmt.execute(params![encrypted, added_at as i64])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    /// Loads the whole pending batch in insertion order.
    pub fn load_pending_batch(&self) -> Result<PendingBatch, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, record_encrypted FROM pending_contacts ORDER BY id")?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;

        let mut pending = PendingBatch::default();
        for (index, row) in rows.enumerate() {
            let (id, encrypted) = row?;
            let encoded = decrypt_bound(&self.encryption_key, ROW_CONTEXT, &encrypted)
                .map_err(|e| StorageError::Encryption(e.to_string()))?;
            let record = ContactCodec::decode_record(index, &encoded)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            pending.batch.push(record);
            pending.through_id = Some(id);
        }

        Ok(pending)
    }

    /// Number of records waiting for the next report.
    pub fn pending_contact_count(&self) -> Result<usize, StorageError> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM pending_contacts", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
