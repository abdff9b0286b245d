// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Exposure status storage operations.

use rusqlite::{params, Connection};

use super::{Storage, StorageError};
use crate::status::ExposureStatus;

fn upsert_status(conn: &Connection, status: &ExposureStatus) -> Result<(), StorageError> {
    conn.execute(
        "INSERT OR REPLACE INTO exposure_status
         (id, at_risk, last_status_received_at, last_exposure_at)
         VALUES (1, ?1, ?2, ?3)",
        params![
            status.at_risk as i32,
            status.last_status_received_date as i64,
            status.last_exposure_date.map(|t| t as i64),
        ],
    )?;
    Ok(())
}

impl Storage {
    // === Exposure Status Operations ===

    /// Overwrites the stored exposure status.
    pub fn save_exposure_status(&self, status: &ExposureStatus) -> Result<(), StorageError> {
        upsert_status(&self.conn, status)
    }

    /// Loads the last received exposure status.
    pub fn load_exposure_status(&self) -> Result<Option<ExposureStatus>, StorageError> {
        let result = self.conn.query_row(
            "SELECT at_risk, last_status_received_at, last_exposure_at
             FROM exposure_status WHERE id = 1",
            [],
            |row| {
                Ok(ExposureStatus {
                    at_risk: row.get::<_, i32>(0)? != 0,
                    last_status_received_date: row.get::<_, i64>(1)? as u64,
                    last_exposure_date: row.get::<_, Option<i64>>(2)?.map(|t| t as u64),
                })
            },
        );

        match result {
            Ok(status) => Ok(Some(status)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    /// Commits a status report: deletes the reported pending rows and stores
    /// the new status in a single transaction.
    ///
    /// `through_id` is the watermark returned by `load_pending_batch`; rows
    /// appended after it are kept.
    pub fn commit_status_report(
        &self,
        through_id: Option<i64>,
        status: &ExposureStatus,
    ) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        if let Some(through_id) = through_id {
            tx.execute(
                "DELETE FROM pending_contacts WHERE id <= ?1",
                params![through_id],
            )?;
        }
        upsert_status(&tx, status)?;
        tx.commit()?;
        Ok(())
    }

    /// Clears the pending batch and the stored status together.
    pub fn clear_exposure_history(&self) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM pending_contacts", [])?;
        tx.execute("DELETE FROM exposure_status", [])?;
        tx.commit()?;
        Ok(())
    }
}
