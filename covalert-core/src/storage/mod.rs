// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Persistent Storage Module
//!
//! Holds the minimal state needed to resume the protocol across restarts:
//! the registration record, the pending contact batch and the last exposure
//! status. Key material lives behind [`SecureStorage`], never in SQLite;
//! contact rows are sealed with the storage key before they are written.

mod error;
mod pending;
mod registration;
mod status;

pub mod migration;
pub mod secure;

pub use error::StorageError;
pub use pending::PendingBatch;
pub use secure::{FileKeyStorage, MemoryKeyStorage, SecureStorage};

#[cfg(feature = "secure-storage")]
pub use secure::PlatformKeyring;

use rusqlite::Connection;
use std::path::Path;

use crate::crypto::SymmetricKey;

/// SQLite database of one device.
pub struct Storage {
    conn: Connection,
    /// Seals pending contact rows.
    pub(crate) encryption_key: SymmetricKey,
}

impl Storage {
    /// Opens or creates the database at `path` and brings its schema up to
    /// date.
    pub fn open<P: AsRef<Path>>(
        path: P,
        encryption_key: SymmetricKey,
    ) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        // Contacts arrive from the proximity source while a report commits
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Self::init(conn, encryption_key)
    }

    /// A database that lives as long as the value, for tests and simulated
    /// devices.
    pub fn in_memory(encryption_key: SymmetricKey) -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?, encryption_key)
    }

    fn init(conn: Connection, encryption_key: SymmetricKey) -> Result<Self, StorageError> {
        migration::MigrationRunner::run(&conn, &migration::all_migrations())?;
        Ok(Storage {
            conn,
            encryption_key,
        })
    }

    pub fn schema_version(&self) -> Result<u32, StorageError> {
        migration::MigrationRunner::current_version(&self.conn)
    }
}
