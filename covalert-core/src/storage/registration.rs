// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Registration storage operations.

use rusqlite::params;

use super::{Storage, StorageError};
use crate::registration::Registration;

impl Storage {
    // === Registration Operations ===

    /// Saves the server-assigned registration, replacing any previous one.
    pub fn save_registration(&self, registration: &Registration) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO registration
             (id, device_id, server_public_key, protocol_version, registered_at)
             VALUES (1, ?1, ?2, ?3, ?4)",
            params![
                registration.device_id,
                registration.server_public_key.as_slice(),
                registration.protocol_version,
                registration.registered_at as i64,
            ],
        )?;
        Ok(())
    }

    /// Loads the registration, if any.
    pub fn load_registration(&self) -> Result<Option<Registration>, StorageError> {
        let result = self.conn.query_row(
            "SELECT device_id, server_public_key, protocol_version, registered_at
             FROM registration WHERE id = 1",
            [],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Vec<u8>>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            },
        );

        match result {
            Ok((device_id, key, protocol_version, registered_at)) => {
                let server_public_key: [u8; 32] = key.try_into().map_err(|_| {
                    StorageError::Serialization("server public key must be 32 bytes".into())
                })?;
                Ok(Some(Registration {
                    device_id,
                    server_public_key,
                    protocol_version,
                    registered_at: registered_at as u64,
                }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    /// Checks if a registration exists.
    pub fn has_registration(&self) -> Result<bool, StorageError> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM registration", [], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// Removes registration, pending contacts and exposure status in one transaction.
    pub fn wipe_protocol_state(&self) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM registration", [])?;
        tx.execute("DELETE FROM pending_contacts", [])?;
        tx.execute("DELETE FROM exposure_status", [])?;
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::ContactRecord;
    use crate::crypto::SymmetricKey;

    fn sample() -> Registration {
        Registration {
            device_id: "device-42".into(),
            server_public_key: [9u8; 32],
            protocol_version: 6,
            registered_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_save_load_registration() {
        let storage = Storage::in_memory(SymmetricKey::generate()).unwrap();
        assert!(storage.load_registration().unwrap().is_none());

        storage.save_registration(&sample()).unwrap();

        assert_eq!(storage.load_registration().unwrap(), Some(sample()));
        assert!(storage.has_registration().unwrap());
    }

    #[test]
    fn test_wipe_protocol_state() {
        let storage = Storage::in_memory(SymmetricKey::generate()).unwrap();
        storage.save_registration(&sample()).unwrap();
        storage
            .append_pending_contacts(&[ContactRecord::new(1, 2, "m", 3, 4).unwrap()], 1)
            .unwrap();

        storage.wipe_protocol_state().unwrap();

        assert!(!storage.has_registration().unwrap());
        assert_eq!(storage.pending_contact_count().unwrap(), 0);
        assert!(storage.load_exposure_status().unwrap().is_none());
    }
}
