// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Secure Key Storage
//!
//! Holds the two secrets a device owns: its X25519 private key and the
//! request-authentication key derived at registration. They never go into the
//! SQLite database. Backends: the OS keychain (`secure-storage` feature),
//! sealed files in the app's private directory, or memory.
//!
//! Nothing in this module logs key names together with key bytes, and error
//! messages never include key material.

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::storage::StorageError;

/// Named slots for device secrets.
pub trait SecureStorage: Send + Sync {
    /// Stores `key` under `name`, replacing any previous value.
    fn save_key(&self, name: &str, key: &[u8]) -> Result<(), StorageError>;

    /// None when the slot is empty.
    fn load_key(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Empties the slot. An empty slot is not an error.
    fn delete_key(&self, name: &str) -> Result<(), StorageError>;

    fn has_key(&self, name: &str) -> Result<bool, StorageError> {
        self.load_key(name).map(|k| k.is_some())
    }
}

/// OS keychain slots under one service name.
#[cfg(feature = "secure-storage")]
pub struct PlatformKeyring {
    service: String,
}

#[cfg(feature = "secure-storage")]
impl PlatformKeyring {
    pub fn new(service: impl Into<String>) -> Self {
        PlatformKeyring {
            service: service.into(),
        }
    }

    fn entry(&self, name: &str) -> Result<keyring::Entry, StorageError> {
        keyring::Entry::new(&self.service, name).map_err(|e| keychain_error("open", e))
    }
}

#[cfg(feature = "secure-storage")]
fn keychain_error(action: &str, e: keyring::Error) -> StorageError {
    StorageError::KeyStore(format!("keychain {} failed: {}", action, e))
}

#[cfg(feature = "secure-storage")]
impl SecureStorage for PlatformKeyring {
    fn save_key(&self, name: &str, key: &[u8]) -> Result<(), StorageError> {
        self.entry(name)?
            .set_secret(key)
            .map_err(|e| keychain_error("write", e))
    }

    fn load_key(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match self.entry(name)?.get_secret() {
            Err(keyring::Error::NoEntry) => Ok(None),
            other => other.map(Some).map_err(|e| keychain_error("read", e)),
        }
    }

    fn delete_key(&self, name: &str) -> Result<(), StorageError> {
        match self.entry(name)?.delete_credential() {
            Err(keyring::Error::NoEntry) => Ok(()),
            other => other.map_err(|e| keychain_error("delete", e)),
        }
    }
}

/// Encrypted key files in one directory, for platforms without a usable
/// keychain.
///
/// Each file is sealed with XChaCha20-Poly1305 bound to its key name, so a
/// file renamed to another slot fails to open.
pub struct FileKeyStorage {
    dir: PathBuf,
    file_key: crate::crypto::SymmetricKey,
}

impl FileKeyStorage {
    pub fn new(dir: PathBuf, file_key: crate::crypto::SymmetricKey) -> Self {
        FileKeyStorage { dir, file_key }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.key", file_stem(name)))
    }
}

/// Maps a key name to a file stem that cannot leave the directory.
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn io_error(action: &str, e: std::io::Error) -> StorageError {
    StorageError::KeyStore(format!("{} failed: {}", action, e))
}

impl SecureStorage for FileKeyStorage {
    fn save_key(&self, name: &str, key: &[u8]) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| io_error("create key directory", e))?;
        let sealed = crate::crypto::encrypt_bound(&self.file_key, name.as_bytes(), key)
            .map_err(|e| StorageError::Encryption(e.to_string()))?;

        // Write-then-rename so a crash never leaves a truncated key file
        let path = self.path_for(name);
        let staging = path.with_extension("key.tmp");
        std::fs::write(&staging, &sealed).map_err(|e| io_error("write key file", e))?;
        std::fs::rename(&staging, &path).map_err(|e| io_error("commit key file", e))
    }

    fn load_key(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let sealed = match std::fs::read(self.path_for(name)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("read key file", e)),
        };
        crate::crypto::decrypt_bound(&self.file_key, name.as_bytes(), &sealed)
            .map(Some)
            .map_err(|e| StorageError::Encryption(e.to_string()))
    }

    fn delete_key(&self, name: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("delete key file", e)),
        }
    }
}

/// In-memory key storage for tests and simulated devices.
#[derive(Default)]
pub struct MemoryKeyStorage {
    keys: Mutex<HashMap<String, Vec<u8>>>,
    unavailable: bool,
}

impl MemoryKeyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose every operation fails, simulating a locked or
    /// missing platform keychain.
    pub fn unavailable() -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
            unavailable: true,
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.keys.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.lock().is_empty()
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable {
            return Err(StorageError::KeyStore("key store unavailable".into()));
        }
        Ok(())
    }
}

impl SecureStorage for MemoryKeyStorage {
    fn save_key(&self, name: &str, key: &[u8]) -> Result<(), StorageError> {
        self.check_available()?;
        self.keys.lock().insert(name.to_string(), key.to_vec());
        Ok(())
    }

    fn load_key(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.check_available()?;
        Ok(self.keys.lock().get(name).cloned())
    }

    fn delete_key(&self, name: &str) -> Result<(), StorageError> {
        self.check_available()?;
        self.keys.lock().remove(name);
        Ok(())
    }
}
