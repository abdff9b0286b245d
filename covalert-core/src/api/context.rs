// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Device Context
//!
//! Everything one device owns: its database, key store, clock, cached
//! shared secret, pending contact batch and event handlers. Protocol
//! components borrow the context through an `Arc`; several contexts can live
//! in one process to simulate several devices.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard, RwLock};
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use super::config::ClientConfig;
use super::error::{ProtocolError, ProtocolResult};
use super::events::{self, CovAlertEvent, EventDispatcher, EventHandler};
use crate::contact::{ContactBatch, ContactRecord, ProximitySource};
use crate::crypto::{MacKey, SymmetricKey};
use crate::registration::{Registration, SharedSecret, KEY_REQUEST_AUTH};
use crate::status::{ExposureStatus, SyncPhase};
use crate::storage::{MemoryKeyStorage, SecureStorage, Storage, StorageError};

/// Explicitly owned per-device state.
pub struct DeviceContext {
    storage: Mutex<Storage>,
    key_store: Arc<dyn SecureStorage>,
    clock: Arc<dyn Clock>,
    events: RwLock<EventDispatcher>,
    secret: RwLock<Option<SharedSecret>>,
    phase: Mutex<SyncPhase>,
    /// Serializes key generation and key-store writes.
    key_lock: Mutex<()>,
    /// Held for the whole register exchange.
    registration_gate: tokio::sync::Mutex<()>,
    /// Held for the whole status exchange.
    sync_gate: tokio::sync::Mutex<()>,
}

impl DeviceContext {
    /// Opens a device context.
    ///
    /// Uses `config.storage_path` for the database, or memory when unset.
    /// A previously completed registration is restored so `current_secret`
    /// survives restarts.
    pub fn open(
        config: &ClientConfig,
        storage_key: SymmetricKey,
        key_store: Arc<dyn SecureStorage>,
    ) -> ProtocolResult<Self> {
        let storage = match &config.storage_path {
            Some(path) => Storage::open(path, storage_key)?,
            None => Storage::in_memory(storage_key)?,
        };
        Self::from_parts(storage, key_store, Arc::new(SystemClock))
    }

    /// Creates a context with in-memory database and key store.
    pub fn in_memory() -> ProtocolResult<Self> {
        Self::from_parts(
            Storage::in_memory(SymmetricKey::generate())?,
            Arc::new(MemoryKeyStorage::new()),
            Arc::new(SystemClock),
        )
    }

    /// Builds a context from already opened parts.
    pub fn from_parts(
        storage: Storage,
        key_store: Arc<dyn SecureStorage>,
        clock: Arc<dyn Clock>,
    ) -> ProtocolResult<Self> {
        let secret = restore_secret(&storage, key_store.as_ref())?;
        Ok(DeviceContext {
            storage: Mutex::new(storage),
            key_store,
            clock,
            events: RwLock::new(EventDispatcher::new()),
            secret: RwLock::new(secret),
            phase: Mutex::new(SyncPhase::Idle),
            key_lock: Mutex::new(()),
            registration_gate: tokio::sync::Mutex::new(()),
            sync_gate: tokio::sync::Mutex::new(()),
        })
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // === Identity ===

    /// The shared secret, None before registration completes.
    pub fn current_secret(&self) -> Option<SharedSecret> {
        self.secret.read().clone()
    }

    pub fn is_registered(&self) -> bool {
        self.secret.read().is_some()
    }

    /// The stored registration record.
    pub fn registration(&self) -> ProtocolResult<Option<Registration>> {
        Ok(self.storage.lock().load_registration()?)
    }

    // === Contacts ===

    /// Appends records to the device's pending batch.
    pub fn record_contacts<I>(&self, records: I) -> ProtocolResult<usize>
    where
        I: IntoIterator<Item = ContactRecord>,
    {
        let records: Vec<ContactRecord> = records.into_iter().collect();
        if records.is_empty() {
            return Ok(0);
        }
        let now = self.clock.now();
        let stored = self
            .storage
            .lock()
            .append_pending_contacts(&records, now)?;
        debug!(stored, "contacts recorded");
        Ok(stored)
    }

    /// Drains a proximity source into the pending batch.
    pub fn collect_from(&self, source: &dyn ProximitySource) -> ProtocolResult<usize> {
        let records = source.drain()?;
        self.record_contacts(records)
    }

    /// A copy of the pending batch.
    pub fn pending_batch(&self) -> ProtocolResult<ContactBatch> {
        Ok(self.storage.lock().load_pending_batch()?.batch)
    }

    pub fn pending_count(&self) -> ProtocolResult<usize> {
        Ok(self.storage.lock().pending_contact_count()?)
    }

    // === Status ===

    /// The last exposure verdict, if any.
    pub fn exposure_status(&self) -> ProtocolResult<Option<ExposureStatus>> {
        Ok(self.storage.lock().load_exposure_status()?)
    }

    /// Current phase of the status sync state machine.
    pub fn sync_phase(&self) -> SyncPhase {
        *self.phase.lock()
    }

    // === Events ===

    /// Adds an event handler.
    pub fn add_event_handler(&self, handler: Arc<dyn EventHandler>) {
        self.events.write().add_handler(handler);
    }

    // === Crate internals ===

    pub(crate) fn storage(&self) -> MutexGuard<'_, Storage> {
        self.storage.lock()
    }

    pub(crate) fn key_store(&self) -> &dyn SecureStorage {
        self.key_store.as_ref()
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub(crate) fn key_lock(&self) -> MutexGuard<'_, ()> {
        self.key_lock.lock()
    }

    pub(crate) fn registration_gate(&self) -> &tokio::sync::Mutex<()> {
        &self.registration_gate
    }

    pub(crate) fn sync_gate(&self) -> &tokio::sync::Mutex<()> {
        &self.sync_gate
    }

    pub(crate) fn set_secret(&self, secret: Option<SharedSecret>) {
        *self.secret.write() = secret;
    }

    pub(crate) fn set_phase(&self, phase: SyncPhase) {
        let changed = {
            let mut current = self.phase.lock();
            let changed = *current != phase;
            *current = phase;
            changed
        };
        if changed {
            debug!(?phase, "sync phase");
            self.emit(CovAlertEvent::SyncPhaseChanged { phase });
        }
    }

    pub(crate) fn emit(&self, event: CovAlertEvent) {
        // Handlers may register further handlers
        let handlers = self.events.read().snapshot();
        events::deliver(&handlers, &event);
    }
}

fn restore_secret(
    storage: &Storage,
    key_store: &dyn SecureStorage,
) -> Result<Option<SharedSecret>, ProtocolError> {
    let Some(registration) = storage.load_registration()? else {
        return Ok(None);
    };
    match key_store.load_key(KEY_REQUEST_AUTH)? {
        Some(bytes) => {
            let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
                StorageError::Serialization("request key must be 32 bytes".into())
            })?;
            Ok(Some(SharedSecret::new(
                registration.device_id,
                MacKey::from_bytes(bytes),
            )))
        }
        None => {
            warn!("registration present but request key missing; treating device as unregistered");
            Ok(None)
        }
    }
}
