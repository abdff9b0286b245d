//! Event System
//!
//! Callbacks for protocol events, consumed by the UI collaborator.

use std::sync::Arc;

use crate::status::{ExposureStatus, SyncPhase};

/// Events emitted by the protocol core.
#[derive(Debug, Clone)]
pub enum CovAlertEvent {
    /// Registration completed.
    Registered {
        /// Server-assigned device identifier.
        device_id: String,
    },

    /// A status report succeeded and produced a new verdict.
    StatusUpdated {
        status: ExposureStatus,
        /// Number of contact records the report covered.
        reported: usize,
    },

    /// The status sync state machine moved.
    SyncPhaseChanged { phase: SyncPhase },

    /// A status report failed; the batch was kept.
    SyncFailed {
        /// Error description.
        error: String,
        retryable: bool,
    },

    /// The device identity was removed.
    Unregistered,

    /// Pending contacts and stored status were deleted on request.
    ExposureHistoryDeleted,
}

/// Receives protocol events. Called on the task that caused the event, so
/// implementations should return quickly.
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: CovAlertEvent);
}

/// Wraps a closure as an [`EventHandler`].
pub struct CallbackHandler<F> {
    callback: F,
}

impl<F: Fn(CovAlertEvent) + Send + Sync> CallbackHandler<F> {
    pub fn new(callback: F) -> Self {
        CallbackHandler { callback }
    }
}

impl<F: Fn(CovAlertEvent) + Send + Sync> EventHandler for CallbackHandler<F> {
    fn on_event(&self, event: CovAlertEvent) {
        (self.callback)(event)
    }
}

/// Handlers registered on one device.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Copies the handler list so events can be delivered without holding
    /// the lock that guards the dispatcher.
    pub fn snapshot(&self) -> Vec<Arc<dyn EventHandler>> {
        self.handlers.clone()
    }

    /// Delivers `event` to every handler in registration order.
    pub fn dispatch(&self, event: &CovAlertEvent) {
        deliver(&self.handlers, event);
    }
}

pub(crate) fn deliver(handlers: &[Arc<dyn EventHandler>], event: &CovAlertEvent) {
    for handler in handlers {
        handler.on_event(event.clone());
    }
}
