//! Proximity Scan Source
//!
//! The Bluetooth scanner lives on the platform side. This module defines the
//! seam it plugs into and a mock for tests.

use std::sync::Mutex;

use thiserror::Error;

use super::ContactRecord;

/// Errors reported by a proximity source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProximityError {
    #[error("Bluetooth unavailable")]
    Unavailable,

    #[error("Scanner permission denied")]
    PermissionDenied,

    #[error("Device error: {0}")]
    DeviceError(String),
}

/// Source of observed proximity contacts.
///
/// Implemented by the platform scanner. Each call hands over the records
/// observed since the previous call; a record is returned at most once.
pub trait ProximitySource: Send + Sync {
    /// Takes all contacts observed since the last call.
    fn drain(&self) -> Result<Vec<ContactRecord>, ProximityError>;

    /// Whether the scanner is currently running.
    fn is_scanning(&self) -> bool {
        true
    }
}

/// Mock proximity source for testing.
pub struct MockProximitySource {
    observed: Mutex<Vec<ContactRecord>>,
    /// Whether operations should succeed.
    pub should_succeed: bool,
}

impl MockProximitySource {
    /// Creates a mock that yields the given records on the next drain.
    pub fn new(records: Vec<ContactRecord>) -> Self {
        MockProximitySource {
            observed: Mutex::new(records),
            should_succeed: true,
        }
    }

    /// Creates a mock whose scanner always fails.
    pub fn failure() -> Self {
        MockProximitySource {
            observed: Mutex::new(Vec::new()),
            should_succeed: false,
        }
    }

    /// Simulates a new observation.
    pub fn observe(&self, record: ContactRecord) {
        if let Ok(mut observed) = self.observed.lock() {
            observed.push(record);
        }
    }
}

impl ProximitySource for MockProximitySource {
    fn drain(&self) -> Result<Vec<ContactRecord>, ProximityError> {
        if !self.should_succeed {
            return Err(ProximityError::DeviceError("Mock failure".into()));
        }
        let mut observed = self
            .observed
            .lock()
            .map_err(|_| ProximityError::DeviceError("scanner state poisoned".into()))?;
        Ok(std::mem::take(&mut *observed))
    }

    fn is_scanning(&self) -> bool {
        self.should_succeed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_returns_each_record_once() {
        let source = MockProximitySource::new(vec![ContactRecord::new(1, 2, "m", -1, -2).unwrap()]);
        assert_eq!(source.drain().unwrap().len(), 1);
        assert!(source.drain().unwrap().is_empty());

        source.observe(ContactRecord::new(3, 4, "n", -1, -2).unwrap());
        assert_eq!(source.drain().unwrap()[0].mac(), "n");
    }

    #[test]
    fn test_failure() {
        let source = MockProximitySource::failure();
        assert!(!source.is_scanning());
        assert!(source.drain().is_err());
    }
}
