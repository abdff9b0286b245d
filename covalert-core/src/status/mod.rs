// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Exposure Status Sync
//!
//! Periodic report of the contact batch and retrieval of the exposure
//! verdict:
//!
//! ```text
//! Idle -> Authenticating -> Submitting -> AwaitingVerdict -> Idle
//!                 \______________\_______________\________-> Failed
//! ```
//!
//! A batch is cleared only together with storing the new verdict; on any
//! failure it is kept for the next attempt.

mod sync;

pub use sync::StatusSync;

use serde::{Deserialize, Serialize};

/// Last verdict received from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureStatus {
    pub at_risk: bool,
    /// When the verdict was received, seconds since the Unix epoch.
    pub last_status_received_date: u64,
    /// Most recent exposure the server reported, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_exposure_date: Option<u64>,
}

/// Phase of the status exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Idle,
    /// Computing the request MAC.
    Authenticating,
    /// Request on the wire.
    Submitting,
    /// Response received, verdict being read and committed.
    AwaitingVerdict,
    /// The last attempt failed. The batch was kept.
    Failed,
}

impl SyncPhase {
    /// True while an exchange is in flight.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SyncPhase::Authenticating | SyncPhase::Submitting | SyncPhase::AwaitingVerdict
        )
    }
}
