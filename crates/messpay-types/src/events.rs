//! Event types pushed by the daemon to notification subscribers.

use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// Envelope for all daemon events.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    pub timestamp: Timestamp,
    pub payload: serde_json::Value,
}

/// All event types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    // Ledger events
    /// A row transitioned Pending -> Paid. Fired once per transition.
    PayoutPaid,
    /// An admin moved a Paid row back to Pending.
    PayoutReverted,
    ReportGenerated,

    // System events
    DaemonStarted,
    ErrorOccurred,
}

impl EventType {
    /// Notification category used by subscription filters.
    pub fn category(&self) -> &'static str {
        match self {
            Self::PayoutPaid | Self::PayoutReverted => "payout",
            Self::ReportGenerated => "report",
            Self::DaemonStarted | Self::ErrorOccurred => "system",
        }
    }
}
