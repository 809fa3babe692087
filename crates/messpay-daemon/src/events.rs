//! Event emission.
//!
//! Ledger transitions are broadcast to subscribers (payout notifications,
//! the audit log task). Each subscriber has an independent buffer; a slow
//! subscriber drops the oldest events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

pub use messpay_types::events::{Event, EventType};
use messpay_types::Timestamp;

/// Filter for event subscriptions.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Category filter: "payout", "report", "system". `None` = all.
    pub categories: Option<Vec<String>>,
}

impl EventFilter {
    pub fn matches(&self, event: &Event) -> bool {
        match &self.categories {
            Some(categories) => categories
                .iter()
                .any(|c| c == event.event_type.category()),
            None => true,
        }
    }
}

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn emit(&self, event_type: EventType, timestamp: Timestamp, payload: serde_json::Value) {
        self.sequence.fetch_add(1, Ordering::SeqCst);
        // No subscribers is not an error.
        let _ = self.sender.send(Event {
            event_type,
            timestamp,
            payload,
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Number of events emitted so far.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

/// Log every event matching `filter` until the bus closes.
pub async fn log_events(mut rx: broadcast::Receiver<Event>, filter: EventFilter) {
    loop {
        match rx.recv().await {
            Ok(event) if filter.matches(&event) => {
                tracing::info!(
                    event = ?event.event_type,
                    category = event.event_type.category(),
                    payload = %event.payload,
                    "event"
                );
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event log lagging, events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
