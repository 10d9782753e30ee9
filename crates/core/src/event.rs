//! Domain event system — decoupled observation of the relay.
//!
//! The router publishes an event for every step worth noticing. Other
//! components (status endpoints, tests) can subscribe without the router
//! knowing about them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A message passed the router's filter
    MessageReceived {
        identity: String,
        content_preview: String,
        timestamp: DateTime<Utc>,
    },

    /// A conversation was opened for a previously unseen identity
    SessionCreated {
        identity: String,
        catalog_rows: usize,
        timestamp: DateTime<Utc>,
    },

    /// A generated reply was recorded and handed to the transport
    ReplySent {
        identity: String,
        model: String,
        tokens_used: u32,
        timestamp: DateTime<Utc>,
    },

    /// The completion backend failed and the apology was sent instead
    GenerationFailed {
        identity: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// The transport rejected an outbound message
    DeliveryFailed {
        identity: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // Ignore send errors (no subscribers = that's fine)
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
