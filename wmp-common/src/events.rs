//! Event types for the WMP event system
//!
//! Committed workflow outcomes are broadcast on the [`EventBus`] after the
//! owning transaction commits. Delivery to browsers or mobile clients is
//! the job of an external pub/sub consumer subscribed to the bus; nothing
//! here waits for or depends on subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::db::Addressee;

/// Entity kinds moved by the workflow engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    MissedPickup,
    ManholeReport,
    RewardConversion,
    AreaServiceRequest,
    ResignRequest,
}

/// WMP event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WmpEvent {
    /// A notification row and its addressee link were committed
    NotificationCreated {
        notification_id: i64,
        addressee: Addressee,
        content: String,
        timestamp: DateTime<Utc>,
    },

    /// An entity reached a new status
    EntityTransitioned {
        entity: EntityKind,
        entity_id: i64,
        /// Status after the transition; `deleted` when the row was consumed
        status: String,
        timestamp: DateTime<Utc>,
    },
}

/// Broadcast bus for committed workflow events
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WmpEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<WmpEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: WmpEvent) -> Result<usize, broadcast::error::SendError<WmpEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: WmpEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
