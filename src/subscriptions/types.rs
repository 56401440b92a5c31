//! Subscription types for live inventory updates.

use crate::types::InventoryItem;
use serde::{Deserialize, Serialize};

/// Configuration for a subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max buffered events before dropping subscriber.
    /// Default: 256
    pub buffer_size: usize,

    /// Filter criteria.
    pub filter: SubscriptionFilter,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 256,
            filter: SubscriptionFilter::all(),
        }
    }
}

/// Filter criteria for subscriptions.
#[derive(Clone, Debug, Default)]
pub struct SubscriptionFilter {
    /// Include full-list refreshes.
    pub include_refreshes: bool,

    /// Include search projection changes.
    pub include_searches: bool,

    /// Include item removals.
    pub include_removals: bool,
}

impl SubscriptionFilter {
    /// Only full-list refreshes.
    pub fn refreshes() -> Self {
        Self {
            include_refreshes: true,
            ..Default::default()
        }
    }

    /// Only search projection changes.
    pub fn searches() -> Self {
        Self {
            include_searches: true,
            ..Default::default()
        }
    }

    /// Subscribe to everything.
    pub fn all() -> Self {
        Self {
            include_refreshes: true,
            include_searches: true,
            include_removals: true,
        }
    }
}

/// Events emitted to subscribers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InventoryEvent {
    /// Current view state, sent once when subscribing.
    Snapshot {
        items: Vec<InventoryItem>,
        filtered: Vec<InventoryItem>,
        query: String,
    },

    /// The full list was rebuilt from the store.
    Refreshed {
        items: Vec<InventoryItem>,
        total_quantity: i64,
    },

    /// The filtered projection changed.
    Filtered {
        query: String,
        /// Ids of the matching items, in list order.
        matches: Vec<String>,
    },

    /// An item was decremented out of existence.
    ItemRemoved { id: String },

    /// Finished the initial snapshot, now streaming live.
    CaughtUp,

    /// Subscription was dropped.
    Dropped { reason: DropReason },
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Receiver went away.
    Disconnected,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle to manage a subscription.
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<InventoryEvent>,
}

impl SubscriptionHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<InventoryEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<InventoryEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<InventoryEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Everything already buffered, without blocking.
    pub fn drain(&self) -> Vec<InventoryEvent> {
        self.receiver.try_iter().collect()
    }
}
