//! Subscription manager for broadcasting inventory events.

use crate::error::{InventoryError, Result};
use crate::types::InventoryItem;
use crate::view::total_quantity;
use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use super::types::{
    DropReason, InventoryEvent, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
};

/// Internal subscription state.
struct Subscription {
    config: SubscriptionConfig,
    sender: Sender<InventoryEvent>,
    /// Whether the initial snapshot has been delivered.
    caught_up: bool,
}

impl Subscription {
    /// Try to send an event. On failure returns why the subscriber must go.
    fn try_send(&self, event: InventoryEvent) -> std::result::Result<(), DropReason> {
        match self.sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(DropReason::BufferOverflow),
            Err(TrySendError::Disconnected(_)) => Err(DropReason::Disconnected),
        }
    }

    fn wants(&self, event: &InventoryEvent) -> bool {
        let filter = &self.config.filter;
        match event {
            InventoryEvent::Refreshed { .. } => filter.include_refreshes,
            InventoryEvent::Filtered { .. } => filter.include_searches,
            InventoryEvent::ItemRemoved { .. } => filter.include_removals,
            InventoryEvent::Snapshot { .. }
            | InventoryEvent::CaughtUp
            | InventoryEvent::Dropped { .. } => true,
        }
    }
}

/// Manages subscriptions and broadcasts events.
pub struct SubscriptionManager {
    /// Active subscriptions by ID.
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

impl SubscriptionManager {
    /// Create a new subscription manager.
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a new subscription.
    ///
    /// Returns a handle for receiving events. The subscription receives no
    /// live events until `mark_caught_up` is called.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(config.buffer_size.max(1));

        let subscription = Subscription {
            config,
            sender,
            caught_up: false,
        };

        self.subscriptions.write().insert(id, subscription);
        debug!(subscription = id.0, "subscribed");

        SubscriptionHandle { id, receiver }
    }

    /// Unsubscribe and clean up.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut subs = self.subscriptions.write();
        if let Some(sub) = subs.remove(&id) {
            // Best effort
            let _ = sub.sender.try_send(InventoryEvent::Dropped {
                reason: DropReason::Unsubscribed,
            });
        }
    }

    /// Mark a subscription as caught up (initial snapshot delivered).
    pub fn mark_caught_up(&self, id: SubscriptionId) -> Result<()> {
        let mut subs = self.subscriptions.write();
        if let Some(sub) = subs.get_mut(&id) {
            sub.caught_up = true;
            if sub.try_send(InventoryEvent::CaughtUp).is_err() {
                subs.remove(&id);
                return Err(InventoryError::SubscriptionDropped);
            }
        }
        Ok(())
    }

    /// Send an event directly to one subscription (for the initial
    /// snapshot). Returns false if the subscription is gone or full.
    pub fn send_to(&self, id: SubscriptionId, event: InventoryEvent) -> bool {
        let subs = self.subscriptions.read();
        match subs.get(&id) {
            Some(sub) => sub.try_send(event).is_ok(),
            None => false,
        }
    }

    /// Get subscription count.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// No subscribers, so events need not be built.
    fn is_idle(&self) -> bool {
        self.subscriptions.read().is_empty()
    }

    // --- Broadcasting ---

    /// Broadcast a rebuilt full list.
    pub fn broadcast_refresh(&self, items: &[InventoryItem]) {
        if self.is_idle() {
            return;
        }
        self.broadcast(InventoryEvent::Refreshed {
            items: items.to_vec(),
            total_quantity: total_quantity(items),
        });
    }

    /// Broadcast a new filtered projection.
    pub fn broadcast_filter(&self, query: &str, filtered: &[InventoryItem]) {
        if self.is_idle() {
            return;
        }
        self.broadcast(InventoryEvent::Filtered {
            query: query.to_string(),
            matches: filtered.iter().map(|item| item.id.clone()).collect(),
        });
    }

    /// Broadcast that an item no longer exists.
    pub fn broadcast_removed(&self, id: &str) {
        self.broadcast(InventoryEvent::ItemRemoved { id: id.to_string() });
    }

    /// Internal broadcast helper. Drops subscribers that fail to receive.
    fn broadcast(&self, event: InventoryEvent) {
        let mut to_remove = Vec::new();

        {
            let subs = self.subscriptions.read();
            for (id, sub) in subs.iter() {
                if sub.caught_up && sub.wants(&event) {
                    if let Err(reason) = sub.try_send(event.clone()) {
                        to_remove.push((*id, reason));
                    }
                }
            }
        }

        if !to_remove.is_empty() {
            let mut subs = self.subscriptions.write();
            for (id, reason) in to_remove {
                if let Some(sub) = subs.remove(&id) {
                    warn!(subscription = id.0, ?reason, "dropping subscriber");
                    let _ = sub.sender.try_send(InventoryEvent::Dropped { reason });
                }
            }
        }
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriptions::SubscriptionFilter;
    use crate::types::ItemFields;
    use std::time::Duration;

    fn item(id: &str, quantity: i64) -> InventoryItem {
        ItemFields::new(quantity, "", "", "").into_item(id)
    }

    fn live(manager: &SubscriptionManager, config: SubscriptionConfig) -> SubscriptionHandle {
        let handle = manager.subscribe(config);
        manager.mark_caught_up(handle.id).unwrap();
        let caught_up = handle.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(caught_up, InventoryEvent::CaughtUp);
        handle
    }

    #[test]
    fn test_subscribe_unsubscribe() {
        let manager = SubscriptionManager::new();

        let handle = manager.subscribe(SubscriptionConfig::default());
        assert_eq!(manager.subscription_count(), 1);

        manager.unsubscribe(handle.id);
        assert_eq!(manager.subscription_count(), 0);
        assert_eq!(
            handle.try_recv().unwrap(),
            InventoryEvent::Dropped {
                reason: DropReason::Unsubscribed
            }
        );
    }

    #[test]
    fn test_refresh_carries_total() {
        let manager = SubscriptionManager::new();
        let handle = live(&manager, SubscriptionConfig::default());

        manager.broadcast_refresh(&[item("a", 2), item("b", 3)]);

        match handle.recv_timeout(Duration::from_millis(100)).unwrap() {
            InventoryEvent::Refreshed {
                items,
                total_quantity,
            } => {
                assert_eq!(items.len(), 2);
                assert_eq!(total_quantity, 5);
            }
            other => panic!("Expected Refreshed event, got {:?}", other),
        }
    }

    #[test]
    fn test_filter_excludes_unwanted_events() {
        let manager = SubscriptionManager::new();
        let handle = live(
            &manager,
            SubscriptionConfig {
                filter: SubscriptionFilter::searches(),
                ..Default::default()
            },
        );

        manager.broadcast_refresh(&[item("a", 1)]);
        manager.broadcast_removed("a");
        manager.broadcast_filter("a", &[item("a", 1)]);

        let events = handle.drain();
        assert_eq!(
            events,
            vec![InventoryEvent::Filtered {
                query: "a".to_string(),
                matches: vec!["a".to_string()],
            }]
        );
    }

    #[test]
    fn test_refresh_filter_skips_searches_and_removals() {
        let manager = SubscriptionManager::new();
        let handle = live(
            &manager,
            SubscriptionConfig {
                filter: SubscriptionFilter::refreshes(),
                ..Default::default()
            },
        );

        manager.broadcast_filter("a", &[item("a", 1)]);
        manager.broadcast_removed("a");
        manager.broadcast_refresh(&[item("a", 1)]);

        let events = handle.drain();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            InventoryEvent::Refreshed {
                total_quantity: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_refresh_total_saturates() {
        let manager = SubscriptionManager::new();
        let handle = live(&manager, SubscriptionConfig::default());

        manager.broadcast_refresh(&[item("a", i64::MAX), item("b", i64::MAX)]);

        match handle.recv_timeout(Duration::from_millis(100)).unwrap() {
            InventoryEvent::Refreshed { total_quantity, .. } => {
                assert_eq!(total_quantity, i64::MAX);
            }
            other => panic!("Expected Refreshed event, got {:?}", other),
        }
    }

    #[test]
    fn test_broadcast_without_subscribers_is_noop() {
        let manager = SubscriptionManager::new();
        manager.broadcast_refresh(&[item("a", 1)]);
        manager.broadcast_filter("a", &[item("a", 1)]);
        assert_eq!(manager.subscription_count(), 0);
    }

    #[test]
    fn test_drop_slow_subscriber() {
        let manager = SubscriptionManager::new();
        let _handle = live(
            &manager,
            SubscriptionConfig {
                buffer_size: 2,
                ..Default::default()
            },
        );

        for i in 0..10 {
            manager.broadcast_removed(&format!("item-{}", i));
        }

        assert_eq!(manager.subscription_count(), 0);
    }

    #[test]
    fn test_drop_disconnected_subscriber() {
        let manager = SubscriptionManager::new();
        let handle = live(&manager, SubscriptionConfig::default());
        drop(handle);

        manager.broadcast_removed("a");
        assert_eq!(manager.subscription_count(), 0);
    }

    #[test]
    fn test_not_caught_up_doesnt_receive() {
        let manager = SubscriptionManager::new();
        let handle = manager.subscribe(SubscriptionConfig::default());

        manager.broadcast_removed("a");

        let result = handle.recv_timeout(Duration::from_millis(50));
        assert!(result.is_err());
    }
}
