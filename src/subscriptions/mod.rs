//! Subscription system for live inventory updates.
//!
//! The view layer subscribes here instead of polling controller state:
//! - Full-list refreshes after every store mutation
//! - Search projection changes
//! - Item removals
//!
//! A new subscriber first receives a snapshot of the current state and a
//! `CaughtUp` marker, then live events. Buffers are bounded; a subscriber
//! that falls behind is dropped.
//!
//! # Example
//!
//! ```ignore
//! let handle = controller.subscribe(SubscriptionConfig::default());
//!
//! loop {
//!     match handle.recv() {
//!         Ok(InventoryEvent::Refreshed { items, .. }) => render(&items),
//!         Ok(InventoryEvent::Dropped { .. }) | Err(_) => break,
//!         Ok(_) => {}
//!     }
//! }
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{
    DropReason, InventoryEvent, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle,
    SubscriptionId,
};
