//! # Stockroom
//!
//! An inventory of named items kept in a document store, with a search
//! filter and a pie-chart dataset derived from the same filtered view.
//!
//! ## Core Concepts
//!
//! - **Items**: Documents keyed by display name, holding quantity,
//!   description and entry/expiry dates
//! - **Stores**: Pluggable document stores behind [`DocumentStore`]
//! - **Controller**: CRUD handlers that mutate the store then refetch
//! - **View state**: The full list, its filtered projection and form state
//! - **Subscriptions**: Live events for the view layer
//!
//! ## Example
//!
//! ```ignore
//! use stockroom::{InventoryController, ItemFields, MemoryStore};
//!
//! let mut inventory = InventoryController::with_store(MemoryStore::new());
//!
//! inventory.upsert_by_increment("apples", ItemFields::new(3, "red", "2024-01-01", "2024-02-01"))?;
//! inventory.upsert_by_increment("apples", ItemFields::new(2, "", "", ""))?;
//! assert_eq!(inventory.state().item("apples").unwrap().quantity, 5);
//!
//! inventory.filter("app");
//! let chart = inventory.state().chart();
//! ```

pub mod chart;
pub mod controller;
pub mod error;
pub mod filter;
pub mod form;
pub mod stores;
pub mod subscriptions;
pub mod types;
pub mod view;

// Re-exports
pub use chart::{PieChartData, PieDataset};
pub use controller::{Intent, InventoryConfig, InventoryController};
pub use error::{InventoryError, Result};
pub use filter::filter_items;
pub use form::{parse_quantity, Dialog, FormField, ItemForm};
pub use stores::{DocumentStore, FileStore, FileStoreConfig, MemoryStore, WriteMode};
pub use subscriptions::{
    DropReason, InventoryEvent, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle,
    SubscriptionId, SubscriptionManager,
};
pub use types::*;
pub use view::{total_quantity, InventoryState, InventoryStats};
