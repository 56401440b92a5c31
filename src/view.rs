//! View state: everything the page renders from.

use crate::chart::PieChartData;
use crate::form::{Dialog, ItemForm};
use crate::types::InventoryItem;
use serde::{Deserialize, Serialize};

/// Application state handed to the view layer.
///
/// `items` is a cache of the store, rebuilt whole after every mutation.
/// `filtered` is always the subsequence of `items` matching `query`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryState {
    /// Every item, in store order.
    pub items: Vec<InventoryItem>,

    /// Items matching the current query, in store order.
    pub filtered: Vec<InventoryItem>,

    /// Current search query, lower-cased.
    pub query: String,

    /// Raw add/update form contents.
    pub form: ItemForm,

    /// Which dialog is open.
    pub dialog: Dialog,
}

/// Totals over the full list and the filtered projection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryStats {
    pub item_count: usize,
    pub total_quantity: i64,
    pub filtered_count: usize,
    pub filtered_quantity: i64,
}

impl InventoryState {
    /// Look up an item in the last fetched list.
    pub fn item(&self, id: &str) -> Option<&InventoryItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Chart dataset for the filtered projection.
    pub fn chart(&self) -> PieChartData {
        PieChartData::from_items(&self.filtered)
    }

    pub fn stats(&self) -> InventoryStats {
        InventoryStats {
            item_count: self.items.len(),
            total_quantity: total_quantity(&self.items),
            filtered_count: self.filtered.len(),
            filtered_quantity: total_quantity(&self.filtered),
        }
    }
}

/// Sum of quantities, pinned at the `i64` bounds instead of overflowing.
pub fn total_quantity(items: &[InventoryItem]) -> i64 {
    items
        .iter()
        .fold(0i64, |total, item| total.saturating_add(item.quantity))
}
