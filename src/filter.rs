//! Search filtering over the fetched item list.

use crate::types::InventoryItem;

/// Normalize raw search text into the query stored in view state.
pub fn normalize_query(text: &str) -> String {
    text.to_lowercase()
}

/// Whether an item matches an already-normalized query.
///
/// An empty query matches everything.
pub fn matches(item: &InventoryItem, query: &str) -> bool {
    item.id.to_lowercase().contains(query) || item.description.to_lowercase().contains(query)
}

/// Items whose id or description contains `text`, ignoring case, in their
/// original order.
pub fn filter_items(items: &[InventoryItem], text: &str) -> Vec<InventoryItem> {
    let query = normalize_query(text);
    items
        .iter()
        .filter(|item| matches(item, &query))
        .cloned()
        .collect()
}
