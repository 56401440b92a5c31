//! In-process document store.

use super::{apply_write, validate_collection, DocumentStore, WriteMode};
use crate::error::{InventoryError, Result};
use crate::types::Document;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Documents held in memory, keyed by collection then document key.
///
/// Listings come back ordered by key. The store can be switched offline,
/// after which every call fails with [`InventoryError::Transport`]; this is
/// how an unreachable backend is simulated.
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Document>>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Number of documents in a collection.
    pub fn document_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map(|c| c.len())
            .unwrap_or(0)
    }

    fn check_reachable(&self, collection: &str) -> Result<()> {
        if self.is_offline() {
            return Err(InventoryError::Transport(
                "memory store is offline".to_string(),
            ));
        }
        validate_collection(collection)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryStore {
    fn fetch_all(&self, collection: &str) -> Result<Vec<(String, Document)>> {
        self.check_reachable(collection)?;

        let collections = self.collections.read();
        let docs = collections
            .get(collection)
            .map(|c| c.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        Ok(docs)
    }

    fn fetch(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        self.check_reachable(collection)?;

        Ok(self
            .collections
            .read()
            .get(collection)
            .and_then(|c| c.get(key))
            .cloned())
    }

    fn write(&self, collection: &str, key: &str, fields: Document, mode: WriteMode) -> Result<()> {
        self.check_reachable(collection)?;

        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();
        let merged = apply_write(docs.remove(key), fields, mode);
        docs.insert(key.to_string(), merged);

        debug!(collection, key, ?mode, "memory store write");
        Ok(())
    }

    fn delete(&self, collection: &str, key: &str) -> Result<()> {
        self.check_reachable(collection)?;

        if let Some(docs) = self.collections.write().get_mut(collection) {
            docs.remove(key);
        }

        debug!(collection, key, "memory store delete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{quantity_document, ItemFields};

    #[test]
    fn test_write_fetch_delete() {
        let store = MemoryStore::new();
        let fields = ItemFields::new(3, "red", "a", "b").to_document();

        store
            .write("inventory", "apples", fields.clone(), WriteMode::Replace)
            .unwrap();
        assert_eq!(store.fetch("inventory", "apples").unwrap(), Some(fields));
        assert_eq!(store.document_count("inventory"), 1);

        store.delete("inventory", "apples").unwrap();
        assert_eq!(store.fetch("inventory", "apples").unwrap(), None);
        assert_eq!(store.document_count("inventory"), 0);
    }

    #[test]
    fn test_fetch_all_ordered_by_key() {
        let store = MemoryStore::new();
        for key in ["pears", "apples", "melons"] {
            store
                .write("inventory", key, quantity_document(1), WriteMode::Merge)
                .unwrap();
        }

        let keys: Vec<String> = store
            .fetch_all("inventory")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["apples", "melons", "pears"]);
    }

    #[test]
    fn test_collections_are_isolated() {
        let store = MemoryStore::new();
        store
            .write("inventory", "apples", quantity_document(1), WriteMode::Merge)
            .unwrap();

        assert!(store.fetch_all("archive").unwrap().is_empty());
        assert!(store.fetch("archive", "apples").unwrap().is_none());
    }

    #[test]
    fn test_delete_missing_is_ok() {
        let store = MemoryStore::new();
        store.delete("inventory", "ghost").unwrap();
    }

    #[test]
    fn test_offline_fails_with_transport() {
        let store = MemoryStore::new();
        store.set_offline(true);

        assert!(matches!(
            store.fetch_all("inventory"),
            Err(InventoryError::Transport(_))
        ));
        assert!(matches!(
            store.write("inventory", "a", quantity_document(1), WriteMode::Merge),
            Err(InventoryError::Transport(_))
        ));

        store.set_offline(false);
        assert!(store.fetch_all("inventory").is_ok());
    }
}
