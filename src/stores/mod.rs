//! Document stores backing the inventory.
//!
//! The controller only needs four primitives from a store, all scoped to a
//! named collection:
//!
//! - fetch every document
//! - fetch one document by key
//! - write a document, either merging into or replacing what is there
//! - delete a document by key
//!
//! Two implementations ship with the crate: [`MemoryStore`] keeps everything
//! in process, [`FileStore`] persists each collection to its own file.

mod file;
mod memory;

pub use file::{FileStore, FileStoreConfig};
pub use memory::MemoryStore;

use crate::error::{InventoryError, Result};
use crate::types::Document;
use std::sync::Arc;

/// How a write combines with an existing document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    /// Overwrite only the supplied fields; others survive.
    Merge,
    /// Discard whatever was stored and keep exactly the supplied fields.
    Replace,
}

/// Collection-scoped access to a document store.
///
/// Both writes create the document when it does not exist. Deleting a
/// missing document is not an error.
pub trait DocumentStore: Send + Sync {
    /// All documents in the collection with their keys.
    fn fetch_all(&self, collection: &str) -> Result<Vec<(String, Document)>>;

    /// One document by key.
    fn fetch(&self, collection: &str, key: &str) -> Result<Option<Document>>;

    /// Write `fields` under `key`.
    fn write(&self, collection: &str, key: &str, fields: Document, mode: WriteMode) -> Result<()>;

    /// Remove the document under `key`.
    fn delete(&self, collection: &str, key: &str) -> Result<()>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    fn fetch_all(&self, collection: &str) -> Result<Vec<(String, Document)>> {
        (**self).fetch_all(collection)
    }

    fn fetch(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        (**self).fetch(collection, key)
    }

    fn write(&self, collection: &str, key: &str, fields: Document, mode: WriteMode) -> Result<()> {
        (**self).write(collection, key, fields, mode)
    }

    fn delete(&self, collection: &str, key: &str) -> Result<()> {
        (**self).delete(collection, key)
    }
}

/// Apply a write to the previous value of a document.
pub fn apply_write(existing: Option<Document>, fields: Document, mode: WriteMode) -> Document {
    match (mode, existing) {
        (WriteMode::Merge, Some(mut doc)) => {
            for (name, value) in fields {
                doc.insert(name, value);
            }
            doc
        }
        (WriteMode::Merge, None) | (WriteMode::Replace, _) => fields,
    }
}

/// Collection names become file names, so keep them to a safe alphabet.
pub(crate) fn validate_collection(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(InventoryError::InvalidInput(format!(
            "invalid collection name: {:?}",
            name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{quantity_document, ItemFields, FIELD_DESCRIPTION, FIELD_QUANTITY};
    use serde_json::json;

    #[test]
    fn test_merge_keeps_untouched_fields() {
        let existing = ItemFields::new(3, "red", "2024-01-01", "2024-02-01").to_document();
        let merged = apply_write(Some(existing), quantity_document(5), WriteMode::Merge);

        assert_eq!(merged[FIELD_QUANTITY], json!(5));
        assert_eq!(merged[FIELD_DESCRIPTION], json!("red"));
        assert_eq!(merged.len(), 4);
    }

    #[test]
    fn test_merge_into_missing_creates() {
        let merged = apply_write(None, quantity_document(1), WriteMode::Merge);
        assert_eq!(merged, quantity_document(1));
    }

    #[test]
    fn test_replace_drops_old_fields() {
        let existing = ItemFields::new(3, "red", "a", "b").to_document();
        let replaced = apply_write(Some(existing), quantity_document(9), WriteMode::Replace);
        assert_eq!(replaced.len(), 1);
        assert_eq!(replaced[FIELD_QUANTITY], json!(9));
    }

    #[test]
    fn test_collection_names() {
        assert!(validate_collection("inventory").is_ok());
        assert!(validate_collection("inv_2-b").is_ok());
        assert!(validate_collection("").is_err());
        assert!(validate_collection("../etc").is_err());
        assert!(validate_collection("a b").is_err());
    }
}
