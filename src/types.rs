//! Core types for the inventory.

use crate::error::{InventoryError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored document: an arbitrary mapping of field names to values.
pub type Document = serde_json::Map<String, Value>;

/// Field holding the item count.
pub const FIELD_QUANTITY: &str = "quantity";

/// Field holding the free-text description.
pub const FIELD_DESCRIPTION: &str = "description";

/// Field holding the entry date (stored as entered).
pub const FIELD_ENTRY_DATE: &str = "entryDate";

/// Field holding the expiry date (stored as entered).
pub const FIELD_EXPIRY_DATE: &str = "expiryDate";

/// A single inventory item as seen by the view.
///
/// The `id` is the item's display name and also the document key; it is
/// never stored as a field of the document itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: String,
    pub quantity: i64,
    pub description: String,
    pub entry_date: String,
    pub expiry_date: String,
}

impl InventoryItem {
    /// Materialize an item from a document and its key.
    ///
    /// Missing text fields read back as empty strings. A missing or
    /// non-integer quantity is a decode error.
    pub fn from_document(id: impl Into<String>, doc: &Document) -> Result<Self> {
        let id = id.into();
        let quantity = doc
            .get(FIELD_QUANTITY)
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                InventoryError::Deserialization(format!(
                    "document {:?} has no integer quantity",
                    id
                ))
            })?;

        Ok(Self {
            quantity,
            description: text_field(doc, FIELD_DESCRIPTION),
            entry_date: text_field(doc, FIELD_ENTRY_DATE),
            expiry_date: text_field(doc, FIELD_EXPIRY_DATE),
            id,
        })
    }

    /// The writable fields of this item.
    pub fn fields(&self) -> ItemFields {
        ItemFields {
            quantity: self.quantity,
            description: self.description.clone(),
            entry_date: self.entry_date.clone(),
            expiry_date: self.expiry_date.clone(),
        }
    }
}

fn text_field(doc: &Document, name: &str) -> String {
    match doc.get(name) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// The writable part of an item (everything but its key).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFields {
    pub quantity: i64,
    pub description: String,
    pub entry_date: String,
    pub expiry_date: String,
}

impl ItemFields {
    pub fn new(
        quantity: i64,
        description: impl Into<String>,
        entry_date: impl Into<String>,
        expiry_date: impl Into<String>,
    ) -> Self {
        Self {
            quantity,
            description: description.into(),
            entry_date: entry_date.into(),
            expiry_date: expiry_date.into(),
        }
    }

    /// All four fields as a document.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert(FIELD_QUANTITY.into(), Value::from(self.quantity));
        doc.insert(FIELD_DESCRIPTION.into(), Value::from(self.description.clone()));
        doc.insert(FIELD_ENTRY_DATE.into(), Value::from(self.entry_date.clone()));
        doc.insert(FIELD_EXPIRY_DATE.into(), Value::from(self.expiry_date.clone()));
        doc
    }

    /// Attach a key, producing the item a round trip through the store yields.
    pub fn into_item(self, id: impl Into<String>) -> InventoryItem {
        InventoryItem {
            id: id.into(),
            quantity: self.quantity,
            description: self.description,
            entry_date: self.entry_date,
            expiry_date: self.expiry_date,
        }
    }
}

/// A document holding only a quantity, for merge-writes that must leave
/// every other field untouched.
pub fn quantity_document(quantity: i64) -> Document {
    let mut doc = Document::new();
    doc.insert(FIELD_QUANTITY.into(), Value::from(quantity));
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_item_from_document() {
        let d = doc(json!({
            "quantity": 3,
            "description": "red",
            "entryDate": "2024-01-01",
            "expiryDate": "2024-02-01"
        }));

        let item = InventoryItem::from_document("apples", &d).unwrap();
        assert_eq!(item.id, "apples");
        assert_eq!(item.quantity, 3);
        assert_eq!(item.description, "red");
        assert_eq!(item.entry_date, "2024-01-01");
        assert_eq!(item.expiry_date, "2024-02-01");
    }

    #[test]
    fn test_missing_text_fields_are_empty() {
        let item = InventoryItem::from_document("pears", &quantity_document(7)).unwrap();
        assert_eq!(item.quantity, 7);
        assert_eq!(item.description, "");
        assert_eq!(item.entry_date, "");
        assert_eq!(item.expiry_date, "");
    }

    #[test]
    fn test_non_integer_quantity_rejected() {
        let d = doc(json!({ "quantity": "many" }));
        let result = InventoryItem::from_document("plums", &d);
        assert!(matches!(result, Err(InventoryError::Deserialization(_))));

        let result = InventoryItem::from_document("plums", &Document::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_fields_document_uses_wire_names() {
        let fields = ItemFields::new(2, "green", "2024-03-01", "2024-04-01");
        let d = fields.to_document();
        assert_eq!(d.len(), 4);
        assert_eq!(d["entryDate"], json!("2024-03-01"));
        assert_eq!(d["expiryDate"], json!("2024-04-01"));

        let item = InventoryItem::from_document("limes", &d).unwrap();
        assert_eq!(item, fields.into_item("limes"));
    }

    #[test]
    fn test_item_serializes_camel_case() {
        let item = ItemFields::new(1, "", "a", "b").into_item("x");
        let v = serde_json::to_value(&item).unwrap();
        assert_eq!(v["entryDate"], json!("a"));
        assert_eq!(v["expiryDate"], json!("b"));
    }
}
