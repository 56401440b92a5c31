//! Add/update form state.
//!
//! The form keeps every field as the raw text the user typed. Quantities
//! are only coerced to integers when the form is submitted.

use crate::error::{InventoryError, Result};
use crate::types::{InventoryItem, ItemFields};
use serde::{Deserialize, Serialize};

/// Which dialog, if any, is showing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Dialog {
    #[default]
    Closed,
    Add,
    /// Editing an existing item, remembered by id.
    Update { item_id: String },
}

/// One editable form field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    ItemName,
    Description,
    EntryDate,
    ExpiryDate,
    Quantity,
}

/// Raw form contents.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemForm {
    pub item_name: String,
    pub description: String,
    pub entry_date: String,
    pub expiry_date: String,
    pub quantity: String,
}

impl ItemForm {
    /// A form pre-filled from an existing item.
    pub fn from_item(item: &InventoryItem) -> Self {
        Self {
            item_name: item.id.clone(),
            description: item.description.clone(),
            entry_date: item.entry_date.clone(),
            expiry_date: item.expiry_date.clone(),
            quantity: item.quantity.to_string(),
        }
    }

    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        match field {
            FormField::ItemName => self.item_name = value,
            FormField::Description => self.description = value,
            FormField::EntryDate => self.entry_date = value,
            FormField::ExpiryDate => self.expiry_date = value,
            FormField::Quantity => self.quantity = value,
        }
    }

    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::ItemName => &self.item_name,
            FormField::Description => &self.description,
            FormField::EntryDate => &self.entry_date,
            FormField::ExpiryDate => &self.expiry_date,
            FormField::Quantity => &self.quantity,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Coerce the form into writable fields.
    pub fn to_fields(&self) -> Result<ItemFields> {
        Ok(ItemFields {
            quantity: parse_quantity(&self.quantity)?,
            description: self.description.clone(),
            entry_date: self.entry_date.clone(),
            expiry_date: self.expiry_date.clone(),
        })
    }
}

/// Leading-integer coercion of a typed quantity.
///
/// Leading whitespace and an optional sign are accepted, then as many
/// decimal digits as follow; anything after the digits is ignored, so
/// `"12 boxes"` is 12. Text with no leading digits is rejected.
pub fn parse_quantity(text: &str) -> Result<i64> {
    let trimmed = text.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return Err(InventoryError::InvalidInput(format!(
            "quantity is not a number: {:?}",
            text
        )));
    }

    let magnitude: i64 = rest[..digits_len].parse().map_err(|_| {
        InventoryError::InvalidInput(format!("quantity out of range: {:?}", text))
    })?;

    Ok(if negative { -magnitude } else { magnitude })
}
