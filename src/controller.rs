//! The inventory controller: CRUD handlers wired to view state.

use crate::error::{InventoryError, Result};
use crate::filter::{filter_items, normalize_query};
use crate::form::{Dialog, FormField, ItemForm};
use crate::stores::{DocumentStore, WriteMode};
use crate::subscriptions::{
    InventoryEvent, SubscriptionConfig, SubscriptionHandle, SubscriptionManager,
};
use crate::types::{quantity_document, InventoryItem, ItemFields};
use crate::view::InventoryState;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Controller configuration.
#[derive(Clone, Debug)]
pub struct InventoryConfig {
    /// Collection holding the item documents.
    pub collection: String,

    /// Reapply the current search query after every refresh. When false,
    /// a refresh resets the filtered view to the full list.
    pub search_on_refresh: bool,

    /// Default buffer size for subscriptions created via `subscribe_default`.
    pub event_buffer_size: usize,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            collection: "inventory".to_string(),
            search_on_refresh: true,
            event_buffer_size: 256,
        }
    }
}

/// A user intent coming back from the view layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    Refresh,
    OpenAdd,
    OpenUpdate { id: String },
    CloseDialog,
    EditForm { field: FormField, value: String },
    Submit,
    Remove { id: String },
    SearchChanged { text: String },
}

/// Owns the view state and mutates the store on its behalf.
///
/// Every mutation is followed by a full `list()`; the store stays the only
/// source of truth. Increment and decrement read the current quantity and
/// write a new one in two separate calls, so two controllers sharing a
/// store can lose updates.
pub struct InventoryController<S: DocumentStore> {
    store: S,
    config: InventoryConfig,
    state: InventoryState,
    subscriptions: SubscriptionManager,
}

impl<S: DocumentStore> InventoryController<S> {
    pub fn new(store: S, config: InventoryConfig) -> Self {
        Self {
            store,
            config,
            state: InventoryState::default(),
            subscriptions: SubscriptionManager::new(),
        }
    }

    /// Controller over the default `inventory` collection.
    pub fn with_store(store: S) -> Self {
        Self::new(store, InventoryConfig::default())
    }

    pub fn state(&self) -> &InventoryState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    // --- Store Operations ---

    /// Rebuild the item list from the store and recompute the filtered view.
    ///
    /// On error the previous state is left untouched.
    pub fn list(&mut self) -> Result<&[InventoryItem]> {
        let docs = self.store.fetch_all(&self.config.collection)?;
        let items = docs
            .iter()
            .map(|(key, doc)| InventoryItem::from_document(key.as_str(), doc))
            .collect::<Result<Vec<_>>>()?;

        let filtered = if self.config.search_on_refresh {
            filter_items(&items, &self.state.query)
        } else {
            self.state.query.clear();
            items.clone()
        };

        debug!(
            collection = %self.config.collection,
            items = items.len(),
            filtered = filtered.len(),
            "refreshed inventory"
        );

        self.state.items = items;
        self.state.filtered = filtered;

        self.subscriptions.broadcast_refresh(&self.state.items);
        self.subscriptions
            .broadcast_filter(&self.state.query, &self.state.filtered);

        Ok(&self.state.items)
    }

    /// Create `name` with `fields`, or add `fields.quantity` to the existing
    /// quantity. The increment path leaves description and dates untouched.
    pub fn upsert_by_increment(&mut self, name: &str, fields: ItemFields) -> Result<()> {
        validate_key(name)?;
        let collection = self.config.collection.as_str();

        match self.store.fetch(collection, name)? {
            Some(doc) => {
                let existing = InventoryItem::from_document(name, &doc)?.quantity;
                let quantity = existing.checked_add(fields.quantity).ok_or_else(|| {
                    InventoryError::InvalidInput(format!("quantity overflow for {:?}", name))
                })?;

                self.store
                    .write(collection, name, quantity_document(quantity), WriteMode::Merge)?;
                info!(item = name, from = existing, to = quantity, "incremented item");
            }
            None => {
                self.store
                    .write(collection, name, fields.to_document(), WriteMode::Replace)?;
                info!(item = name, quantity = fields.quantity, "created item");
            }
        }

        self.list()?;
        Ok(())
    }

    /// Take one off `id`, deleting it when the last one goes. A missing item
    /// is a no-op. An item already at zero goes to -1; only a quantity of
    /// exactly one triggers deletion. Decrementing `i64::MIN` is `InvalidInput`.
    pub fn decrement_or_delete(&mut self, id: &str) -> Result<()> {
        let collection = self.config.collection.as_str();

        match self.store.fetch(collection, id)? {
            None => {
                debug!(item = id, "decrement of missing item ignored");
            }
            Some(doc) => {
                let quantity = InventoryItem::from_document(id, &doc)?.quantity;
                if quantity == 1 {
                    self.store.delete(collection, id)?;
                    info!(item = id, "deleted item");
                    self.subscriptions.broadcast_removed(id);
                } else {
                    let next = quantity.checked_sub(1).ok_or_else(|| {
                        InventoryError::InvalidInput(format!("quantity underflow for {:?}", id))
                    })?;
                    self.store
                        .write(collection, id, quantity_document(next), WriteMode::Merge)?;
                    debug!(item = id, to = next, "decremented item");
                }
            }
        }

        self.list()?;
        Ok(())
    }

    /// Overwrite all four fields of `id`, creating the document if needed.
    pub fn replace_fields(&mut self, id: &str, fields: ItemFields) -> Result<()> {
        validate_key(id)?;

        self.store.write(
            &self.config.collection,
            id,
            fields.to_document(),
            WriteMode::Merge,
        )?;
        info!(item = id, quantity = fields.quantity, "replaced item fields");

        self.list()?;
        Ok(())
    }

    /// Narrow the filtered view to items matching `text` (case-insensitive)
    /// and remember it as the current query.
    pub fn filter(&mut self, text: &str) -> &[InventoryItem] {
        self.state.query = normalize_query(text);
        self.state.filtered = filter_items(&self.state.items, &self.state.query);

        self.subscriptions
            .broadcast_filter(&self.state.query, &self.state.filtered);
        &self.state.filtered
    }

    // --- Form Handling ---

    pub fn open_add(&mut self) {
        self.state.dialog = Dialog::Add;
    }

    /// Load an item from the current list into the form and open the
    /// update dialog for it.
    pub fn open_update(&mut self, id: &str) -> Result<()> {
        let form = self
            .state
            .item(id)
            .map(ItemForm::from_item)
            .ok_or_else(|| InventoryError::NotFound(id.to_string()))?;

        self.state.form = form;
        self.state.dialog = Dialog::Update {
            item_id: id.to_string(),
        };
        Ok(())
    }

    /// Close any dialog; the form keeps its contents.
    pub fn close_dialog(&mut self) {
        self.state.dialog = Dialog::Closed;
    }

    pub fn edit_form(&mut self, field: FormField, value: impl Into<String>) {
        self.state.form.set(field, value);
    }

    /// Submit the form for the open dialog. On success the form is cleared
    /// and the dialog closed; on failure both are kept.
    pub fn submit(&mut self) -> Result<()> {
        let fields = match &self.state.dialog {
            Dialog::Closed => {
                return Err(InventoryError::InvalidInput(
                    "no dialog is open".to_string(),
                ))
            }
            _ => self.state.form.to_fields()?,
        };

        match self.state.dialog.clone() {
            Dialog::Add => {
                let name = self.state.form.item_name.clone();
                self.upsert_by_increment(&name, fields)?;
            }
            Dialog::Update { item_id } => {
                self.replace_fields(&item_id, fields)?;
            }
            Dialog::Closed => {}
        }

        self.state.form.clear();
        self.state.dialog = Dialog::Closed;
        Ok(())
    }

    /// Route an intent to its handler.
    pub fn dispatch(&mut self, intent: Intent) -> Result<()> {
        debug!(?intent, "dispatch");
        match intent {
            Intent::Refresh => self.list().map(|_| ()),
            Intent::OpenAdd => {
                self.open_add();
                Ok(())
            }
            Intent::OpenUpdate { id } => self.open_update(&id),
            Intent::CloseDialog => {
                self.close_dialog();
                Ok(())
            }
            Intent::EditForm { field, value } => {
                self.edit_form(field, value);
                Ok(())
            }
            Intent::Submit => self.submit(),
            Intent::Remove { id } => self.decrement_or_delete(&id),
            Intent::SearchChanged { text } => {
                self.filter(&text);
                Ok(())
            }
        }
    }

    // --- Subscriptions ---

    /// Subscribe to live events. The subscriber first receives a snapshot of
    /// the current state, then `CaughtUp`.
    pub fn subscribe(&self, config: SubscriptionConfig) -> Result<SubscriptionHandle> {
        let handle = self.subscriptions.subscribe(config);

        let snapshot = InventoryEvent::Snapshot {
            items: self.state.items.clone(),
            filtered: self.state.filtered.clone(),
            query: self.state.query.clone(),
        };
        if !self.subscriptions.send_to(handle.id, snapshot) {
            self.subscriptions.unsubscribe(handle.id);
            return Err(InventoryError::SubscriptionDropped);
        }

        self.subscriptions.mark_caught_up(handle.id)?;
        Ok(handle)
    }

    /// Subscribe to everything with the configured buffer size.
    pub fn subscribe_default(&self) -> Result<SubscriptionHandle> {
        self.subscribe(SubscriptionConfig {
            buffer_size: self.config.event_buffer_size,
            ..Default::default()
        })
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(InventoryError::InvalidInput(
            "item name must not be empty".to_string(),
        ));
    }
    Ok(())
}
