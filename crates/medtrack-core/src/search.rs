//! Quick sell/restock search and the inventory table filter.

use serde::{Deserialize, Serialize};

use crate::models::{InventoryItem, StockAction};

/// A sell or restock ready to send to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub item_id: String,
    pub action: StockAction,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Selection {
    item_id: String,
    action: StockAction,
}

/// State of the search dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchController {
    open: bool,
    query: String,
    selection: Option<Selection>,
}

impl SearchController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the dialog with an empty query.
    pub fn open(&mut self) {
        self.open = true;
        self.query.clear();
        self.selection = None;
    }

    pub fn close(&mut self) {
        self.open = false;
        self.selection = None;
    }

    pub fn toggle(&mut self) {
        if self.open {
            self.close();
        } else {
            self.open();
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Items whose name contains the query, ignoring case. Nothing for a
    /// blank query.
    pub fn results<'a>(&self, items: &'a [InventoryItem]) -> Vec<&'a InventoryItem> {
        let needle = self.query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        items
            .iter()
            .filter(|item| item.name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Pick an item and what to do with it. Clears any earlier pick.
    pub fn select(&mut self, item: &InventoryItem, action: StockAction) {
        self.selection = Some(Selection {
            item_id: item.id.clone(),
            action,
        });
    }

    /// Currently picked item id and action.
    pub fn selected(&self) -> Option<(&str, StockAction)> {
        self.selection
            .as_ref()
            .map(|selection| (selection.item_id.as_str(), selection.action))
    }

    pub fn cancel_selection(&mut self) {
        self.selection = None;
    }

    /// Turn the quantity field into an adjustment.
    ///
    /// Yields nothing without a selection or for anything but a positive
    /// whole number; the selection is kept so the user can correct it.
    pub fn submit(&mut self, quantity_text: &str) -> Option<StockAdjustment> {
        let quantity = quantity_text.trim().parse::<u32>().ok().filter(|q| *q > 0)?;
        let selection = self.selection.take()?;
        Some(StockAdjustment {
            item_id: selection.item_id,
            action: selection.action,
            quantity,
        })
    }
}

/// Inventory table filter: name or description contains `term`, ignoring
/// case. All rows for a blank term.
pub fn filter_table<'a>(items: &'a [InventoryItem], term: &str) -> Vec<&'a InventoryItem> {
    let needle = term.trim().to_lowercase();
    items
        .iter()
        .filter(|item| {
            needle.is_empty()
                || item.name.to_lowercase().contains(&needle)
                || item.description.to_lowercase().contains(&needle)
        })
        .collect()
}
