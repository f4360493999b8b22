//! Mutate-then-refetch flow over an inventory store.
//!
//! Every mutation is one store request followed by a full reload of
//! inventory and activities. The cached snapshot is only ever replaced
//! wholesale, never patched.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dashboard::{Dashboard, ExpiryPolicy};
use crate::models::{InventoryItem, ItemDraft, RawActivity, StockAction};
use crate::store::{InventoryStore, Notice, StoreError, StoreResult};

/// The client's copy of inventory and activity log.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub items: Vec<InventoryItem>,
    /// Newest first, as listed by the store
    pub activities: Vec<RawActivity>,
    /// Unset until the first successful load
    pub loaded_at: Option<DateTime<Utc>>,
}

/// Owns a store handle and the current snapshot.
pub struct InventoryController {
    store: Arc<dyn InventoryStore>,
    snapshot: Snapshot,
    last_error: Option<String>,
    policy: ExpiryPolicy,
}

impl InventoryController {
    pub fn new(store: Arc<dyn InventoryStore>, policy: ExpiryPolicy) -> Self {
        Self {
            store,
            snapshot: Snapshot::default(),
            last_error: None,
            policy,
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Error from the latest load, shown inline instead of the cards.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn policy(&self) -> ExpiryPolicy {
        self.policy
    }

    pub fn store(&self) -> &Arc<dyn InventoryStore> {
        &self.store
    }

    /// Dashboard cards for the current snapshot.
    pub fn dashboard(&self, now: DateTime<Utc>) -> Dashboard {
        Dashboard::compose(&self.snapshot, now, self.policy)
    }

    /// Fetch inventory and activities together. Either failing fails the
    /// load and keeps the previous snapshot.
    pub async fn refresh(&mut self) -> StoreResult<()> {
        let result = tokio::try_join!(self.store.list_items(), self.store.list_activities());

        match result {
            Ok((items, activities)) => {
                tracing::debug!(
                    items = items.len(),
                    activities = activities.len(),
                    "snapshot refreshed"
                );
                self.snapshot = Snapshot {
                    items,
                    activities,
                    loaded_at: Some(Utc::now()),
                };
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "snapshot refresh failed");
                self.last_error = Some(err.user_message());
                Err(err)
            }
        }
    }

    pub async fn create(&mut self, draft: &ItemDraft) -> Notice {
        if let Err(problems) = draft.validate() {
            return Notice::error("Could not add item", &StoreError::Validation(problems));
        }
        let outcome = self.store.create_item(draft).await;
        self.settle(
            outcome,
            "Could not add item",
            "Item added",
            format!("{} was added to the inventory", draft.name),
        )
        .await
    }

    pub async fn update(&mut self, id: &str, draft: &ItemDraft) -> Notice {
        if let Err(problems) = draft.validate() {
            return Notice::error("Could not update item", &StoreError::Validation(problems));
        }
        let outcome = self.store.update_item(id, draft).await;
        self.settle(
            outcome,
            "Could not update item",
            "Item updated",
            format!("{} was updated", draft.name),
        )
        .await
    }

    pub async fn delete(&mut self, id: &str) -> Notice {
        let name = self.item_name(id);
        let outcome = self.store.delete_item(id).await;
        self.settle(
            outcome,
            "Could not delete item",
            "Item deleted",
            format!("{} was removed from the inventory", name),
        )
        .await
    }

    pub async fn sell(&mut self, id: &str, quantity: u32) -> Notice {
        self.adjust(id, StockAction::Sell, quantity).await
    }

    pub async fn restock(&mut self, id: &str, quantity: u32) -> Notice {
        self.adjust(id, StockAction::Restock, quantity).await
    }

    /// Sell or restock. Stock floors are enforced by the store.
    pub async fn adjust(&mut self, id: &str, action: StockAction, quantity: u32) -> Notice {
        let name = self.item_name(id);
        let outcome = self.store.adjust_stock(id, action, quantity).await;
        let (failure, title, message) = match action {
            StockAction::Sell => (
                "Sale failed",
                "Sale recorded",
                format!("Sold {} of {}", quantity, name),
            ),
            StockAction::Restock => (
                "Restock failed",
                "Stock updated",
                format!("Restocked {} of {}", quantity, name),
            ),
        };
        self.settle(outcome, failure, title, message).await
    }

    async fn settle(
        &mut self,
        outcome: StoreResult<()>,
        failure_title: &str,
        success_title: &str,
        success_message: String,
    ) -> Notice {
        if let Err(err) = outcome {
            tracing::info!(error = %err, "{}", failure_title);
            return Notice::error(failure_title, &err);
        }

        tracing::info!("{}", success_title);
        // A failed reload leaves the mutation applied; the error shows inline.
        let _ = self.refresh().await;
        Notice::success(success_title, success_message)
    }

    fn item_name(&self, id: &str) -> String {
        self.snapshot
            .items
            .iter()
            .find(|item| item.id == id)
            .map(|item| item.name.clone())
            .unwrap_or_else(|| "item".to_string())
    }
}
