//! Inventory operations over the persisted drug array.
//!
//! Every mutation rewrites the drug array, prepends an activity entry and,
//! for sales, appends to the sales ledger, all inside one transaction.

use chrono::{DateTime, TimeZone, Utc};

use super::{Database, DbError, DbResult, ACTIVITIES_KEY, DRUGS_KEY, SALES_KEY};
use crate::models::{
    InventoryItem, ItemDraft, RawActivity, SaleRecord, StockAction, StoredDrug, Unit,
};

impl Database {
    /// Load all drug records, adapting any in the prototype's shape.
    pub fn load_items(&self) -> DbResult<Vec<InventoryItem>> {
        let stored: Vec<StoredDrug> = self.read_state(DRUGS_KEY)?.unwrap_or_default();
        stored
            .into_iter()
            .map(|drug| InventoryItem::try_from(drug).map_err(DbError::Constraint))
            .collect()
    }

    /// Get a single item by id.
    pub fn get_item(&self, id: &str) -> DbResult<Option<InventoryItem>> {
        Ok(self.load_items()?.into_iter().find(|item| item.id == id))
    }

    /// Newest activity entries first.
    pub fn load_activities(&self, limit: usize) -> DbResult<Vec<RawActivity>> {
        let mut activities: Vec<RawActivity> =
            self.read_state(ACTIVITIES_KEY)?.unwrap_or_default();
        activities.truncate(limit);
        Ok(activities)
    }

    /// Every recorded sale, oldest first.
    pub fn load_sales(&self) -> DbResult<Vec<SaleRecord>> {
        Ok(self.read_state(SALES_KEY)?.unwrap_or_default())
    }

    /// Add a new item. Names are unique case-insensitively.
    pub fn insert_item(&self, draft: &ItemDraft, now: DateTime<Utc>) -> DbResult<InventoryItem> {
        let mut items = self.load_items()?;
        ensure_unique_name(&items, &draft.name, None)?;

        let item = InventoryItem {
            id: uuid::Uuid::new_v4().to_string(),
            name: draft.name.clone(),
            description: draft.description.clone(),
            quantity: draft.quantity,
            unit: draft.unit,
            price: draft.price,
            use_period: draft.use_period,
            reorder_level: draft.reorder_level,
            created_at: now,
            updated_at: now,
        };
        items.push(item.clone());

        let activity = RawActivity::recorded(
            "created",
            &item.id,
            format!("Created new item: {}", item.name),
            now,
        );
        self.commit_inventory(&items, activity, None)?;
        Ok(item)
    }

    /// Replace every editable field of an item.
    pub fn update_item(
        &self,
        id: &str,
        draft: &ItemDraft,
        now: DateTime<Utc>,
    ) -> DbResult<InventoryItem> {
        let mut items = self.load_items()?;
        ensure_unique_name(&items, &draft.name, Some(id))?;

        let item = find_mut(&mut items, id)?;
        item.name = draft.name.clone();
        item.description = draft.description.clone();
        item.quantity = draft.quantity;
        item.unit = draft.unit;
        item.price = draft.price;
        item.use_period = draft.use_period;
        item.reorder_level = draft.reorder_level;
        item.updated_at = now;
        let updated = item.clone();

        let activity = RawActivity::recorded(
            "updated",
            id,
            format!("Updated item: {}", updated.name),
            now,
        );
        self.commit_inventory(&items, activity, None)?;
        Ok(updated)
    }

    /// Remove an item, returning what was removed.
    pub fn delete_item(&self, id: &str, now: DateTime<Utc>) -> DbResult<InventoryItem> {
        let mut items = self.load_items()?;
        let position = items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| DbError::NotFound(format!("item {}", id)))?;
        let removed = items.remove(position);

        let activity = RawActivity::recorded(
            "deleted",
            id,
            format!("Deleted item: {}", removed.name),
            now,
        );
        self.commit_inventory(&items, activity, None)?;
        Ok(removed)
    }

    /// Sell or restock. Selling more than is in stock changes nothing.
    pub fn adjust_stock(
        &self,
        id: &str,
        action: StockAction,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> DbResult<InventoryItem> {
        if quantity == 0 {
            return Err(DbError::Constraint(
                "Quantity must be greater than zero".to_string(),
            ));
        }

        let mut items = self.load_items()?;
        let item = find_mut(&mut items, id)?;

        let (action_name, details, sale) = match action {
            StockAction::Sell => {
                item.quantity = item.quantity.checked_sub(quantity).ok_or_else(|| {
                    DbError::Constraint(format!(
                        "Insufficient stock: only {} {} of {} available",
                        item.quantity, item.unit, item.name
                    ))
                })?;
                let sale = SaleRecord {
                    item_id: item.id.clone(),
                    name: item.name.clone(),
                    quantity,
                    unit_price: item.price,
                    sold_at: now,
                };
                let details = format!("Sold {} {} of {}", quantity, item.unit, item.name);
                ("sold", details, Some(sale))
            }
            StockAction::Restock => {
                item.quantity = item.quantity.checked_add(quantity).ok_or_else(|| {
                    DbError::Constraint(format!("Quantity overflow for {}", item.name))
                })?;
                let details = format!("Restocked {} {} of {}", quantity, item.unit, item.name);
                ("restocked", details, None)
            }
        };
        item.updated_at = now;
        let adjusted = item.clone();

        let activity = RawActivity::recorded(action_name, id, details, now);
        self.commit_inventory(&items, activity, sale)?;
        Ok(adjusted)
    }

    /// Replace the inventory with the sample catalogue. Returns the count.
    pub fn seed_sample_inventory(&self) -> DbResult<usize> {
        let items = sample_inventory();
        self.write_state(DRUGS_KEY, &items)?;
        tracing::info!(count = items.len(), "seeded sample inventory");
        Ok(items.len())
    }

    fn commit_inventory(
        &self,
        items: &[InventoryItem],
        activity: RawActivity,
        sale: Option<SaleRecord>,
    ) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;

        self.write_state(DRUGS_KEY, items)?;

        let mut activities: Vec<RawActivity> =
            self.read_state(ACTIVITIES_KEY)?.unwrap_or_default();
        activities.insert(0, activity);
        self.write_state(ACTIVITIES_KEY, &activities)?;

        if let Some(sale) = sale {
            let mut sales = self.load_sales()?;
            sales.push(sale);
            self.write_state(SALES_KEY, &sales)?;
        }

        tx.commit()?;
        Ok(())
    }
}

fn find_mut<'a>(items: &'a mut [InventoryItem], id: &str) -> DbResult<&'a mut InventoryItem> {
    items
        .iter_mut()
        .find(|item| item.id == id)
        .ok_or_else(|| DbError::NotFound(format!("item {}", id)))
}

fn ensure_unique_name(
    items: &[InventoryItem],
    name: &str,
    except_id: Option<&str>,
) -> DbResult<()> {
    let lower = name.to_lowercase();
    let taken = items
        .iter()
        .any(|item| item.name.to_lowercase() == lower && Some(item.id.as_str()) != except_id);
    if taken {
        return Err(DbError::Constraint(format!(
            "An item with the name '{}' already exists (case-insensitive match)",
            name
        )));
    }
    Ok(())
}

fn sample_inventory() -> Vec<InventoryItem> {
    let sample = |id: &str,
                  name: &str,
                  description: &str,
                  quantity: u32,
                  unit: Unit,
                  use_period: u32,
                  price: f64,
                  reorder_level: u32,
                  (y, m, d): (i32, u32, u32)| {
        let stocked = Utc
            .with_ymd_and_hms(y, m, d, 0, 0, 0)
            .single()
            .unwrap_or_default();
        InventoryItem {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            quantity,
            unit,
            price,
            use_period,
            reorder_level,
            created_at: stocked,
            updated_at: stocked,
        }
    };

    vec![
        sample(
            "sample-1",
            "Paracetamol 500mg",
            "Pain relief tablets",
            1000,
            Unit::Tablets,
            365,
            5.99,
            200,
            (2024, 6, 1),
        ),
        sample(
            "sample-2",
            "Amoxicillin 250mg",
            "Antibiotic capsules",
            500,
            Unit::Capsules,
            180,
            8.99,
            100,
            (2024, 6, 10),
        ),
        sample(
            "sample-3",
            "Bandages",
            "Sterile gauze bandages",
            200,
            Unit::Rolls,
            730,
            3.99,
            50,
            (2024, 7, 1),
        ),
        sample(
            "sample-4",
            "Ibuprofen 200mg",
            "Anti-inflammatory tablets",
            800,
            Unit::Tablets,
            365,
            6.49,
            150,
            (2024, 6, 15),
        ),
        sample(
            "sample-5",
            "Cetirizine 10mg",
            "Allergy relief tablets",
            300,
            Unit::Tablets,
            365,
            4.99,
            60,
            (2024, 7, 5),
        ),
    ]
}
