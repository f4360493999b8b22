//! Local store over the SQLite state file.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{InventoryStore, StoreResult};
use crate::db::{Database, DbResult};
use crate::models::{
    InventoryItem, ItemDraft, RawActivity, SaleRecord, SalesMetric, SalesPoint, StockAction,
    TopSeller,
};
use crate::reports::{self, TOP_SELLING_LIMIT};

/// Activity records returned per listing.
pub const LOCAL_ACTIVITY_LIMIT: usize = 10;

/// Store persisting into a local database.
pub struct LocalStore {
    db: Mutex<Database>,
}

impl LocalStore {
    /// Open the state file at `path`, creating it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Ok(Self::with_database(Database::open(path)?))
    }

    /// Store with nothing persisted (for testing).
    pub fn in_memory() -> StoreResult<Self> {
        Ok(Self::with_database(Database::open_in_memory()?))
    }

    pub fn with_database(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    /// Replace the inventory with the sample catalogue.
    pub fn seed_sample_inventory(&self) -> StoreResult<usize> {
        self.with_db(|db| db.seed_sample_inventory())
    }

    /// Every recorded sale.
    pub fn sales(&self) -> StoreResult<Vec<SaleRecord>> {
        self.with_db(|db| db.load_sales())
    }

    fn lock(&self) -> MutexGuard<'_, Database> {
        // Changes commit in one transaction, so poisoned state is still whole.
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_db<T>(&self, f: impl FnOnce(&Database) -> DbResult<T>) -> StoreResult<T> {
        let db = self.lock();
        f(&db).map_err(|e| {
            tracing::debug!(error = %e, "local store rejected request");
            e.into()
        })
    }
}

#[async_trait]
impl InventoryStore for LocalStore {
    async fn list_items(&self) -> StoreResult<Vec<InventoryItem>> {
        self.with_db(|db| db.load_items())
    }

    async fn list_activities(&self) -> StoreResult<Vec<RawActivity>> {
        self.with_db(|db| db.load_activities(LOCAL_ACTIVITY_LIMIT))
    }

    async fn create_item(&self, draft: &ItemDraft) -> StoreResult<()> {
        self.with_db(|db| db.insert_item(draft, Utc::now()).map(|_| ()))
    }

    async fn update_item(&self, id: &str, draft: &ItemDraft) -> StoreResult<()> {
        self.with_db(|db| db.update_item(id, draft, Utc::now()).map(|_| ()))
    }

    async fn delete_item(&self, id: &str) -> StoreResult<()> {
        self.with_db(|db| db.delete_item(id, Utc::now()).map(|_| ()))
    }

    async fn sell(&self, id: &str, quantity: u32) -> StoreResult<()> {
        self.with_db(|db| {
            db.adjust_stock(id, StockAction::Sell, quantity, Utc::now())
                .map(|_| ())
        })
    }

    async fn restock(&self, id: &str, quantity: u32) -> StoreResult<()> {
        self.with_db(|db| {
            db.adjust_stock(id, StockAction::Restock, quantity, Utc::now())
                .map(|_| ())
        })
    }

    async fn sales_over_time(&self, metric: SalesMetric) -> StoreResult<Vec<SalesPoint>> {
        let sales = self.sales()?;
        Ok(reports::sales_over_time(&sales, metric))
    }

    async fn top_selling(&self) -> StoreResult<Vec<TopSeller>> {
        let sales = self.sales()?;
        Ok(reports::top_selling(&sales, TOP_SELLING_LIMIT))
    }
}
