//! MedTrack Core Library
//!
//! Pharmacy inventory tracking: dashboard metrics, activity feed and the
//! mutate-then-refetch flow against an inventory store.
//!
//! # Architecture
//!
//! ```text
//!            ┌──────────────┐          ┌──────────────┐
//!            │  HttpStore   │          │  LocalStore  │
//!            │  (REST API)  │          │   (SQLite)   │
//!            └──────┬───────┘          └──────┬───────┘
//!                   └────────────┬────────────┘
//!                                │ InventoryStore
//!                                ▼
//!                    InventoryController
//!               (one request, then refetch both)
//!                                │
//!                        [Snapshot: items + activities]
//!                                │
//!                   ┌────────────┴────────────┐
//!                   ▼                         ▼
//!           Metrics Derivation       Activity Normalization
//!                   └────────────┬────────────┘
//!                                ▼
//!                       Dashboard (4 cards)
//! ```
//!
//! # Core Principle
//!
//! **The snapshot is never patched.** Every successful mutation is followed
//! by a full reload that replaces it wholesale.
//!
//! # Modules
//!
//! - [`db`]: SQLite state file, one JSON document per key
//! - [`models`]: Domain types (InventoryItem, RawActivity, User, etc.)
//! - [`dashboard`]: Metrics deriver, activity normalizer, presenter
//! - [`store`]: Remote and local inventory stores
//! - [`controller`]: Snapshot ownership and the mutation flow
//! - [`session`]: Signed-in user and the Google sign-in handshake
//! - [`search`]: Sell/restock search dialog and table filter
//! - [`reports`]: Sales aggregation for the local store
//! - [`alerts`]: Daily expiring/low-stock digest
//! - [`config`]: Layered configuration

pub mod alerts;
pub mod config;
pub mod controller;
pub mod dashboard;
pub mod db;
pub mod models;
pub mod reports;
pub mod search;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use alerts::{AlertDigest, NotificationLog};
pub use crate::config::{load_config, AppConfig, StoreKind};
pub use controller::{InventoryController, Snapshot};
pub use dashboard::{
    derive_metrics, normalize_activities, Dashboard, ExpiryPolicy, InventoryMetrics,
};
pub use db::Database;
pub use models::{
    Activity, ActivityKind, InventoryItem, ItemDraft, RawActivity, SalesMetric, StockAction, Unit,
    User,
};
pub use search::{filter_table, SearchController, StockAdjustment};
pub use session::{GoogleOAuth, Session};
pub use store::{HttpStore, InventoryStore, LocalStore, Notice, StoreError};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum MedtrackError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Sign-in error: {0}")]
    AuthError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<db::DbError> for MedtrackError {
    fn from(e: db::DbError) -> Self {
        MedtrackError::DatabaseError(e.to_string())
    }
}

impl From<StoreError> for MedtrackError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation(problems) => MedtrackError::InvalidInput(problems.join(", ")),
            StoreError::InvalidConfig(message) => MedtrackError::ConfigError(message),
            other => MedtrackError::StoreError(other.user_message()),
        }
    }
}

impl From<session::AuthError> for MedtrackError {
    fn from(e: session::AuthError) -> Self {
        MedtrackError::AuthError(e.to_string())
    }
}

impl From<crate::config::AppConfigError> for MedtrackError {
    fn from(e: crate::config::AppConfigError) -> Self {
        MedtrackError::ConfigError(e.to_string())
    }
}

impl From<std::io::Error> for MedtrackError {
    fn from(e: std::io::Error) -> Self {
        MedtrackError::ConfigError(format!("Runtime setup failed: {}", e))
    }
}

impl<T> From<std::sync::PoisonError<T>> for MedtrackError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        MedtrackError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open the local store at `state_path`.
#[uniffi::export]
pub fn open_local(
    state_path: String,
    expiry_policy: String,
) -> Result<Arc<MedtrackCore>, MedtrackError> {
    let policy = parse_policy(&expiry_policy)?;
    let store = Arc::new(LocalStore::open(&state_path)?);
    let state = Database::open(&state_path)?;
    MedtrackCore::build(store.clone(), Some(store), None, state, policy).map(Arc::new)
}

/// Local store with nothing persisted (for testing).
#[uniffi::export]
pub fn open_local_in_memory() -> Result<Arc<MedtrackCore>, MedtrackError> {
    let store = Arc::new(LocalStore::in_memory()?);
    let state = Database::open_in_memory()?;
    MedtrackCore::build(store.clone(), Some(store), None, state, ExpiryPolicy::default())
        .map(Arc::new)
}

/// Talk to the inventory API at `api_base_url`; the session lives in
/// `state_path`.
#[uniffi::export]
pub fn open_remote(
    api_base_url: String,
    state_path: String,
    request_timeout_secs: u64,
    expiry_policy: String,
) -> Result<Arc<MedtrackCore>, MedtrackError> {
    let policy = parse_policy(&expiry_policy)?;
    let state = Database::open(&state_path)?;
    let session = Session::restore(&state)?;
    let remote = HttpStore::new(
        &api_base_url,
        session.email().map(String::from),
        std::time::Duration::from_secs(request_timeout_secs),
    )?;
    MedtrackCore::build(Arc::new(remote.clone()), None, Some(remote), state, policy).map(Arc::new)
}

/// Open whichever store the layered configuration selects.
#[uniffi::export]
pub fn open_from_config() -> Result<Arc<MedtrackCore>, MedtrackError> {
    let cfg = load_config()?;
    let state_path = cfg.state_path.to_string_lossy().into_owned();
    match cfg.store {
        StoreKind::Local => open_local(state_path, cfg.expiry_policy.to_string()),
        StoreKind::Remote => {
            let policy = cfg.expiry_policy;
            let state = Database::open(&cfg.state_path)?;
            let session = Session::restore(&state)?;
            let email = session
                .email()
                .map(String::from)
                .or_else(|| cfg.user_email.clone());
            let remote = HttpStore::new(&cfg.api_base_url, email, cfg.request_timeout())?;
            MedtrackCore::build(Arc::new(remote.clone()), None, Some(remote), state, policy)
                .map(Arc::new)
        }
    }
}

fn parse_policy(raw: &str) -> Result<ExpiryPolicy, MedtrackError> {
    if raw.trim().is_empty() {
        return Ok(ExpiryPolicy::default());
    }
    raw.parse().map_err(MedtrackError::InvalidInput)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Inventory client for a native front end.
///
/// Store calls run to completion on a private current-thread runtime.
#[derive(uniffi::Object)]
pub struct MedtrackCore {
    runtime: tokio::runtime::Runtime,
    controller: Mutex<InventoryController>,
    search: Mutex<SearchController>,
    session: Mutex<Session>,
    state: Mutex<Database>,
    local: Option<Arc<LocalStore>>,
    remote: Option<HttpStore>,
}

impl MedtrackCore {
    fn build(
        store: Arc<dyn InventoryStore>,
        local: Option<Arc<LocalStore>>,
        remote: Option<HttpStore>,
        state: Database,
        policy: ExpiryPolicy,
    ) -> Result<Self, MedtrackError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let session = Session::restore(&state)?;
        Ok(Self {
            runtime,
            controller: Mutex::new(InventoryController::new(store, policy)),
            search: Mutex::new(SearchController::new()),
            session: Mutex::new(session),
            state: Mutex::new(state),
            local,
            remote,
        })
    }
}

#[uniffi::export]
impl MedtrackCore {
    // =========================================================================
    // Snapshot Operations
    // =========================================================================

    /// Reload inventory and activities.
    pub fn refresh(&self) -> Result<(), MedtrackError> {
        let mut controller = self.controller.lock()?;
        self.runtime.block_on(controller.refresh())?;
        Ok(())
    }

    /// The four dashboard cards as of now.
    pub fn dashboard(&self) -> Result<FfiDashboard, MedtrackError> {
        let controller = self.controller.lock()?;
        let mut dashboard: FfiDashboard = controller.dashboard(Utc::now()).into();
        dashboard.error = controller.last_error().map(String::from);
        Ok(dashboard)
    }

    /// Every item in the snapshot.
    pub fn items(&self) -> Result<Vec<FfiInventoryItem>, MedtrackError> {
        self.filter_items(String::new())
    }

    /// Inventory table rows matching `term` on name or description.
    pub fn filter_items(&self, term: String) -> Result<Vec<FfiInventoryItem>, MedtrackError> {
        let controller = self.controller.lock()?;
        let now = Utc::now();
        Ok(filter_table(&controller.snapshot().items, &term)
            .into_iter()
            .map(|item| FfiInventoryItem::from_item(item, now))
            .collect())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn create_item(&self, draft: FfiItemDraft) -> Result<FfiNotice, MedtrackError> {
        let draft = ItemDraft::try_from(draft)?;
        let mut controller = self.controller.lock()?;
        Ok(self.runtime.block_on(controller.create(&draft)).into())
    }

    pub fn update_item(&self, id: String, draft: FfiItemDraft) -> Result<FfiNotice, MedtrackError> {
        let draft = ItemDraft::try_from(draft)?;
        let mut controller = self.controller.lock()?;
        Ok(self.runtime.block_on(controller.update(&id, &draft)).into())
    }

    pub fn delete_item(&self, id: String) -> Result<FfiNotice, MedtrackError> {
        let mut controller = self.controller.lock()?;
        Ok(self.runtime.block_on(controller.delete(&id)).into())
    }

    pub fn sell(&self, id: String, quantity: u32) -> Result<FfiNotice, MedtrackError> {
        let mut controller = self.controller.lock()?;
        Ok(self.runtime.block_on(controller.sell(&id, quantity)).into())
    }

    pub fn restock(&self, id: String, quantity: u32) -> Result<FfiNotice, MedtrackError> {
        let mut controller = self.controller.lock()?;
        Ok(self.runtime.block_on(controller.restock(&id, quantity)).into())
    }

    /// Replace the local inventory with the sample catalogue.
    pub fn seed_sample_inventory(&self) -> Result<u32, MedtrackError> {
        let local = self.local.as_ref().ok_or_else(|| {
            MedtrackError::ConfigError("Seeding is only available for the local store".into())
        })?;
        let count = local.seed_sample_inventory()?;
        self.refresh()?;
        Ok(count as u32)
    }

    // =========================================================================
    // Search Dialog
    // =========================================================================

    pub fn open_search(&self) -> Result<(), MedtrackError> {
        self.search.lock()?.open();
        Ok(())
    }

    pub fn close_search(&self) -> Result<(), MedtrackError> {
        self.search.lock()?.close();
        Ok(())
    }

    /// Update the query and return the matching items.
    pub fn search(&self, query: String) -> Result<Vec<FfiInventoryItem>, MedtrackError> {
        let mut search = self.search.lock()?;
        search.set_query(query);
        let controller = self.controller.lock()?;
        let now = Utc::now();
        Ok(search
            .results(&controller.snapshot().items)
            .into_iter()
            .map(|item| FfiInventoryItem::from_item(item, now))
            .collect())
    }

    /// Pick an item for `action` (`sell` or `restock`).
    pub fn select_for(&self, id: String, action: String) -> Result<(), MedtrackError> {
        let action = match action.trim().to_lowercase().as_str() {
            "sell" => StockAction::Sell,
            "restock" => StockAction::Restock,
            other => {
                return Err(MedtrackError::InvalidInput(format!(
                    "unknown stock action '{}'",
                    other
                )))
            }
        };
        let item = self
            .controller
            .lock()?
            .snapshot()
            .items
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or_else(|| MedtrackError::InvalidInput(format!("no item with id {}", id)))?;
        self.search.lock()?.select(&item, action);
        Ok(())
    }

    /// Submit the quantity field. `None` when it is not a positive number.
    pub fn submit_search(&self, quantity_text: String) -> Result<Option<FfiNotice>, MedtrackError> {
        let adjustment = self.search.lock()?.submit(&quantity_text);
        let Some(adjustment) = adjustment else {
            return Ok(None);
        };
        let mut controller = self.controller.lock()?;
        let notice = self.runtime.block_on(controller.adjust(
            &adjustment.item_id,
            adjustment.action,
            adjustment.quantity,
        ));
        Ok(Some(notice.into()))
    }

    // =========================================================================
    // Reports
    // =========================================================================

    /// Per-day totals by `quantity` or `revenue`.
    pub fn sales_over_time(&self, metric: String) -> Result<Vec<FfiSalesPoint>, MedtrackError> {
        let metric: SalesMetric = metric.parse().map_err(MedtrackError::InvalidInput)?;
        let store = self.controller.lock()?.store().clone();
        let points = self.runtime.block_on(store.sales_over_time(metric))?;
        Ok(points.into_iter().map(Into::into).collect())
    }

    pub fn top_selling(&self) -> Result<Vec<FfiTopSeller>, MedtrackError> {
        let store = self.controller.lock()?.store().clone();
        let sellers = self.runtime.block_on(store.top_selling())?;
        Ok(sellers.into_iter().map(Into::into).collect())
    }

    /// Expiring and low-stock digest, if anything needs attention.
    pub fn alert_digest(&self) -> Result<Option<FfiAlertDigest>, MedtrackError> {
        let controller = self.controller.lock()?;
        Ok(AlertDigest::build(&controller.snapshot().items, Utc::now()).map(Into::into))
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Google sign-in URL.
    pub fn authorization_url(
        &self,
        client_id: String,
        redirect_uri: String,
        state: String,
    ) -> Result<String, MedtrackError> {
        GoogleOAuth::new(client_id, redirect_uri)
            .authorization_url(&state)
            .map(String::from)
            .map_err(|e| MedtrackError::ConfigError(e.to_string()))
    }

    /// Finish sign-in from the provider's redirect URL.
    pub fn complete_login(&self, callback_url: String) -> Result<FfiUser, MedtrackError> {
        let code = session::authorization_code(&callback_url)?;
        let remote = self.remote.as_ref().ok_or_else(|| {
            MedtrackError::ConfigError("Sign-in requires the remote store".into())
        })?;
        let user = self.runtime.block_on(remote.exchange_code(&code))?;

        let state = self.state.lock()?;
        self.session.lock()?.login(&state, user.clone())?;

        let store = Arc::new(remote.with_user_email(Some(user.email.clone())));
        let mut controller = self.controller.lock()?;
        *controller = InventoryController::new(store, controller.policy());

        Ok(user.into())
    }

    pub fn logout(&self) -> Result<(), MedtrackError> {
        let state = self.state.lock()?;
        self.session.lock()?.logout(&state)?;
        Ok(())
    }

    pub fn current_user(&self) -> Result<Option<FfiUser>, MedtrackError> {
        Ok(self.session.lock()?.user().cloned().map(Into::into))
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe inventory item with its derived fields.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiInventoryItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub quantity: u32,
    pub unit: String,
    pub price: f64,
    pub use_period: u32,
    pub reorder_level: u32,
    pub created_at: String,
    pub expiry_date: String,
    pub days_until_expiry: i64,
    pub is_low_stock: bool,
}

impl FfiInventoryItem {
    fn from_item(item: &InventoryItem, now: DateTime<Utc>) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            description: item.description.clone(),
            quantity: item.quantity,
            unit: item.unit.to_string(),
            price: item.price,
            use_period: item.use_period,
            reorder_level: item.reorder_level,
            created_at: item.created_at.to_rfc3339(),
            expiry_date: item.expiry_date().format("%Y-%m-%d").to_string(),
            days_until_expiry: item.days_until_expiry(now),
            is_low_stock: item.is_low_stock(),
        }
    }
}

/// FFI-safe create/edit form.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiItemDraft {
    pub name: String,
    pub description: String,
    pub quantity: u32,
    pub unit: String,
    pub price: f64,
    pub use_period: u32,
    pub reorder_level: u32,
}

impl TryFrom<FfiItemDraft> for ItemDraft {
    type Error = MedtrackError;

    fn try_from(draft: FfiItemDraft) -> Result<Self, Self::Error> {
        Ok(ItemDraft {
            name: draft.name,
            description: draft.description,
            quantity: draft.quantity,
            unit: draft.unit.parse().map_err(MedtrackError::InvalidInput)?,
            price: draft.price,
            use_period: draft.use_period,
            reorder_level: draft.reorder_level,
        })
    }
}

/// FFI-safe mutation outcome.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNotice {
    pub title: String,
    pub message: String,
    pub is_error: bool,
}

impl From<Notice> for FfiNotice {
    fn from(notice: Notice) -> Self {
        Self {
            is_error: notice.is_error(),
            title: notice.title,
            message: notice.message,
        }
    }
}

/// FFI-safe dashboard.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDashboard {
    pub total: u32,
    pub low_stock_count: u32,
    pub low_stock_percent: f64,
    pub expiring_soon_count: u32,
    pub expiring_percent: f64,
    pub recent_activity: Vec<FfiActivity>,
    pub expiring: Vec<FfiExpiringDrug>,
    pub low_stock: Vec<FfiLowStockDrug>,
    /// Set when the latest load failed
    pub error: Option<String>,
}

impl From<Dashboard> for FfiDashboard {
    fn from(dashboard: Dashboard) -> Self {
        Self {
            total: dashboard.summary.total as u32,
            low_stock_count: dashboard.summary.low_stock_count as u32,
            low_stock_percent: dashboard.summary.low_stock_percent,
            expiring_soon_count: dashboard.summary.expiring_soon_count as u32,
            expiring_percent: dashboard.summary.expiring_percent,
            recent_activity: dashboard.recent_activity.into_iter().map(Into::into).collect(),
            expiring: dashboard.expiring.into_iter().map(Into::into).collect(),
            low_stock: dashboard.low_stock.into_iter().map(Into::into).collect(),
            error: None,
        }
    }
}

/// FFI-safe activity feed entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiActivity {
    pub description: String,
    pub time: String,
    pub kind: String,
}

impl From<Activity> for FfiActivity {
    fn from(activity: Activity) -> Self {
        Self {
            description: activity.description,
            time: activity.time,
            kind: activity.kind.to_string(),
        }
    }
}

/// FFI-safe expiring-soon row.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiExpiringDrug {
    pub name: String,
    pub expiry: String,
    pub days_left: i64,
}

impl From<dashboard::ExpiringDrug> for FfiExpiringDrug {
    fn from(drug: dashboard::ExpiringDrug) -> Self {
        Self {
            name: drug.name,
            expiry: drug.expiry,
            days_left: drug.days_left,
        }
    }
}

/// FFI-safe low-stock row.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLowStockDrug {
    pub name: String,
    pub threshold: u32,
    pub left: u32,
}

impl From<dashboard::LowStockDrug> for FfiLowStockDrug {
    fn from(drug: dashboard::LowStockDrug) -> Self {
        Self {
            name: drug.name,
            threshold: drug.threshold,
            left: drug.left,
        }
    }
}

/// FFI-safe sales chart point.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSalesPoint {
    pub date: String,
    pub sales: f64,
}

impl From<models::SalesPoint> for FfiSalesPoint {
    fn from(point: models::SalesPoint) -> Self {
        Self {
            date: point.date,
            sales: point.sales,
        }
    }
}

/// FFI-safe top-selling bar.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTopSeller {
    pub name: String,
    pub sold: u64,
    pub revenue: Option<f64>,
}

impl From<models::TopSeller> for FfiTopSeller {
    fn from(seller: models::TopSeller) -> Self {
        Self {
            name: seller.name,
            sold: seller.sold,
            revenue: seller.revenue,
        }
    }
}

/// FFI-safe alert digest.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAlertDigest {
    pub subject: String,
    pub body: String,
}

impl From<AlertDigest> for FfiAlertDigest {
    fn from(digest: AlertDigest) -> Self {
        Self {
            body: digest.body(),
            subject: digest.subject,
        }
    }
}

/// FFI-safe user.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiUser {
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

impl From<User> for FfiUser {
    fn from(user: User) -> Self {
        Self {
            name: user.display_name().to_string(),
            email: user.email,
            picture: user.picture,
        }
    }
}
