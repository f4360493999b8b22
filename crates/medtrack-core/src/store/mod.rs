//! Inventory stores.
//!
//! Two interchangeable implementations of the same contract:
//! - `HttpStore` talks to the inventory REST API
//! - `LocalStore` persists into a local SQLite state file

mod http;
mod local;

pub use http::*;
pub use local::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::DbError;
use crate::models::{
    InventoryItem, ItemDraft, RawActivity, SalesMetric, SalesPoint, StockAction, TopSeller,
};

/// Store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Request rejected with status {status}{}", detail_suffix(.detail))]
    Rejected { status: u16, detail: Option<String> },

    #[error("Invalid input: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Local storage error: {0}")]
    Database(DbError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|detail| format!(": {}", detail))
        .unwrap_or_default()
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(_) => StoreError::Rejected {
                status: 404,
                detail: Some("Item not found".to_string()),
            },
            DbError::Constraint(detail) => StoreError::Rejected {
                status: 400,
                detail: Some(detail),
            },
            other => StoreError::Database(other),
        }
    }
}

impl StoreError {
    /// Text for a notice: the store's own detail when it sent one.
    pub fn user_message(&self) -> String {
        match self {
            StoreError::Transport(_) => "Could not reach the inventory service".to_string(),
            StoreError::Rejected {
                detail: Some(detail),
                ..
            } => detail.clone(),
            StoreError::Rejected { status, .. } => {
                format!("Request failed with status {}", status)
            }
            StoreError::Validation(problems) => {
                format!("Please check the form: {}", problems.join(", "))
            }
            StoreError::Decode(_) => "Unexpected response from the inventory service".to_string(),
            StoreError::Database(_) => "Local storage is unavailable".to_string(),
            StoreError::InvalidConfig(message) => message.clone(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome shown to the user after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
}

/// Toast-style notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

impl Notice {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity: Severity::Success,
        }
    }

    pub fn error(title: impl Into<String>, err: &StoreError) -> Self {
        Self {
            title: title.into(),
            message: err.user_message(),
            severity: Severity::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Persistence contract shared by the remote and local stores.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn list_items(&self) -> StoreResult<Vec<InventoryItem>>;

    /// Activity records, newest first.
    async fn list_activities(&self) -> StoreResult<Vec<RawActivity>>;

    async fn create_item(&self, draft: &ItemDraft) -> StoreResult<()>;

    async fn update_item(&self, id: &str, draft: &ItemDraft) -> StoreResult<()>;

    async fn delete_item(&self, id: &str) -> StoreResult<()>;

    async fn sell(&self, id: &str, quantity: u32) -> StoreResult<()>;

    async fn restock(&self, id: &str, quantity: u32) -> StoreResult<()>;

    async fn sales_over_time(&self, metric: SalesMetric) -> StoreResult<Vec<SalesPoint>>;

    async fn top_selling(&self) -> StoreResult<Vec<TopSeller>>;

    /// Dispatch a sell or restock.
    async fn adjust_stock(&self, id: &str, action: StockAction, quantity: u32) -> StoreResult<()> {
        match action {
            StockAction::Sell => self.sell(id, quantity).await,
            StockAction::Restock => self.restock(id, quantity).await,
        }
    }
}
