//! Dashboard presenter.
//!
//! Pipeline: Snapshot → Metrics Derivation + Activity Normalization → Cards

mod activity;
mod metrics;

pub use activity::*;
pub use metrics::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::controller::Snapshot;
use crate::models::Activity;

/// Headline counts for the stock summary card.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockSummary {
    pub total: usize,
    pub low_stock_count: usize,
    pub low_stock_percent: f64,
    pub expiring_soon_count: usize,
    pub expiring_percent: f64,
}

impl From<&InventoryMetrics> for StockSummary {
    fn from(metrics: &InventoryMetrics) -> Self {
        Self {
            total: metrics.total,
            low_stock_count: metrics.low_stock_count,
            low_stock_percent: metrics.low_stock_percent(),
            expiring_soon_count: metrics.expiring_soon_count,
            expiring_percent: metrics.expiring_percent(),
        }
    }
}

/// The four dashboard cards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dashboard {
    pub summary: StockSummary,
    pub recent_activity: Vec<Activity>,
    pub expiring: Vec<ExpiringDrug>,
    pub low_stock: Vec<LowStockDrug>,
}

impl Dashboard {
    /// Build the cards for a snapshot as of `now`.
    pub fn compose(snapshot: &Snapshot, now: DateTime<Utc>, policy: ExpiryPolicy) -> Self {
        let metrics = derive_metrics(&snapshot.items, now, policy);
        Self {
            summary: StockSummary::from(&metrics),
            recent_activity: normalize_activities(&snapshot.activities),
            expiring: metrics.expiring,
            low_stock: metrics.low_stock,
        }
    }
}
