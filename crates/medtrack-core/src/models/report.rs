//! Sales reporting models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the sales-over-time chart aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalesMetric {
    #[default]
    Quantity,
    Revenue,
}

impl SalesMetric {
    /// Value of the `by` query parameter.
    pub fn as_query(&self) -> &'static str {
        match self {
            SalesMetric::Quantity => "quantity",
            SalesMetric::Revenue => "revenue",
        }
    }
}

impl fmt::Display for SalesMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

impl FromStr for SalesMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "quantity" => Ok(SalesMetric::Quantity),
            "revenue" => Ok(SalesMetric::Revenue),
            other => Err(format!("unknown sales metric '{}'", other)),
        }
    }
}

/// One day on the sales-over-time chart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SalesPoint {
    /// `YYYY-MM-DD`
    pub date: String,
    pub sales: f64,
}

/// One bar on the top-selling chart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopSeller {
    pub name: String,
    pub sold: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue: Option<f64>,
}

/// A completed sale in the local sales ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaleRecord {
    pub item_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
    #[serde(with = "super::timestamp")]
    pub sold_at: DateTime<Utc>,
}

impl SaleRecord {
    pub fn revenue(&self) -> f64 {
        f64::from(self.quantity) * self.unit_price
    }
}
