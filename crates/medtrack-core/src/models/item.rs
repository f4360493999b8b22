//! Inventory item models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Items expiring within this many days are "expiring soon".
pub const EXPIRY_WINDOW_DAYS: i64 = 30;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Dispensing unit of a stocked drug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Tablets,
    Capsules,
    Bottles,
    Boxes,
    Rolls,
}

impl Unit {
    pub const ALL: [Unit; 5] = [
        Unit::Tablets,
        Unit::Capsules,
        Unit::Bottles,
        Unit::Boxes,
        Unit::Rolls,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Tablets => "tablets",
            Unit::Capsules => "capsules",
            Unit::Bottles => "bottles",
            Unit::Boxes => "boxes",
            Unit::Rolls => "rolls",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Unit::ALL
            .iter()
            .copied()
            .find(|unit| unit.as_str() == lower)
            .ok_or_else(|| {
                format!(
                    "unknown unit '{}' (expected one of tablets, capsules, bottles, boxes, rolls)",
                    s
                )
            })
    }
}

/// A stocked drug as held by the inventory store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    /// Opaque store identifier
    #[serde(alias = "_id")]
    pub id: String,
    /// Display name, unique case-insensitively within a store
    pub name: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Units currently in stock
    pub quantity: u32,
    /// Dispensing unit
    pub unit: Unit,
    /// Unit price
    pub price: f64,
    /// Shelf life in days, counted from `created_at`
    pub use_period: u32,
    /// At or below this quantity the item is low on stock
    pub reorder_level: u32,
    /// When the item was stocked
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
    /// Last modification
    #[serde(with = "super::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Stocking date plus the use period, saturating at the latest
    /// representable instant.
    pub fn expiry_date(&self) -> DateTime<Utc> {
        self.created_at
            .checked_add_signed(Duration::days(i64::from(self.use_period)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whole days until expiry, rounded up. Zero or negative once expired.
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        let millis = (self.expiry_date() - now).num_milliseconds();
        ceil_div(millis, MILLIS_PER_DAY)
    }

    /// Whole days until expiry, rounded down. A partial last day counts as
    /// zero.
    pub fn whole_days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        let millis = (self.expiry_date() - now).num_milliseconds();
        millis.div_euclid(MILLIS_PER_DAY)
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }

    /// Expires within the window, excluding items already expired.
    pub fn is_expiring_soon(&self, now: DateTime<Utc>) -> bool {
        let days = self.days_until_expiry(now);
        days > 0 && days <= EXPIRY_WINDOW_DAYS
    }
}

fn ceil_div(value: i64, divisor: i64) -> i64 {
    let quotient = value.div_euclid(divisor);
    if value.rem_euclid(divisor) == 0 {
        quotient
    } else {
        quotient + 1
    }
}

/// Stock movement initiated from the search dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockAction {
    Sell,
    Restock,
}

impl StockAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockAction::Sell => "sell",
            StockAction::Restock => "restock",
        }
    }
}

impl fmt::Display for StockAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Create/edit payload for an inventory item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemDraft {
    pub name: String,
    pub description: String,
    pub quantity: u32,
    pub unit: Unit,
    pub price: f64,
    pub use_period: u32,
    pub reorder_level: u32,
}

impl ItemDraft {
    /// Check the form fields before submission.
    ///
    /// Returns every problem found, not just the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();
        if self.name.trim().is_empty() {
            problems.push("name is required".to_string());
        }
        if self.description.trim().is_empty() {
            problems.push("description is required".to_string());
        }
        if !self.price.is_finite() || self.price < 0.0 {
            problems.push("price must be a non-negative number".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}

impl From<&InventoryItem> for ItemDraft {
    fn from(item: &InventoryItem) -> Self {
        Self {
            name: item.name.clone(),
            description: item.description.clone(),
            quantity: item.quantity,
            unit: item.unit,
            price: item.price,
            use_period: item.use_period,
            reorder_level: item.reorder_level,
        }
    }
}
