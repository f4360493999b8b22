//! Derived inventory metrics.
//!
//! Pure functions of an item list and a reference instant, recomputed on
//! every refresh.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{InventoryItem, EXPIRY_WINDOW_DAYS};

/// Which items count as expiring soon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryPolicy {
    /// Expiry strictly after now and within the window.
    #[default]
    FutureWindow,
    /// Anything expiring on or before the end of the window, expired items
    /// included with zero days left.
    IncludeExpired,
}

impl ExpiryPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpiryPolicy::FutureWindow => "future_window",
            ExpiryPolicy::IncludeExpired => "include_expired",
        }
    }

    /// Days left to show for an item, or `None` when it is not expiring soon.
    pub fn days_left(&self, item: &InventoryItem, now: DateTime<Utc>) -> Option<i64> {
        let days = item.days_until_expiry(now);
        match self {
            ExpiryPolicy::FutureWindow => item.is_expiring_soon(now).then_some(days),
            ExpiryPolicy::IncludeExpired => (days <= EXPIRY_WINDOW_DAYS).then(|| days.max(0)),
        }
    }
}

impl fmt::Display for ExpiryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpiryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "future_window" => Ok(ExpiryPolicy::FutureWindow),
            "include_expired" => Ok(ExpiryPolicy::IncludeExpired),
            other => Err(format!("unknown expiry policy '{}'", other)),
        }
    }
}

/// Row of the expiring-soon card.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpiringDrug {
    pub name: String,
    /// `YYYY-MM-DD`
    pub expiry: String,
    pub days_left: i64,
}

/// Row of the low-stock card.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LowStockDrug {
    pub name: String,
    pub threshold: u32,
    pub left: u32,
}

/// Everything the dashboard derives from the inventory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InventoryMetrics {
    pub total: usize,
    pub low_stock_count: usize,
    pub expiring_soon_count: usize,
    /// Soonest expiry first
    pub expiring: Vec<ExpiringDrug>,
    /// Fewest units first
    pub low_stock: Vec<LowStockDrug>,
}

impl InventoryMetrics {
    pub fn low_stock_percent(&self) -> f64 {
        percent(self.low_stock_count, self.total)
    }

    pub fn expiring_percent(&self) -> f64 {
        percent(self.expiring_soon_count, self.total)
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Derive dashboard metrics from an inventory snapshot.
pub fn derive_metrics(
    items: &[InventoryItem],
    now: DateTime<Utc>,
    policy: ExpiryPolicy,
) -> InventoryMetrics {
    let mut expiring: Vec<ExpiringDrug> = items
        .iter()
        .filter_map(|item| {
            policy.days_left(item, now).map(|days_left| ExpiringDrug {
                name: item.name.clone(),
                expiry: item.expiry_date().format("%Y-%m-%d").to_string(),
                days_left,
            })
        })
        .collect();
    expiring.sort_by_key(|drug| drug.days_left);

    let mut low_stock: Vec<LowStockDrug> = items
        .iter()
        .filter(|item| item.is_low_stock())
        .map(|item| LowStockDrug {
            name: item.name.clone(),
            threshold: item.reorder_level,
            left: item.quantity,
        })
        .collect();
    low_stock.sort_by_key(|drug| drug.left);

    InventoryMetrics {
        total: items.len(),
        low_stock_count: low_stock.len(),
        expiring_soon_count: expiring.len(),
        expiring,
        low_stock,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Unit;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap()
    }

    fn item(name: &str, quantity: u32, reorder_level: u32, expires_in_days: i64) -> InventoryItem {
        let created_at = now() + Duration::days(expires_in_days) - Duration::days(100);
        InventoryItem {
            id: name.to_lowercase(),
            name: name.into(),
            description: String::new(),
            quantity,
            unit: Unit::Tablets,
            price: 1.0,
            use_period: 100,
            reorder_level,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_empty_inventory() {
        let metrics = derive_metrics(&[], now(), ExpiryPolicy::default());
        assert_eq!(metrics.total, 0);
        assert_eq!(metrics.low_stock_percent(), 0.0);
        assert_eq!(metrics.expiring_percent(), 0.0);
    }

    #[test]
    fn test_counts_and_sorting() {
        let items = vec![
            item("A", 50, 10, 20),
            item("B", 5, 10, 3),
            item("C", 0, 10, 200),
            item("D", 10, 10, -2),
        ];
        let metrics = derive_metrics(&items, now(), ExpiryPolicy::FutureWindow);

        assert_eq!(metrics.total, 4);
        let expiring: Vec<_> = metrics.expiring.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(expiring, vec!["B", "A"]);
        assert_eq!(metrics.expiring[0].days_left, 3);
        assert_eq!(metrics.expiring[0].expiry, "2024-01-11");

        let low: Vec<_> = metrics.low_stock.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(low, vec!["C", "B", "D"]);
        assert_eq!(metrics.low_stock_percent(), 75.0);
        assert_eq!(metrics.expiring_percent(), 50.0);
    }

    #[test]
    fn test_include_expired_policy() {
        let items = vec![item("Old", 50, 10, -5), item("Soon", 50, 10, 7)];
        let metrics = derive_metrics(&items, now(), ExpiryPolicy::IncludeExpired);

        assert_eq!(metrics.expiring_soon_count, 2);
        assert_eq!(metrics.expiring[0].name, "Old");
        assert_eq!(metrics.expiring[0].days_left, 0);
    }

    #[test]
    fn test_sort_is_stable() {
        let items = vec![item("First", 1, 5, 4), item("Second", 1, 5, 4)];
        let metrics = derive_metrics(&items, now(), ExpiryPolicy::FutureWindow);
        assert_eq!(metrics.expiring[0].name, "First");
        assert_eq!(metrics.low_stock[0].name, "First");
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "include-expired".parse::<ExpiryPolicy>().unwrap(),
            ExpiryPolicy::IncludeExpired
        );
        assert!("whenever".parse::<ExpiryPolicy>().is_err());
    }

    proptest! {
        #[test]
        fn prop_membership_matches_predicates(
            specs in prop::collection::vec((0u32..50, 0u32..50, -60i64..90), 0..20)
        ) {
            let items: Vec<InventoryItem> = specs
                .iter()
                .enumerate()
                .map(|(i, (q, r, d))| item(&format!("Drug {}", i), *q, *r, *d))
                .collect();
            let metrics = derive_metrics(&items, now(), ExpiryPolicy::FutureWindow);

            let low = items.iter().filter(|i| i.quantity <= i.reorder_level).count();
            prop_assert_eq!(metrics.low_stock_count, low);

            let expiring = items
                .iter()
                .filter(|i| {
                    let days = i.days_until_expiry(now());
                    days > 0 && days <= 30
                })
                .count();
            prop_assert_eq!(metrics.expiring_soon_count, expiring);

            prop_assert!(metrics.expiring.windows(2).all(|w| w[0].days_left <= w[1].days_left));
            prop_assert!(metrics.low_stock.windows(2).all(|w| w[0].left <= w[1].left));
            prop_assert!(metrics.low_stock_percent() <= 100.0);
        }
    }
}
