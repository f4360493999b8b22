//! Sales report aggregation over the local sales ledger.

use std::collections::{BTreeMap, HashMap};

use crate::models::{SaleRecord, SalesMetric, SalesPoint, TopSeller};

/// Bars shown on the top-selling chart.
pub const TOP_SELLING_LIMIT: usize = 5;

/// Per-day totals, oldest day first.
pub fn sales_over_time(sales: &[SaleRecord], metric: SalesMetric) -> Vec<SalesPoint> {
    let mut by_day: BTreeMap<String, f64> = BTreeMap::new();
    for sale in sales {
        let day = sale.sold_at.format("%Y-%m-%d").to_string();
        let amount = match metric {
            SalesMetric::Quantity => f64::from(sale.quantity),
            SalesMetric::Revenue => sale.revenue(),
        };
        *by_day.entry(day).or_default() += amount;
    }

    by_day
        .into_iter()
        .map(|(date, sales)| SalesPoint { date, sales })
        .collect()
}

/// Highest revenue first, ties broken by name.
pub fn top_selling(sales: &[SaleRecord], limit: usize) -> Vec<TopSeller> {
    let mut by_item: HashMap<&str, TopSeller> = HashMap::new();
    for sale in sales {
        let entry = by_item.entry(sale.item_id.as_str()).or_insert_with(|| TopSeller {
            name: sale.name.clone(),
            sold: 0,
            revenue: Some(0.0),
        });
        entry.sold += u64::from(sale.quantity);
        entry.revenue = entry.revenue.map(|total| total + sale.revenue());
    }

    let mut sellers: Vec<TopSeller> = by_item.into_values().collect();
    sellers.sort_by(|a, b| {
        let revenue_a = a.revenue.unwrap_or_default();
        let revenue_b = b.revenue.unwrap_or_default();
        revenue_b
            .total_cmp(&revenue_a)
            .then_with(|| a.name.cmp(&b.name))
    });
    sellers.truncate(limit);
    sellers
}
