//! Daily digest of expiring and low-stock drugs.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::dashboard::{derive_metrics, ExpiryPolicy};
use crate::db::{Database, DbResult, NOTIFIED_KEY};
use crate::models::{InventoryItem, EXPIRY_WINDOW_DAYS};

pub const ALERT_SUBJECT: &str = "MedTrack Alert: Expiring or Low Stock Drugs";

/// Alert message body sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDigest {
    pub subject: String,
    pub expiring: Vec<String>,
    pub low_stock: Vec<String>,
}

impl AlertDigest {
    /// Digest for the inventory as of `now`, or `None` when nothing needs
    /// attention.
    ///
    /// Days left are whole elapsed days, so an item with less than one full
    /// day remaining is not listed.
    pub fn build(items: &[InventoryItem], now: DateTime<Utc>) -> Option<Self> {
        let mut expiring: Vec<(i64, &InventoryItem)> = items
            .iter()
            .map(|item| (item.whole_days_until_expiry(now), item))
            .filter(|(days, _)| *days > 0 && *days <= EXPIRY_WINDOW_DAYS)
            .collect();
        expiring.sort_by_key(|(days, _)| *days);

        let metrics = derive_metrics(items, now, ExpiryPolicy::FutureWindow);
        if expiring.is_empty() && metrics.low_stock.is_empty() {
            return None;
        }

        Some(Self {
            subject: ALERT_SUBJECT.to_string(),
            expiring: expiring
                .iter()
                .map(|(days, item)| format!("{} (expires in {} days)", item.name, days))
                .collect(),
            low_stock: metrics
                .low_stock
                .iter()
                .map(|drug| format!("{} (only {} left)", drug.name, drug.left))
                .collect(),
        })
    }

    /// Plain-text message body.
    pub fn body(&self) -> String {
        let mut sections = Vec::new();
        if !self.expiring.is_empty() {
            sections.push(format!("Expiring soon:\n{}", self.expiring.join("\n")));
        }
        if !self.low_stock.is_empty() {
            sections.push(format!("Low stock:\n{}", self.low_stock.join("\n")));
        }
        sections.join("\n\n")
    }
}

/// Last day each recipient was sent a digest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationLog {
    last_notified: BTreeMap<String, NaiveDate>,
}

impl NotificationLog {
    pub fn load(db: &Database) -> DbResult<Self> {
        let last_notified = db.read_state(NOTIFIED_KEY)?.unwrap_or_default();
        Ok(Self { last_notified })
    }

    pub fn save(&self, db: &Database) -> DbResult<()> {
        db.write_state(NOTIFIED_KEY, &self.last_notified)
    }

    /// At most one digest per recipient per calendar day.
    pub fn is_due(&self, email: &str, today: NaiveDate) -> bool {
        self.last_notified.get(email) != Some(&today)
    }

    pub fn record(&mut self, email: &str, today: NaiveDate) {
        self.last_notified.insert(email.to_string(), today);
    }

    /// Recipients from `emails` still due today, each once.
    pub fn due<'a>(&self, emails: &'a [String], today: NaiveDate) -> Vec<&'a str> {
        let mut seen = BTreeSet::new();
        emails
            .iter()
            .map(|email| email.trim())
            .filter(|email| !email.is_empty() && self.is_due(email, today))
            .filter(|email| seen.insert(*email))
            .collect()
    }
}
