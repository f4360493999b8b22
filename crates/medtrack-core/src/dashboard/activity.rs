//! Activity log normalizer.
//!
//! Handles:
//! - Description fallback (details → description)
//! - Time fallback and display formatting (timestamp → created_at)
//! - Type canonicalization across both naming schemes

use crate::models::timestamp::parse_instant;
use crate::models::{Activity, ActivityKind, RawActivity};

/// Entries shown on the recent-activity card.
pub const RECENT_ACTIVITY_LIMIT: usize = 5;

/// Display format for activity times, e.g. `Jan 8, 2024, 10:30:00 AM`.
pub const ACTIVITY_TIME_FORMAT: &str = "%b %-d, %Y, %-I:%M:%S %p";

/// Normalizer for raw activity records.
pub struct ActivityNormalizer {
    /// `action` values, checked first, in order
    action_rules: Vec<(&'static str, ActivityKind)>,
    /// `activity_type` values, checked after every action rule
    type_rules: Vec<(&'static str, ActivityKind)>,
}

impl Default for ActivityNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityNormalizer {
    pub fn new() -> Self {
        Self {
            action_rules: vec![
                ("created", ActivityKind::Add),
                ("deleted", ActivityKind::Remove),
                ("updated", ActivityKind::Update),
                ("sold", ActivityKind::Sold),
                ("restocked", ActivityKind::Restocked),
            ],
            type_rules: vec![
                ("add", ActivityKind::Add),
                ("remove", ActivityKind::Remove),
                ("update", ActivityKind::Update),
            ],
        }
    }

    /// Normalize one record.
    pub fn normalize(&self, raw: &RawActivity) -> Activity {
        Activity {
            description: first_non_empty(&[&raw.details, &raw.description])
                .unwrap_or_default()
                .to_string(),
            time: first_non_empty(&[&raw.timestamp, &raw.created_at])
                .map(format_time)
                .unwrap_or_default(),
            kind: self.classify(raw),
        }
    }

    /// Canonical type of a record. Unknown or missing values become `update`.
    pub fn classify(&self, raw: &RawActivity) -> ActivityKind {
        let lookup = |rules: &[(&str, ActivityKind)], value: &Option<String>| {
            value.as_deref().and_then(|value| {
                rules
                    .iter()
                    .find(|(label, _)| *label == value)
                    .map(|(_, kind)| *kind)
            })
        };

        lookup(&self.action_rules, &raw.action)
            .or_else(|| lookup(&self.type_rules, &raw.activity_type))
            .unwrap_or(ActivityKind::Update)
    }

    /// Normalize in order, then keep the first `limit`.
    pub fn normalize_all(&self, raw: &[RawActivity], limit: usize) -> Vec<Activity> {
        raw.iter().map(|r| self.normalize(r)).take(limit).collect()
    }
}

/// Normalize the newest activity records for the recent-activity card.
pub fn normalize_activities(raw: &[RawActivity]) -> Vec<Activity> {
    ActivityNormalizer::new().normalize_all(raw, RECENT_ACTIVITY_LIMIT)
}

fn first_non_empty<'a>(fields: &[&'a Option<String>]) -> Option<&'a str> {
    fields
        .iter()
        .filter_map(|field| field.as_deref())
        .find(|value| !value.trim().is_empty())
}

/// Format a wire timestamp for display. Unparseable values pass through.
pub fn format_time(raw: &str) -> String {
    match parse_instant(raw) {
        Some(instant) => instant.format(ACTIVITY_TIME_FORMAT).to_string(),
        None => raw.to_string(),
    }
}
