//! Activity log models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An activity log entry as returned by a store.
///
/// Two naming schemes are in circulation: the backend writes `action`
/// (`created`, `updated`, `deleted`, `sold`, `restocked`) with `details` and
/// `timestamp`, while older records use `activity_type` (`add`, `update`,
/// `remove`) with `description` and `created_at`. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawActivity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl RawActivity {
    /// Entry in the backend's naming scheme.
    pub fn recorded(
        action: &str,
        item_id: &str,
        details: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            item_id: Some(item_id.to_string()),
            action: Some(action.to_string()),
            details: Some(details.into()),
            timestamp: Some(at.to_rfc3339()),
            ..Default::default()
        }
    }
}

/// Canonical activity type shown in the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Add,
    Remove,
    Update,
    Sold,
    Restocked,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Add => "add",
            ActivityKind::Remove => "remove",
            ActivityKind::Update => "update",
            ActivityKind::Sold => "sold",
            ActivityKind::Restocked => "restocked",
        }
    }

    /// Whether the event increased stock (shown green in the feed).
    pub fn is_inbound(&self) -> bool {
        matches!(self, ActivityKind::Add | ActivityKind::Restocked)
    }

    /// Whether the event decreased stock (shown red in the feed).
    pub fn is_outbound(&self) -> bool {
        matches!(self, ActivityKind::Remove | ActivityKind::Sold)
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized feed entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Activity {
    pub description: String,
    /// Display time, empty when the record carried none
    pub time: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
}
