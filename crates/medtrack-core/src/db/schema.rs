//! SQLite schema definition.

/// Serialized array of drug records.
pub const DRUGS_KEY: &str = "medtrack-drugs";
/// Serialized activity log, newest first.
pub const ACTIVITIES_KEY: &str = "medtrack-activities";
/// Serialized sales ledger, oldest first.
pub const SALES_KEY: &str = "medtrack-sales";
/// Serialized signed-in user.
pub const USER_KEY: &str = "medtrack-user";
/// Serialized map of email to the last day an alert digest went out.
pub const NOTIFIED_KEY: &str = "medtrack-notified";

/// Complete database schema for medtrack.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Local State (one JSON document per fixed key)
-- ============================================================================

CREATE TABLE IF NOT EXISTS local_state (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,                          -- JSON document
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_key_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute(
            "INSERT INTO local_state (key, value) VALUES (?, ?)",
            [DRUGS_KEY, "[]"],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO local_state (key, value) VALUES (?, ?)",
            [DRUGS_KEY, "[]"],
        );
        assert!(result.is_err());
    }
}
