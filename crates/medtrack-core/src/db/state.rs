//! Keyed JSON document operations.

use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Database, DbResult};

impl Database {
    /// Read and deserialize the document stored under `key`.
    pub fn read_state<T: DeserializeOwned>(&self, key: &str) -> DbResult<Option<T>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM local_state WHERE key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(Into::into)
    }

    /// Replace the document stored under `key`.
    pub fn write_state<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> DbResult<()> {
        let json = serde_json::to_string(value)?;
        self.conn.execute(
            r#"
            INSERT INTO local_state (key, value, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = datetime('now')
            "#,
            params![key, json],
        )?;
        tracing::debug!(key, bytes = json.len(), "local state rewritten");
        Ok(())
    }

    /// Remove the document stored under `key`.
    pub fn clear_state(&self, key: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM local_state WHERE key = ?", [key])?;
        Ok(rows_affected > 0)
    }
}
