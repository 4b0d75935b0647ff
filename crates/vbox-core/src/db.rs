// SQLite persistence layer for durable client-side state.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

/// Key under which the bearer token is stored.
pub const TOKEN_KEY: &str = "api_token";

/// Key under which the last observed quotation statuses are stored.
pub const QUOTE_STATUS_KEY: &str = "quote_status_cache";

/// SQLite-backed key/value store for application state that must survive
/// process restarts (the bearer token and the quotation status snapshot).
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure the state
    /// table exists. Pass `":memory:"` for an ephemeral in-memory database
    /// (useful for tests).
    pub fn open(path: &str) -> Result<Self> {
        if path != ":memory:" {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create database directory {}", parent.display())
                    })?;
                }
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS app_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// A poisoned mutex is recovered: the connection itself is still valid
    /// even if another thread panicked while holding the guard.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Store a JSON value under `key`, replacing any previous value.
    pub fn save_state(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.conn();
        let json_str =
            serde_json::to_string(value).context("failed to serialize state value")?;
        conn.execute(
            "INSERT OR REPLACE INTO app_state (key, value) VALUES (?1, ?2)",
            params![key, json_str],
        )
        .context("failed to save state")?;
        Ok(())
    }

    /// Load the JSON value stored under `key`, or `None` if absent.
    pub fn load_state(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn();
        let json_str: Option<String> = conn
            .query_row(
                "SELECT value FROM app_state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .context("failed to query app state")?;

        match json_str {
            Some(json_str) => {
                let value = serde_json::from_str(&json_str)
                    .context("failed to deserialize state value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Remove the value stored under `key`. Removing a missing key is not
    /// an error.
    pub fn delete_state(&self, key: &str) -> Result<()> {
        let conn = self.conn();
        conn.execute("DELETE FROM app_state WHERE key = ?1", params![key])
            .context("failed to delete state")?;
        Ok(())
    }

    /// Drop the state table so every subsequent read and write fails.
    #[cfg(test)]
    pub(crate) fn break_for_test(&self) {
        self.conn()
            .execute_batch("DROP TABLE app_state;")
            .expect("drop app_state");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_db() -> Database {
        Database::open(":memory:").expect("in-memory db should open")
    }

    #[test]
    fn open_creates_state_table() {
        let db = test_db();
        let conn = db.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert!(tables.contains(&"app_state".to_string()));
    }

    #[test]
    fn save_and_load_state_round_trip() {
        let db = test_db();
        let value = json!({"Q-1": "pending", "Q-2": "accepted"});
        db.save_state(QUOTE_STATUS_KEY, &value).unwrap();

        assert_eq!(db.load_state(QUOTE_STATUS_KEY).unwrap(), Some(value));
    }

    #[test]
    fn load_state_returns_none_for_missing_key() {
        let db = test_db();
        assert_eq!(db.load_state("nonexistent").unwrap(), None);
    }

    #[test]
    fn save_state_overwrites_previous_value() {
        let db = test_db();
        db.save_state(TOKEN_KEY, &json!("first")).unwrap();
        db.save_state(TOKEN_KEY, &json!("second")).unwrap();

        assert_eq!(db.load_state(TOKEN_KEY).unwrap(), Some(json!("second")));
    }

    #[test]
    fn delete_state_removes_key_and_is_idempotent() {
        let db = test_db();
        db.save_state(TOKEN_KEY, &json!("abc")).unwrap();

        db.delete_state(TOKEN_KEY).unwrap();
        assert_eq!(db.load_state(TOKEN_KEY).unwrap(), None);

        db.delete_state(TOKEN_KEY).unwrap();
    }

    #[test]
    fn keys_are_independent() {
        let db = test_db();
        db.save_state(TOKEN_KEY, &json!("abc")).unwrap();
        db.save_state(QUOTE_STATUS_KEY, &json!({})).unwrap();

        db.delete_state(TOKEN_KEY).unwrap();
        assert_eq!(db.load_state(QUOTE_STATUS_KEY).unwrap(), Some(json!({})));
    }

    #[test]
    fn state_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("state.db");
        let path = path.to_str().unwrap();

        {
            let db = Database::open(path).unwrap();
            db.save_state(TOKEN_KEY, &json!("persisted")).unwrap();
        }

        let db = Database::open(path).unwrap();
        assert_eq!(db.load_state(TOKEN_KEY).unwrap(), Some(json!("persisted")));
    }

    #[test]
    fn corrupt_value_is_an_error() {
        let db = test_db();
        db.conn()
            .execute(
                "INSERT INTO app_state (key, value) VALUES (?1, ?2)",
                params![QUOTE_STATUS_KEY, "{not json"],
            )
            .unwrap();

        assert!(db.load_state(QUOTE_STATUS_KEY).is_err());
    }

    #[test]
    fn broken_table_fails_reads_and_writes() {
        let db = test_db();
        db.break_for_test();

        assert!(db.load_state(TOKEN_KEY).is_err());
        assert!(db.save_state(TOKEN_KEY, &json!("x")).is_err());
        assert!(db.delete_state(TOKEN_KEY).is_err());
    }
}
