//! SQLite-based store implementation

use focusward_api::PolicyKey;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::traits::notify;
use crate::{PolicyChange, PolicyStore, StoreError, StoreResult, CHANGE_CHANNEL_CAPACITY};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
    changes: broadcast::Sender<PolicyChange>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let store = Self {
            conn: Mutex::new(conn),
            changes,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            -- Policy key/value pairs, values as JSON
            CREATE TABLE IF NOT EXISTS policy (
                key TEXT PRIMARY KEY,
                value_json TEXT NOT NULL
            );
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }

    fn read(conn: &Connection, key: PolicyKey) -> StoreResult<Option<Value>> {
        let json: Option<String> = conn
            .query_row(
                "SELECT value_json FROM policy WHERE key = ?",
                [key.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(s) => match serde_json::from_str(&s) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    // Unreadable rows behave like absent keys
                    warn!(key = %key, error = %e, "Discarding unparsable policy value");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }
}

impl PolicyStore for SqliteStore {
    fn get(&self, key: PolicyKey) -> StoreResult<Option<Value>> {
        let conn = self.lock()?;
        Self::read(&conn, key)
    }

    fn set(&self, key: PolicyKey, value: Value) -> StoreResult<bool> {
        {
            let conn = self.lock()?;
            if Self::read(&conn, key)?.as_ref() == Some(&value) {
                return Ok(false);
            }

            let json = serde_json::to_string(&value)?;
            conn.execute(
                r#"
                INSERT INTO policy (key, value_json)
                VALUES (?, ?)
                ON CONFLICT(key)
                DO UPDATE SET value_json = excluded.value_json
                "#,
                params![key.as_str(), json],
            )?;
        }

        debug!(key = %key, value = %value, "Policy value changed");
        notify(&self.changes, key, value);
        Ok(true)
    }

    fn remove(&self, key: PolicyKey) -> StoreResult<bool> {
        let removed = {
            let conn = self.lock()?;
            conn.execute("DELETE FROM policy WHERE key = ?", [key.as_str()])? > 0
        };

        if removed {
            debug!(key = %key, "Policy value removed");
            notify(&self.changes, key, Value::Null);
        }
        Ok(removed)
    }

    fn subscribe(&self) -> broadcast::Receiver<PolicyChange> {
        self.changes.subscribe()
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}
