//! In-memory store implementation

use focusward_api::PolicyKey;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use crate::traits::notify;
use crate::{PolicyChange, PolicyStore, StoreError, StoreResult, CHANGE_CHANNEL_CAPACITY};

/// Volatile store, used by tests and when no data directory is available
pub struct MemoryStore {
    values: Mutex<HashMap<PolicyKey, Value>>,
    changes: broadcast::Sender<PolicyChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            values: Mutex::new(HashMap::new()),
            changes,
        }
    }

    /// Create a store pre-populated with values, without emitting notifications
    pub fn with_values(values: impl IntoIterator<Item = (PolicyKey, Value)>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.values.lock() {
            map.extend(values);
        }
        store
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyStore for MemoryStore {
    fn get(&self, key: PolicyKey) -> StoreResult<Option<Value>> {
        let values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(values.get(&key).cloned())
    }

    fn set(&self, key: PolicyKey, value: Value) -> StoreResult<bool> {
        {
            let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
            if values.get(&key) == Some(&value) {
                return Ok(false);
            }
            values.insert(key, value.clone());
        }

        debug!(key = %key, value = %value, "Policy value changed");
        notify(&self.changes, key, value);
        Ok(true)
    }

    fn remove(&self, key: PolicyKey) -> StoreResult<bool> {
        let removed = {
            let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
            values.remove(&key).is_some()
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
        self.values.lock().is_ok()
    }
}
