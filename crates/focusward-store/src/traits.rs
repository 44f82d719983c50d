//! Store trait definitions

use focusward_api::PolicyKey;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::StoreResult;

/// Capacity of the change notification channel
pub const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Notification that a policy key now holds a different value
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyChange {
    pub key: PolicyKey,
    pub value: Value,
}

/// Shared policy state.
///
/// Every key is optional; readers substitute documented defaults for
/// absent keys. Writers may race freely: `set` is an idempotent
/// re-application, and only real changes are broadcast.
pub trait PolicyStore: Send + Sync {
    /// Read the raw value of a key
    fn get(&self, key: PolicyKey) -> StoreResult<Option<Value>>;

    /// Write a key. Returns `true` if the stored value changed.
    fn set(&self, key: PolicyKey, value: Value) -> StoreResult<bool>;

    /// Remove a key so readers fall back to the default
    fn remove(&self, key: PolicyKey) -> StoreResult<bool>;

    /// Subscribe to value changes
    fn subscribe(&self) -> broadcast::Receiver<PolicyChange>;

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}

/// Send a change to any subscribers; no subscribers is fine
pub(crate) fn notify(tx: &broadcast::Sender<PolicyChange>, key: PolicyKey, value: Value) {
    let _ = tx.send(PolicyChange { key, value });
}
