//! Typed access to policy values

use focusward_api::{BlockedFlags, PolicyKey};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::{PolicyStore, StoreResult};

/// Typed helpers available on every [`PolicyStore`].
///
/// Reads never fail: a store error, a missing key, or a value of the
/// wrong shape all come back as `None`, so callers fall back to defaults.
pub trait PolicyStoreExt: PolicyStore {
    fn read<T: DeserializeOwned>(&self, key: PolicyKey) -> Option<T> {
        let value = match self.get(key) {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "Policy read failed, using default");
                return None;
            }
        };

        if value.is_null() {
            return None;
        }

        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(key = %key, error = %e, "Malformed policy value, using default");
                None
            }
        }
    }

    fn write<T: Serialize>(&self, key: PolicyKey, value: &T) -> StoreResult<bool> {
        self.set(key, serde_json::to_value(value)?)
    }

    fn read_bool(&self, key: PolicyKey) -> Option<bool> {
        self.read(key)
    }

    fn read_u64(&self, key: PolicyKey) -> Option<u64> {
        self.read(key)
    }

    fn read_blocked_flags(&self) -> Option<BlockedFlags> {
        self.read(PolicyKey::BlockedFlags)
    }
}

impl<S: PolicyStore + ?Sized> PolicyStoreExt for S {}
