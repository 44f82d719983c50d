//! Read snapshot of the policy store

use focusward_api::{BlockedFlags, PolicyKey};
use focusward_config::PolicyDefaults;
use focusward_store::{PolicyStore, PolicyStoreExt};
use focusward_util::{EpochMillis, SECONDS_PER_DAY};
use serde_json::Value;

use crate::{is_in_window, TimeWindow, UnlockState};

/// Everything a decision needs from the store, read once.
///
/// Missing or malformed keys take their configured defaults; a snapshot
/// can always be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySnapshot {
    pub blocked: BlockedFlags,
    pub unlock: UnlockState,
    pub sleep_enabled: bool,
    pub sleep_window: TimeWindow,
    /// The store holds a nonzero unlock although the feature is off
    pub stale_unlock: bool,
}

impl PolicySnapshot {
    pub fn load(store: &dyn PolicyStore, defaults: &PolicyDefaults) -> Self {
        let blocked = store.read_blocked_flags().unwrap_or_else(|| {
            defaults
                .blocked
                .iter()
                .map(|site| (site.clone(), true))
                .collect()
        });

        let unlock_enabled = store
            .read_bool(PolicyKey::UnlockDurationEnabled)
            .unwrap_or(defaults.unlock_enabled);
        let unlock_until = store.read_u64(PolicyKey::UnlockUntilEpochMs).unwrap_or(0);
        let unlock_duration = store
            .read_u64(PolicyKey::UnlockDurationMs)
            .filter(|d| *d > 0)
            .unwrap_or(defaults.unlock_duration_ms);

        let sleep_start = read_second_of_day(store, PolicyKey::SleepStartSeconds)
            .unwrap_or(defaults.sleep_start_seconds);
        let sleep_end = read_second_of_day(store, PolicyKey::SleepEndSeconds)
            .unwrap_or(defaults.sleep_end_seconds);
        let sleep_enabled = store
            .read_bool(PolicyKey::EepyTimeEnabled)
            .unwrap_or(defaults.sleep_enabled);

        Self {
            blocked,
            unlock: UnlockState::new(unlock_until, unlock_duration, unlock_enabled),
            sleep_enabled,
            sleep_window: TimeWindow::new(sleep_start, sleep_end),
            stale_unlock: !unlock_enabled && unlock_until != 0,
        }
    }

    /// Sleep enforcement is on and `now_ms` is inside the window
    pub fn sleep_active(&self, now_ms: EpochMillis) -> bool {
        self.sleep_enabled && is_in_window(now_ms, &self.sleep_window)
    }
}

fn read_second_of_day(store: &dyn PolicyStore, key: PolicyKey) -> Option<u32> {
    store.read::<u32>(key).filter(|s| *s < SECONDS_PER_DAY)
}

/// Check that `value` has the shape `key` requires.
///
/// `null` is always accepted and resets the key to its default.
pub fn validate_policy_value(key: PolicyKey, value: &Value) -> Result<(), String> {
    if value.is_null() {
        return Ok(());
    }

    match key {
        PolicyKey::BlockedFlags => serde_json::from_value::<BlockedFlags>(value.clone())
            .map(|_| ())
            .map_err(|e| format!("expected a map of site to bool: {}", e)),
        PolicyKey::UnlockDurationEnabled | PolicyKey::EepyTimeEnabled => value
            .as_bool()
            .map(|_| ())
            .ok_or_else(|| "expected a bool".to_string()),
        PolicyKey::UnlockUntilEpochMs => value
            .as_u64()
            .map(|_| ())
            .ok_or_else(|| "expected a non-negative integer".to_string()),
        PolicyKey::UnlockDurationMs => match value.as_u64() {
            Some(d) if d > 0 => Ok(()),
            _ => Err("expected a positive integer".to_string()),
        },
        PolicyKey::SleepStartSeconds | PolicyKey::SleepEndSeconds => match value.as_u64() {
            Some(s) if s < u64::from(SECONDS_PER_DAY) => Ok(()),
            _ => Err(format!("expected seconds in 0..{}", SECONDS_PER_DAY)),
        },
    }
}
