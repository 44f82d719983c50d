//! Time-boxed unlock state

use focusward_util::EpochMillis;

/// A temporary override of focus enforcement.
///
/// `until_ms == 0` means no unlock. While the feature is disabled the
/// override is always 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnlockState {
    until_ms: EpochMillis,
    duration_ms: u64,
    feature_enabled: bool,
}

impl UnlockState {
    pub fn new(until_ms: EpochMillis, duration_ms: u64, feature_enabled: bool) -> Self {
        Self {
            until_ms: if feature_enabled { until_ms } else { 0 },
            duration_ms,
            feature_enabled,
        }
    }

    /// Start an unlock at `now_ms`. Returns the new expiry (0 when the feature is off).
    pub fn grant(&mut self, now_ms: EpochMillis) -> EpochMillis {
        self.until_ms = if self.feature_enabled {
            now_ms.saturating_add(self.duration_ms)
        } else {
            0
        };
        self.until_ms
    }

    /// Half-open: active strictly before `until_ms`
    pub fn is_active(&self, now_ms: EpochMillis) -> bool {
        self.until_ms > now_ms
    }

    /// An unlock was granted and its time is up
    pub fn is_expired_at(&self, now_ms: EpochMillis) -> bool {
        self.feature_enabled && self.until_ms != 0 && now_ms >= self.until_ms
    }

    pub fn expire(&mut self) {
        self.until_ms = 0;
    }

    /// Toggle the feature. Returns `true` if an outstanding unlock was revoked.
    pub fn set_feature_enabled(&mut self, enabled: bool) -> bool {
        self.feature_enabled = enabled;
        if !enabled && self.until_ms != 0 {
            self.until_ms = 0;
            return true;
        }
        false
    }

    pub fn until_ms(&self) -> EpochMillis {
        self.until_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn feature_enabled(&self) -> bool {
        self.feature_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: EpochMillis = 1_700_000_000_000;
    const D: u64 = 300_000;

    #[test]
    fn grant_is_half_open() {
        let mut unlock = UnlockState::new(0, D, true);
        assert!(!unlock.is_active(T));

        assert_eq!(unlock.grant(T), T + D);
        assert!(unlock.is_active(T + D - 1));
        assert!(!unlock.is_active(T + D));
        assert!(!unlock.is_expired_at(T + D - 1));
        assert!(unlock.is_expired_at(T + D));
    }

    #[test]
    fn grant_while_disabled_clears() {
        let mut unlock = UnlockState::new(0, D, false);
        assert_eq!(unlock.grant(T), 0);
        assert!(!unlock.is_active(T));
        assert!(!unlock.is_expired_at(T + D));
    }

    #[test]
    fn disabled_feature_forces_zero() {
        let unlock = UnlockState::new(T + D, D, false);
        assert_eq!(unlock.until_ms(), 0);

        let mut unlock = UnlockState::new(T + D, D, true);
        assert!(unlock.set_feature_enabled(false));
        assert_eq!(unlock.until_ms(), 0);
        assert!(!unlock.set_feature_enabled(false));
    }

    #[test]
    fn expire_clears() {
        let mut unlock = UnlockState::new(0, D, true);
        unlock.grant(T);
        unlock.expire();
        assert_eq!(unlock.until_ms(), 0);
        assert!(!unlock.is_expired_at(T + D));
    }
}
