//! Validated configuration structures

use focusward_api::{GuardKind, GuardPages};
use focusward_util::{default_data_dir, SiteKey};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::schema::{RawConfig, RawDefaults, RawServiceConfig};
use crate::sites::SiteRuleSet;
use crate::validation::parse_time_of_day;

/// Default sleep window start: 23:00
pub const DEFAULT_SLEEP_START_SECONDS: u32 = 23 * 3600;

/// Default sleep window end: 07:00
pub const DEFAULT_SLEEP_END_SECONDS: u32 = 7 * 3600;

/// Default unlock duration: 5 minutes
pub const DEFAULT_UNLOCK_DURATION_MS: u64 = 5 * 60 * 1000;

/// Validated configuration ready for use by the daemon
#[derive(Debug, Clone)]
pub struct FocusConfig {
    pub service: ServiceConfig,
    pub defaults: PolicyDefaults,
    pub sites: SiteRuleSet,
}

impl FocusConfig {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig, sites: SiteRuleSet) -> Self {
        Self {
            service: ServiceConfig::from_raw(raw.service),
            defaults: PolicyDefaults::from_raw(raw.defaults),
            sites,
        }
    }
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            defaults: PolicyDefaults::default(),
            sites: SiteRuleSet::builtin(),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    pub reconcile_interval: Duration,
    pub tamper_interval: Duration,
    pub request_timeout: Duration,
    pub tamper_reports_per_second: u32,
    pub guard_pages: GuardPages,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        let defaults = Self::default();

        let guard_pages = match (&raw.focus_guard_url, &raw.sleep_guard_url) {
            (None, None) => defaults.guard_pages.clone(),
            (focus, sleep) => {
                let focus = focus
                    .clone()
                    .unwrap_or_else(|| defaults.guard_pages.page(GuardKind::Focus).to_string());
                let sleep = sleep
                    .clone()
                    .unwrap_or_else(|| defaults.guard_pages.page(GuardKind::Sleep).to_string());
                // Validated before conversion
                GuardPages::new(&focus, &sleep).unwrap_or_else(|_| defaults.guard_pages.clone())
            }
        };

        Self {
            data_dir: raw.data_dir.unwrap_or(defaults.data_dir),
            reconcile_interval: raw
                .reconcile_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.reconcile_interval),
            tamper_interval: raw
                .tamper_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.tamper_interval),
            request_timeout: raw
                .request_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
            tamper_reports_per_second: raw
                .tamper_reports_per_second
                .unwrap_or(defaults.tamper_reports_per_second),
            guard_pages,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            reconcile_interval: Duration::from_secs(1),
            tamper_interval: Duration::from_secs(3),
            request_timeout: Duration::from_secs(1),
            tamper_reports_per_second: 5,
            guard_pages: GuardPages::default(),
        }
    }
}

/// Values used for policy keys that are absent from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDefaults {
    pub sleep_start_seconds: u32,
    pub sleep_end_seconds: u32,
    pub sleep_enabled: bool,
    pub unlock_duration_ms: u64,
    pub unlock_enabled: bool,
    /// Sites enforced when `blockedFlags` is absent
    pub blocked: BTreeSet<SiteKey>,
}

impl PolicyDefaults {
    fn from_raw(raw: RawDefaults) -> Self {
        let defaults = Self::default();

        Self {
            sleep_start_seconds: raw
                .sleep_start
                .as_deref()
                .and_then(|s| parse_time_of_day(s).ok())
                .unwrap_or(defaults.sleep_start_seconds),
            sleep_end_seconds: raw
                .sleep_end
                .as_deref()
                .and_then(|s| parse_time_of_day(s).ok())
                .unwrap_or(defaults.sleep_end_seconds),
            sleep_enabled: raw.sleep_enabled.unwrap_or(defaults.sleep_enabled),
            unlock_duration_ms: raw
                .unlock_duration_seconds
                .map(|s| s.saturating_mul(1000))
                .unwrap_or(defaults.unlock_duration_ms),
            unlock_enabled: raw.unlock_enabled.unwrap_or(defaults.unlock_enabled),
            blocked: raw.blocked.into_iter().map(SiteKey::from).collect(),
        }
    }
}

impl Default for PolicyDefaults {
    fn default() -> Self {
        Self {
            sleep_start_seconds: DEFAULT_SLEEP_START_SECONDS,
            sleep_end_seconds: DEFAULT_SLEEP_END_SECONDS,
            sleep_enabled: true,
            unlock_duration_ms: DEFAULT_UNLOCK_DURATION_MS,
            unlock_enabled: true,
            blocked: BTreeSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_defaults() {
        let defaults = PolicyDefaults::default();
        assert_eq!(defaults.sleep_start_seconds, 82_800);
        assert_eq!(defaults.sleep_end_seconds, 25_200);
        assert_eq!(defaults.unlock_duration_ms, 300_000);
        assert!(defaults.sleep_enabled);
        assert!(defaults.unlock_enabled);

        let service = ServiceConfig::default();
        assert_eq!(service.reconcile_interval, Duration::from_secs(1));
        assert_eq!(service.tamper_interval, Duration::from_secs(3));
    }

    #[test]
    fn raw_overrides_apply() {
        let raw = RawDefaults {
            sleep_start: Some("21:15".into()),
            unlock_duration_seconds: Some(60),
            unlock_enabled: Some(false),
            blocked: vec!["reddit".into()],
            ..Default::default()
        };

        let defaults = PolicyDefaults::from_raw(raw);
        assert_eq!(defaults.sleep_start_seconds, 21 * 3600 + 15 * 60);
        assert_eq!(defaults.sleep_end_seconds, DEFAULT_SLEEP_END_SECONDS);
        assert_eq!(defaults.unlock_duration_ms, 60_000);
        assert!(!defaults.unlock_enabled);
        assert!(defaults.blocked.contains(&SiteKey::new("reddit")));
    }

    #[test]
    fn single_guard_override_keeps_other_default() {
        let raw = RawServiceConfig {
            sleep_guard_url: Some("chrome-extension://abc/night.html".into()),
            ..Default::default()
        };

        let service = ServiceConfig::from_raw(raw);
        assert_eq!(
            service.guard_pages.page(GuardKind::Sleep).as_str(),
            "chrome-extension://abc/night.html"
        );
        assert_eq!(
            service.guard_pages.page(GuardKind::Focus).as_str(),
            focusward_api::DEFAULT_FOCUS_GUARD_URL
        );
    }
}
