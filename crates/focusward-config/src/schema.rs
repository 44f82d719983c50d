//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Service-level settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Values assumed for policy keys the store doesn't hold yet
    #[serde(default)]
    pub defaults: RawDefaults,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Data directory for the policy store
    pub data_dir: Option<PathBuf>,

    /// Period of the reconciliation sweep
    pub reconcile_interval_ms: Option<u64>,

    /// Period of the overlay tamper sweep
    pub tamper_interval_ms: Option<u64>,

    /// How long to wait for the browser to answer a request
    pub request_timeout_ms: Option<u64>,

    /// Tamper reports accepted per tab per second
    pub tamper_reports_per_second: Option<u32>,

    /// Focus guard page URL
    pub focus_guard_url: Option<String>,

    /// Sleep guard page URL
    pub sleep_guard_url: Option<String>,
}

/// Policy defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDefaults {
    /// Sleep window start (HH:MM or HH:MM:SS)
    pub sleep_start: Option<String>,

    /// Sleep window end (HH:MM or HH:MM:SS)
    pub sleep_end: Option<String>,

    pub sleep_enabled: Option<bool>,

    /// Length of a granted unlock, in seconds
    pub unlock_duration_seconds: Option<u64>,

    pub unlock_enabled: Option<bool>,

    /// Site keys enforced before the user has toggled anything
    #[serde(default)]
    pub blocked: Vec<String>,
}
