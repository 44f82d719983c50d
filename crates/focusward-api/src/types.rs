//! Shared types for the focusward API

use focusward_util::{SiteKey, TabId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Per-site enforcement switches, as stored under `blockedFlags`
pub type BlockedFlags = BTreeMap<SiteKey, bool>;

/// The engine's sole output: what to do with one tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementAction {
    /// Leave the tab alone
    Allow,
    /// Mount the in-page blocking overlay
    ShowOverlay,
    /// Remove any overlay left over from an earlier decision
    HideOverlay,
    /// Rewrite the tab to the focus guard page
    HardRedirectFocus,
    /// Rewrite the tab to the sleep guard page
    HardRedirectSleep,
    /// Restore the tab to the destination recorded on its guard page
    Reload,
}

impl EnforcementAction {
    pub fn is_hard_redirect(self) -> bool {
        matches!(self, Self::HardRedirectFocus | Self::HardRedirectSleep)
    }
}

/// Why the engine is being asked to decide.
///
/// Controls whether an in-page overlay is an acceptable outcome or a hard
/// redirect is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckContext {
    /// A fresh top-level navigation; no content script is guaranteed yet
    Navigating,
    /// The page is loaded (completed load, history-state change, periodic sweep)
    SoftCheck,
    /// The overlay was reported missing or removed
    TamperReport,
}

impl CheckContext {
    /// Whether an overlay may be used instead of a hard redirect
    pub fn allows_overlay(self) -> bool {
        matches!(self, Self::SoftCheck)
    }
}

/// Ephemeral view of one open tab, queried from the browser per sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabObservation {
    pub tab_id: TabId,
    /// Current URL; absent for tabs the browser won't disclose
    #[serde(default)]
    pub url: Option<String>,
}

impl TabObservation {
    pub fn new(tab_id: TabId, url: impl Into<String>) -> Self {
        Self {
            tab_id,
            url: Some(url.into()),
        }
    }
}

/// Which guard page a tab was sent to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardKind {
    Focus,
    Sleep,
}

impl fmt::Display for GuardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardKind::Focus => write!(f, "focus"),
            GuardKind::Sleep => write!(f, "sleep"),
        }
    }
}

/// Keys of the shared policy store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyKey {
    /// Per-site enforcement flags (`{ "<site>": bool }`)
    #[serde(rename = "blockedFlags")]
    BlockedFlags,
    /// End of the current temporary unlock; 0 means none
    #[serde(rename = "unlockUntilEpochMs")]
    UnlockUntilEpochMs,
    /// Length of a granted unlock
    #[serde(rename = "unlockDurationMs")]
    UnlockDurationMs,
    /// Whether completing a challenge grants a timed unlock
    #[serde(rename = "unlockDurationEnabled")]
    UnlockDurationEnabled,
    /// Sleep window start, seconds since local midnight
    #[serde(rename = "sleepStartSeconds")]
    SleepStartSeconds,
    /// Sleep window end, seconds since local midnight
    #[serde(rename = "sleepEndSeconds")]
    SleepEndSeconds,
    /// Whether the nightly sleep window is enforced
    #[serde(rename = "eepyTimeEnabled")]
    EepyTimeEnabled,
}

impl PolicyKey {
    pub const ALL: [PolicyKey; 7] = [
        PolicyKey::BlockedFlags,
        PolicyKey::UnlockUntilEpochMs,
        PolicyKey::UnlockDurationMs,
        PolicyKey::UnlockDurationEnabled,
        PolicyKey::SleepStartSeconds,
        PolicyKey::SleepEndSeconds,
        PolicyKey::EepyTimeEnabled,
    ];

    /// Storage name of the key
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyKey::BlockedFlags => "blockedFlags",
            PolicyKey::UnlockUntilEpochMs => "unlockUntilEpochMs",
            PolicyKey::UnlockDurationMs => "unlockDurationMs",
            PolicyKey::UnlockDurationEnabled => "unlockDurationEnabled",
            PolicyKey::SleepStartSeconds => "sleepStartSeconds",
            PolicyKey::SleepEndSeconds => "sleepEndSeconds",
            PolicyKey::EepyTimeEnabled => "eepyTimeEnabled",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for PolicyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
