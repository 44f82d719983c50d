//! Events pushed from the browser to focuswardd

use focusward_util::TabId;
use serde::{Deserialize, Serialize};

use crate::{CheckContext, PolicyKey};

/// Stage of a top-level navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationPhase {
    /// Before the request is issued; nothing of the page exists yet
    BeforeNavigate,
    /// Same-document URL change (single-page apps)
    HistoryStateUpdated,
    /// Document finished loading
    Completed,
}

impl NavigationPhase {
    /// The decision context this phase maps to
    pub fn context(self) -> CheckContext {
        match self {
            NavigationPhase::BeforeNavigate => CheckContext::Navigating,
            NavigationPhase::HistoryStateUpdated | NavigationPhase::Completed => {
                CheckContext::SoftCheck
            }
        }
    }
}

/// Where a challenge was completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeSurface {
    GuardPage,
    Overlay,
}

/// All events from the browser collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BrowserEvent {
    /// A navigation in some frame of a tab
    Navigation {
        tab_id: TabId,
        #[serde(default)]
        frame_id: i64,
        url: String,
        phase: NavigationPhase,
    },

    /// The overlay was removed from a tab that should show it.
    /// Carries no payload; the sending tab is resolved by the receiver.
    OverlayTampered { tab_id: TabId },

    /// The user completed the challenge phrase
    ChallengePassed {
        tab_id: TabId,
        /// URL of the page the challenge was completed on
        url: String,
        surface: ChallengeSurface,
    },

    /// The settings UI changed a policy value
    SetPolicy {
        key: PolicyKey,
        value: serde_json::Value,
    },

    /// A tab was closed
    TabRemoved { tab_id: TabId },
}

impl BrowserEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BrowserEvent::Navigation { .. } => "navigation",
            BrowserEvent::OverlayTampered { .. } => "overlay_tampered",
            BrowserEvent::ChallengePassed { .. } => "challenge_passed",
            BrowserEvent::SetPolicy { .. } => "set_policy",
            BrowserEvent::TabRemoved { .. } => "tab_removed",
        }
    }
}
