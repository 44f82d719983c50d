//! Core events emitted by the engine

use focusward_api::{EnforcementAction, GuardKind};
use focusward_util::{EpochMillis, TabId};

/// Events emitted by the core engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// An action was carried out on a tab
    Enforced {
        tab_id: TabId,
        action: EnforcementAction,
    },

    /// A guard page was sent back to its recorded destination
    Released {
        tab_id: TabId,
        kind: GuardKind,
        target: String,
    },

    /// A guard page could not be released because it has no target
    ReleaseSkipped { tab_id: TabId, kind: GuardKind },

    /// The sleep window became active (or was active at startup)
    SleepStarted,

    SleepEnded,

    /// A challenge was completed; `until` is 0 when timed unlocks are off
    UnlockGranted { until: EpochMillis },

    UnlockExpired,

    /// A nonzero unlock was cleared because the feature is off
    UnlockRevoked,

    /// An overlay that should be mounted was found missing
    TamperDetected { tab_id: TabId },
}
