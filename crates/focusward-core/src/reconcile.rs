//! Reconciliation sweep: react to sleep window edges and unlock expiry

use focusward_api::{CheckContext, EnforcementAction, GuardKind};
use focusward_util::{EpochMillis, TabId};
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::{CoreEvent, EnforcementEngine, PolicySnapshot};

/// Sleep state seen by the previous tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviousActive {
    /// No tick has run since startup
    #[default]
    Unknown,
    Inactive,
    Active,
}

/// Transitions of the sleep window between two ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SleepEdges {
    pub just_started: bool,
    pub just_ended: bool,
    /// First tick after startup found the window active
    pub first_run_active: bool,
}

impl SleepEdges {
    /// Sleep enforcement must be (re)applied to every tab
    pub fn started(&self) -> bool {
        self.just_started || self.first_run_active
    }

    pub fn any(&self) -> bool {
        self.started() || self.just_ended
    }
}

/// Edge detector for the sleep window, owned by the scheduler
#[derive(Debug, Clone, Default)]
pub struct SleepEdgeTracker {
    previous: PreviousActive,
}

impl SleepEdgeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous(&self) -> PreviousActive {
        self.previous
    }

    /// Record this tick's state and report the edges since the last one
    pub fn observe(&mut self, active: bool) -> SleepEdges {
        let edges = match (self.previous, active) {
            (PreviousActive::Unknown, true) => SleepEdges {
                first_run_active: true,
                ..Default::default()
            },
            (PreviousActive::Inactive, true) => SleepEdges {
                just_started: true,
                ..Default::default()
            },
            (PreviousActive::Active, false) => SleepEdges {
                just_ended: true,
                ..Default::default()
            },
            _ => SleepEdges::default(),
        };

        self.previous = if active {
            PreviousActive::Active
        } else {
            PreviousActive::Inactive
        };
        edges
    }

    /// Put back an earlier state so the next tick sees the same edges again
    fn restore(&mut self, previous: PreviousActive) {
        self.previous = previous;
    }
}

/// Run one reconciliation tick.
///
/// Does nothing beyond a store read unless the sleep window changed state
/// or an unlock ran out. Per tab, sleep transitions are handled before
/// unlock expiry. Tabs are handled concurrently so one unresponsive tab
/// cannot hold up the rest.
pub async fn reconcile_tick(
    engine: &EnforcementEngine,
    tracker: &mut SleepEdgeTracker,
    now_ms: EpochMillis,
) -> Vec<CoreEvent> {
    let policy = engine.snapshot();
    let previous = tracker.previous();
    let edges = tracker.observe(policy.sleep_active(now_ms));
    let unlock_expired = policy.unlock.is_expired_at(now_ms);

    if !edges.any() && !unlock_expired {
        if policy.stale_unlock && engine.revoke_unlock() {
            return vec![CoreEvent::UnlockRevoked];
        }
        return Vec::new();
    }

    let tabs = match engine.host().list_tabs().await {
        Ok(tabs) => tabs,
        Err(e) => {
            warn!(error = %e, "Cannot list tabs, retrying next tick");
            tracker.restore(previous);
            return Vec::new();
        }
    };

    let mut events = Vec::new();
    if edges.started() {
        info!(first_run = edges.first_run_active, "Sleep window started");
        events.push(CoreEvent::SleepStarted);
    }
    if edges.just_ended {
        info!("Sleep window ended");
        events.push(CoreEvent::SleepEnded);
    }

    let sweeps = tabs.iter().filter_map(|tab| {
        let url = tab.url.as_deref()?;
        Some(reconcile_tab(engine, &policy, edges, unlock_expired, tab.tab_id, url, now_ms))
    });
    events.extend(join_all(sweeps).await.into_iter().flatten());

    if unlock_expired {
        info!(until = policy.unlock.until_ms(), "Unlock expired");
        engine.expire_unlock();
        events.push(CoreEvent::UnlockExpired);
    }

    debug!(tabs = tabs.len(), events = events.len(), "Reconciliation pass done");
    events
}

async fn reconcile_tab(
    engine: &EnforcementEngine,
    policy: &PolicySnapshot,
    edges: SleepEdges,
    unlock_expired: bool,
    tab_id: TabId,
    url: &str,
    now_ms: EpochMillis,
) -> Option<CoreEvent> {
    let guard = engine.guard_pages().classify(url);

    if edges.started() {
        let on_focus_guard = guard == Some(GuardKind::Focus);
        if !on_focus_guard && !engine.is_blocked(url, policy) {
            // Sleep dominates; nothing else applies to this tab this tick
            return None;
        }
        let action = engine
            .apply(tab_id, url, EnforcementAction::HardRedirectSleep)
            .await;
        return Some(CoreEvent::Enforced { tab_id, action });
    }

    if edges.just_ended && guard == Some(GuardKind::Sleep) {
        return Some(engine.release(tab_id, url, GuardKind::Sleep).await);
    }

    if unlock_expired && engine.is_blocked(url, policy) {
        let action = engine
            .enforce(tab_id, url, CheckContext::SoftCheck, policy, now_ms)
            .await;
        return Some(CoreEvent::Enforced { tab_id, action });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_reports_edges() {
        let mut tracker = SleepEdgeTracker::new();
        assert_eq!(tracker.previous(), PreviousActive::Unknown);

        // Startup outside the window: no edge
        assert!(!tracker.observe(false).any());

        let edges = tracker.observe(true);
        assert!(edges.just_started && edges.started());
        assert!(!edges.first_run_active);

        assert!(!tracker.observe(true).any());

        let edges = tracker.observe(false);
        assert!(edges.just_ended && !edges.started());
    }

    #[test]
    fn startup_inside_window_counts_as_start() {
        let mut tracker = SleepEdgeTracker::new();
        let edges = tracker.observe(true);
        assert!(edges.first_run_active);
        assert!(!edges.just_started);
        assert!(edges.started());
        assert_eq!(tracker.previous(), PreviousActive::Active);
    }

    #[test]
    fn restore_replays_edge() {
        let mut tracker = SleepEdgeTracker::new();
        tracker.observe(false);

        let previous = tracker.previous();
        assert!(tracker.observe(true).just_started);
        tracker.restore(previous);
        assert!(tracker.observe(true).just_started);
    }
}
