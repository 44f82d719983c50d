//! Tamper verifier: confirm that overlays which should be up still are

use focusward_api::{CheckContext, OverlayOutcome, OverlayReply, OverlayRequest};
use focusward_util::{EpochMillis, TabId};
use futures::future::join_all;
use tracing::{debug, warn};

use crate::{CoreEvent, EnforcementEngine, PolicySnapshot};

/// Run one verification sweep.
///
/// Skipped while timed unlocks are off or the sleep window is active: both
/// enforce through hard redirects, which the page cannot remove. Tabs are
/// checked concurrently, so a sweep takes about one round-trip timeout no
/// matter how many overlays go unanswered.
pub async fn verify_overlays(engine: &EnforcementEngine, now_ms: EpochMillis) -> Vec<CoreEvent> {
    let policy = engine.snapshot();
    if !policy.unlock.feature_enabled() || policy.sleep_active(now_ms) {
        return Vec::new();
    }

    let tabs = match engine.host().list_tabs().await {
        Ok(tabs) => tabs,
        Err(e) => {
            warn!(error = %e, "Cannot list tabs for overlay check");
            return Vec::new();
        }
    };

    let checks: Vec<_> = tabs
        .iter()
        .filter_map(|tab| {
            let url = tab.url.as_deref()?;
            let due = engine.is_blocked(url, &policy)
                && !engine.is_exempt(tab.tab_id, url, &policy, now_ms);
            due.then(|| verify_tab(engine, &policy, tab.tab_id, url, now_ms))
        })
        .collect();
    let checked = checks.len();

    let events: Vec<CoreEvent> = join_all(checks).await.into_iter().flatten().collect();

    debug!(checked, "Overlay verification done");
    events
}

async fn verify_tab(
    engine: &EnforcementEngine,
    policy: &PolicySnapshot,
    tab_id: TabId,
    url: &str,
    now_ms: EpochMillis,
) -> Vec<CoreEvent> {
    let context = match engine.host().overlay(tab_id, OverlayRequest::VerifyBlocker).await {
        OverlayOutcome::Ok(OverlayReply::Verified { present: true }) => return Vec::new(),
        // Reachable page without the overlay: try to put it back first
        OverlayOutcome::Ok(_) => CheckContext::SoftCheck,
        OverlayOutcome::Unreachable => CheckContext::TamperReport,
    };

    warn!(tab_id = %tab_id, url = %url, "Overlay missing");
    let action = engine.enforce(tab_id, url, context, policy, now_ms).await;
    vec![
        CoreEvent::TamperDetected { tab_id },
        CoreEvent::Enforced { tab_id, action },
    ]
}
