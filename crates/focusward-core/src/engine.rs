//! Enforcement engine

use focusward_api::{
    guard_target, BrowserEvent, ChallengeSurface, CheckContext, EnforcementAction, GuardKind,
    GuardPages, NavigationPhase, OverlayRequest, PolicyKey,
};
use focusward_config::{FocusConfig, PolicyDefaults, SiteRuleSet};
use focusward_host_api::BrowserHost;
use focusward_store::{PolicyChange, PolicyStore, PolicyStoreExt};
use focusward_util::{EpochMillis, FocusError, RateLimiter, TabId};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{is_blocked, validate_policy_value, CoreEvent, PolicySnapshot, TabPasses};

/// Decide what to do with a tab showing `url`.
///
/// First match wins:
/// 1. not blocked: allow (and clear any stale overlay when the page is loaded)
/// 2. sleep window active: sleep guard, whatever the unlock state
/// 3. timed unlocks disabled: block per context
/// 4. unlock active: allow
/// 5. block per context
pub fn decide(
    url: &str,
    context: CheckContext,
    policy: &PolicySnapshot,
    sites: &SiteRuleSet,
    now_ms: EpochMillis,
) -> EnforcementAction {
    if !is_blocked(url, &policy.blocked, sites) {
        return allow(context);
    }

    if policy.sleep_active(now_ms) {
        return EnforcementAction::HardRedirectSleep;
    }

    if !policy.unlock.feature_enabled() {
        return block(context);
    }

    if policy.unlock.is_active(now_ms) {
        return allow(context);
    }

    block(context)
}

fn allow(context: CheckContext) -> EnforcementAction {
    if context.allows_overlay() {
        EnforcementAction::HideOverlay
    } else {
        EnforcementAction::Allow
    }
}

fn block(context: CheckContext) -> EnforcementAction {
    if context.allows_overlay() {
        EnforcementAction::ShowOverlay
    } else {
        EnforcementAction::HardRedirectFocus
    }
}

/// What the scheduler should run after a policy change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    None,
    TamperPass,
    ReconcilePass,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The enforcement engine.
///
/// Stateless apart from per-tab bookkeeping: every operation reads a fresh
/// policy snapshot, and every write is an idempotent re-application, so
/// overlapping passes only delay convergence.
pub struct EnforcementEngine {
    sites: SiteRuleSet,
    guard: GuardPages,
    defaults: PolicyDefaults,
    store: Arc<dyn PolicyStore>,
    host: Arc<dyn BrowserHost>,
    tamper_limiter: Mutex<RateLimiter>,
    passes: Mutex<TabPasses>,
}

impl EnforcementEngine {
    pub fn new(config: &FocusConfig, store: Arc<dyn PolicyStore>, host: Arc<dyn BrowserHost>) -> Self {
        info!(
            sites = config.sites.len(),
            focus_guard = %config.service.guard_pages.page(GuardKind::Focus),
            sleep_guard = %config.service.guard_pages.page(GuardKind::Sleep),
            "Enforcement engine initialized"
        );

        Self {
            sites: config.sites.clone(),
            guard: config.service.guard_pages.clone(),
            defaults: config.defaults.clone(),
            store,
            host,
            tamper_limiter: Mutex::new(RateLimiter::new(
                config.service.tamper_reports_per_second,
                Duration::from_secs(1),
            )),
            passes: Mutex::new(TabPasses::new()),
        }
    }

    pub fn host(&self) -> &Arc<dyn BrowserHost> {
        &self.host
    }

    pub fn store(&self) -> &Arc<dyn PolicyStore> {
        &self.store
    }

    pub fn guard_pages(&self) -> &GuardPages {
        &self.guard
    }

    /// Read the current policy
    pub fn snapshot(&self) -> PolicySnapshot {
        PolicySnapshot::load(self.store.as_ref(), &self.defaults)
    }

    /// Whether `url` is an enforced destination (guard pages never are)
    pub fn is_blocked(&self, url: &str, policy: &PolicySnapshot) -> bool {
        !self.guard.is_guard_page(url) && is_blocked(url, &policy.blocked, &self.sites)
    }

    pub fn decide(
        &self,
        url: &str,
        context: CheckContext,
        policy: &PolicySnapshot,
        now_ms: EpochMillis,
    ) -> EnforcementAction {
        decide(url, context, policy, &self.sites, now_ms)
    }

    /// Whether a blocked tab is currently exempt from focus enforcement
    pub fn is_exempt(&self, tab_id: TabId, url: &str, policy: &PolicySnapshot, now_ms: EpochMillis) -> bool {
        policy.unlock.is_active(now_ms) || lock(&self.passes).covers(tab_id, url)
    }

    /// Decide and carry out. Returns the action actually taken.
    pub async fn enforce(
        &self,
        tab_id: TabId,
        url: &str,
        context: CheckContext,
        policy: &PolicySnapshot,
        now_ms: EpochMillis,
    ) -> EnforcementAction {
        let mut action = self.decide(url, context, policy, now_ms);

        let focus_block = matches!(
            action,
            EnforcementAction::ShowOverlay | EnforcementAction::HardRedirectFocus
        );
        let admitted = {
            let mut passes = lock(&self.passes);
            // A tab that moved on loses its pass even where nothing is blocked
            passes.observe(tab_id, url);
            focus_block && passes.admit(tab_id, url, context)
        };
        if admitted {
            debug!(tab_id = %tab_id, url = %url, "Tab holds a pass for this host");
            action = allow(context);
        }

        self.apply(tab_id, url, action).await
    }

    /// Carry out an action. `ShowOverlay` falls back to the focus guard when
    /// the overlay can't be confirmed. Returns the action actually taken.
    pub async fn apply(&self, tab_id: TabId, url: &str, action: EnforcementAction) -> EnforcementAction {
        match action {
            EnforcementAction::Allow => action,
            EnforcementAction::HideOverlay => {
                let outcome = self.host.overlay(tab_id, OverlayRequest::HideBlocker).await;
                if !outcome.is_reachable() {
                    debug!(tab_id = %tab_id, "No overlay collaborator to hide");
                }
                action
            }
            EnforcementAction::ShowOverlay => {
                let request = OverlayRequest::ShowBlocker {
                    target_url: url.to_string(),
                };
                let outcome = self.host.overlay(tab_id, request).await;
                if outcome.overlay_present() {
                    info!(tab_id = %tab_id, url = %url, "Overlay shown");
                    return action;
                }

                info!(tab_id = %tab_id, url = %url, outcome = ?outcome, "Overlay not confirmed, redirecting");
                self.redirect(tab_id, url, GuardKind::Focus).await
            }
            EnforcementAction::HardRedirectFocus => self.redirect(tab_id, url, GuardKind::Focus).await,
            EnforcementAction::HardRedirectSleep => self.redirect(tab_id, url, GuardKind::Sleep).await,
            EnforcementAction::Reload => {
                let kind = self.guard.classify(url).unwrap_or(GuardKind::Focus);
                match self.release(tab_id, url, kind).await {
                    CoreEvent::Released { .. } => action,
                    _ => EnforcementAction::Allow,
                }
            }
        }
    }

    /// Send a tab to a guard page, preserving its original destination
    async fn redirect(&self, tab_id: TabId, url: &str, kind: GuardKind) -> EnforcementAction {
        let action = match kind {
            GuardKind::Focus => EnforcementAction::HardRedirectFocus,
            GuardKind::Sleep => EnforcementAction::HardRedirectSleep,
        };

        let current = self.guard.classify(url);
        if current == Some(kind) {
            return action;
        }

        // Moving between guard pages keeps the recorded destination
        let destination = match current {
            Some(_) => guard_target(url),
            None => Some(url.to_string()),
        };
        let redirect_url = match destination {
            Some(original) => self.guard.redirect_url(kind, &original),
            None => self.guard.page(kind).to_string(),
        };

        match self.host.navigate(tab_id, &redirect_url).await {
            Ok(()) => info!(tab_id = %tab_id, url = %url, guard = %kind, "Redirected to guard page"),
            Err(e) => debug!(tab_id = %tab_id, error = %e, "Redirect failed, tab likely gone"),
        }
        action
    }

    /// Send a guard page back to its recorded destination
    pub async fn release(&self, tab_id: TabId, url: &str, kind: GuardKind) -> CoreEvent {
        let Some(target) = guard_target(url) else {
            warn!(tab_id = %tab_id, url = %url, guard = %kind, "Guard page has no target, leaving it");
            return CoreEvent::ReleaseSkipped { tab_id, kind };
        };

        match self.host.navigate(tab_id, &target).await {
            Ok(()) => info!(tab_id = %tab_id, target = %target, guard = %kind, "Released guard page"),
            Err(e) => debug!(tab_id = %tab_id, error = %e, "Release failed, tab likely gone"),
        }
        CoreEvent::Released { tab_id, kind, target }
    }

    /// Release every open tab sitting on the `kind` guard page
    pub async fn release_guard_tabs(&self, kind: GuardKind, grant_pass: bool) -> Vec<CoreEvent> {
        let tabs = match self.host.list_tabs().await {
            Ok(tabs) => tabs,
            Err(e) => {
                warn!(error = %e, guard = %kind, "Cannot list tabs to release");
                return Vec::new();
            }
        };

        let mut events = Vec::new();
        for tab in tabs {
            let Some(url) = tab.url.as_deref() else { continue };
            if self.guard.classify(url) != Some(kind) {
                continue;
            }

            if grant_pass {
                if let Some(target) = guard_target(url) {
                    lock(&self.passes).grant(tab.tab_id, &target);
                }
            }
            events.push(self.release(tab.tab_id, url, kind).await);
        }
        events
    }

    /// Dispatch one browser event
    pub async fn handle_event(&self, event: BrowserEvent, now_ms: EpochMillis) -> Vec<CoreEvent> {
        debug!(event = event.name(), "Browser event");

        match event {
            BrowserEvent::Navigation {
                tab_id,
                frame_id,
                url,
                phase,
            } => self
                .handle_navigation(tab_id, frame_id, &url, phase, now_ms)
                .await
                .filter(|action| *action != EnforcementAction::Allow)
                .map(|action| vec![CoreEvent::Enforced { tab_id, action }])
                .unwrap_or_default(),
            BrowserEvent::OverlayTampered { tab_id } => self.handle_tamper_report(tab_id, now_ms).await,
            BrowserEvent::ChallengePassed { tab_id, url, surface } => {
                self.handle_challenge_passed(tab_id, &url, surface, now_ms).await
            }
            BrowserEvent::SetPolicy { key, value } => {
                if let Err(e) = self.set_policy(key, value) {
                    warn!(key = %key, error = %e, "Rejected policy update");
                }
                Vec::new()
            }
            BrowserEvent::TabRemoved { tab_id } => {
                self.forget_tab(tab_id);
                Vec::new()
            }
        }
    }

    /// Top-level navigations only; guard pages are never enforced
    pub async fn handle_navigation(
        &self,
        tab_id: TabId,
        frame_id: i64,
        url: &str,
        phase: NavigationPhase,
        now_ms: EpochMillis,
    ) -> Option<EnforcementAction> {
        if frame_id != 0 || self.guard.is_guard_page(url) {
            return None;
        }

        let policy = self.snapshot();
        let action = self.enforce(tab_id, url, phase.context(), &policy, now_ms).await;
        debug!(tab_id = %tab_id, url = %url, phase = ?phase, action = ?action, "Navigation checked");
        Some(action)
    }

    /// The overlay reported its own removal
    pub async fn handle_tamper_report(&self, tab_id: TabId, now_ms: EpochMillis) -> Vec<CoreEvent> {
        if !lock(&self.tamper_limiter).check(tab_id) {
            debug!(tab_id = %tab_id, "Tamper report rate limited");
            return Vec::new();
        }

        let url = match self.host.get_tab(tab_id).await {
            Ok(Some(tab)) => match tab.url {
                Some(url) => url,
                None => return Vec::new(),
            },
            Ok(None) => return Vec::new(),
            Err(e) => {
                debug!(tab_id = %tab_id, error = %e, "Cannot look up reporting tab");
                return Vec::new();
            }
        };

        let policy = self.snapshot();
        if !self.is_blocked(&url, &policy) {
            return Vec::new();
        }

        let action = self
            .enforce(tab_id, &url, CheckContext::TamperReport, &policy, now_ms)
            .await;
        let mut events = Vec::new();
        if action.is_hard_redirect() {
            warn!(tab_id = %tab_id, url = %url, "Overlay tampered with");
            events.push(CoreEvent::TamperDetected { tab_id });
        }
        events.push(CoreEvent::Enforced { tab_id, action });
        events
    }

    /// The user completed the challenge on a guard page or overlay
    pub async fn handle_challenge_passed(
        &self,
        tab_id: TabId,
        url: &str,
        surface: ChallengeSurface,
        now_ms: EpochMillis,
    ) -> Vec<CoreEvent> {
        let mut policy = self.snapshot();
        let until = policy.unlock.grant(now_ms);
        self.write(PolicyKey::UnlockUntilEpochMs, Value::from(until));
        info!(tab_id = %tab_id, until, "Unlock granted");

        let mut events = vec![CoreEvent::UnlockGranted { until }];

        match surface {
            ChallengeSurface::GuardPage => {
                let Some(target) = guard_target(url) else {
                    warn!(tab_id = %tab_id, url = %url, "Challenge passed on guard page without target");
                    return events;
                };
                if until == 0 {
                    lock(&self.passes).grant(tab_id, &target);
                }
                let kind = self.guard.classify(url).unwrap_or(GuardKind::Focus);
                events.push(self.release(tab_id, url, kind).await);
            }
            ChallengeSurface::Overlay => {
                if until == 0 {
                    lock(&self.passes).grant_current(tab_id, url);
                }
                let action = self.apply(tab_id, url, EnforcementAction::HideOverlay).await;
                events.push(CoreEvent::Enforced { tab_id, action });
            }
        }
        events
    }

    /// Write a policy value on behalf of the settings UI
    pub fn set_policy(&self, key: PolicyKey, value: Value) -> focusward_util::Result<bool> {
        validate_policy_value(key, &value).map_err(FocusError::validation)?;

        let disables_unlock = key == PolicyKey::UnlockDurationEnabled && value == Value::Bool(false);

        let result = if value.is_null() {
            self.store.remove(key)
        } else {
            self.store.set(key, value)
        };
        let changed = result.map_err(|e| FocusError::store(e.to_string()))?;

        if disables_unlock {
            self.revoke_unlock();
        }

        Ok(changed)
    }

    /// React to a change in the store, whoever made it
    pub async fn handle_policy_change(&self, change: &PolicyChange) -> (FollowUp, Vec<CoreEvent>) {
        debug!(key = %change.key, value = %change.value, "Policy changed");

        match change.key {
            PolicyKey::UnlockDurationEnabled => {
                let enabled = change.value.as_bool().unwrap_or(self.defaults.unlock_enabled);
                if enabled {
                    info!("Timed unlock enabled");
                    lock(&self.passes).clear();
                    return (FollowUp::TamperPass, Vec::new());
                }

                info!("Timed unlock disabled, releasing focus guard pages");
                let mut events = Vec::new();
                if self.revoke_unlock() {
                    events.push(CoreEvent::UnlockRevoked);
                }
                events.extend(self.release_guard_tabs(GuardKind::Focus, true).await);
                (FollowUp::None, events)
            }
            PolicyKey::EepyTimeEnabled => {
                let enabled = change.value.as_bool().unwrap_or(self.defaults.sleep_enabled);
                if enabled {
                    info!("Sleep window enabled");
                    return (FollowUp::ReconcilePass, Vec::new());
                }

                info!("Sleep window disabled, releasing sleep guard pages");
                (FollowUp::None, self.release_guard_tabs(GuardKind::Sleep, false).await)
            }
            PolicyKey::SleepStartSeconds | PolicyKey::SleepEndSeconds => {
                (FollowUp::ReconcilePass, Vec::new())
            }
            PolicyKey::BlockedFlags
            | PolicyKey::UnlockUntilEpochMs
            | PolicyKey::UnlockDurationMs => (FollowUp::None, Vec::new()),
        }
    }

    /// Clear a finished unlock so expiry is reported once
    pub fn expire_unlock(&self) {
        self.write(PolicyKey::UnlockUntilEpochMs, Value::from(0u64));
    }

    /// Zero a stored unlock while the feature is off. Returns `true` if one was cleared.
    pub fn revoke_unlock(&self) -> bool {
        let stored = self.store.read_u64(PolicyKey::UnlockUntilEpochMs).unwrap_or(0);
        if stored == 0 {
            return false;
        }
        self.write(PolicyKey::UnlockUntilEpochMs, Value::from(0u64));
        info!(until = stored, "Outstanding unlock revoked");
        true
    }

    /// Drop per-tab state for a closed tab
    pub fn forget_tab(&self, tab_id: TabId) {
        lock(&self.tamper_limiter).remove_tab(tab_id);
        lock(&self.passes).remove_tab(tab_id);
    }

    /// Periodic housekeeping of per-tab state
    pub fn cleanup(&self) {
        lock(&self.tamper_limiter).cleanup(Duration::from_secs(60));
    }

    fn write(&self, key: PolicyKey, value: Value) {
        if let Err(e) = self.store.set(key, value) {
            warn!(key = %key, error = %e, "Policy write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use focusward_config::SiteRule;
    use focusward_host_api::MockBrowser;
    use focusward_store::MemoryStore;
    use serde_json::json;

    const NOW: EpochMillis = 1_700_000_000_000;

    fn video_sites() -> SiteRuleSet {
        SiteRuleSet::from_rules([("video", vec![SiteRule::domain("video.example.com")])])
    }

    /// Policy with "video" enabled and the sleep window switched off
    fn policy() -> PolicySnapshot {
        let store = MemoryStore::with_values([
            (PolicyKey::BlockedFlags, json!({ "video": true })),
            (PolicyKey::EepyTimeEnabled, json!(false)),
        ]);
        PolicySnapshot::load(&store, &PolicyDefaults::default())
    }

    /// Policy whose sleep window covers the whole day except the last second
    fn sleeping() -> PolicySnapshot {
        let mut p = policy();
        p.sleep_enabled = true;
        p.sleep_window = crate::TimeWindow::new(0, 86_399);
        p
    }

    const URL: &str = "https://video.example.com/watch";

    #[test]
    fn decision_order() {
        let sites = video_sites();
        let p = policy();

        assert_eq!(
            decide(URL, CheckContext::Navigating, &p, &sites, NOW),
            EnforcementAction::HardRedirectFocus
        );
        assert_eq!(
            decide(URL, CheckContext::SoftCheck, &p, &sites, NOW),
            EnforcementAction::ShowOverlay
        );
        assert_eq!(
            decide(URL, CheckContext::TamperReport, &p, &sites, NOW),
            EnforcementAction::HardRedirectFocus
        );
        assert_eq!(
            decide("https://example.org/", CheckContext::SoftCheck, &p, &sites, NOW),
            EnforcementAction::HideOverlay
        );
        assert_eq!(
            decide("https://example.org/", CheckContext::Navigating, &p, &sites, NOW),
            EnforcementAction::Allow
        );
    }

    #[test]
    fn unlock_allows_until_expiry() {
        let sites = video_sites();
        let mut p = policy();
        p.unlock.grant(NOW);
        let end = p.unlock.until_ms();

        assert_eq!(
            decide(URL, CheckContext::Navigating, &p, &sites, end - 1),
            EnforcementAction::Allow
        );
        assert_eq!(
            decide(URL, CheckContext::SoftCheck, &p, &sites, end - 1),
            EnforcementAction::HideOverlay
        );
        assert_eq!(
            decide(URL, CheckContext::Navigating, &p, &sites, end),
            EnforcementAction::HardRedirectFocus
        );
    }

    #[test]
    fn sleep_beats_unlock() {
        let sites = video_sites();
        let mut p = sleeping();
        let at = chrono_midday();
        p.unlock.grant(at);
        assert!(p.unlock.is_active(at));

        for context in [CheckContext::Navigating, CheckContext::SoftCheck, CheckContext::TamperReport] {
            assert_eq!(decide(URL, context, &p, &sites, at), EnforcementAction::HardRedirectSleep);
        }
    }

    #[test]
    fn disabled_unlock_blocks_per_context() {
        let sites = video_sites();
        let mut p = policy();
        p.unlock.set_feature_enabled(false);

        assert_eq!(
            decide(URL, CheckContext::SoftCheck, &p, &sites, NOW),
            EnforcementAction::ShowOverlay
        );
        assert_eq!(
            decide(URL, CheckContext::Navigating, &p, &sites, NOW),
            EnforcementAction::HardRedirectFocus
        );
    }

    fn chrono_midday() -> EpochMillis {
        use chrono::{Local, TimeZone};
        focusward_util::to_epoch_ms(&Local.with_ymd_and_hms(2025, 3, 12, 12, 0, 0).unwrap())
    }

    fn engine(store: Arc<MemoryStore>, browser: Arc<MockBrowser>) -> EnforcementEngine {
        let config = FocusConfig {
            sites: video_sites(),
            ..FocusConfig::default()
        };
        EnforcementEngine::new(&config, store, browser)
    }

    fn awake_store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::with_values([
            (PolicyKey::BlockedFlags, json!({ "video": true })),
            (PolicyKey::EepyTimeEnabled, json!(false)),
        ]))
    }

    #[tokio::test]
    async fn overlay_failure_falls_back_to_redirect() {
        let browser = Arc::new(MockBrowser::new());
        let engine = engine(awake_store(), browser.clone());
        let tab = browser.open_tab(URL);
        browser.set_mount_fails(tab, true);

        let action = engine
            .enforce(tab, URL, CheckContext::SoftCheck, &engine.snapshot(), NOW)
            .await;
        assert_eq!(action, EnforcementAction::HardRedirectFocus);

        let expected = GuardPages::default().redirect_url(GuardKind::Focus, URL);
        assert_eq!(browser.tab_url(tab), Some(expected));
    }

    #[tokio::test]
    async fn overlay_shown_when_acknowledged() {
        let browser = Arc::new(MockBrowser::new());
        let engine = engine(awake_store(), browser.clone());
        let tab = browser.open_tab(URL);

        let action = engine
            .enforce(tab, URL, CheckContext::SoftCheck, &engine.snapshot(), NOW)
            .await;
        assert_eq!(action, EnforcementAction::ShowOverlay);
        assert!(browser.overlay_present(tab));
        assert!(browser.navigations().is_empty());
    }

    #[tokio::test]
    async fn navigation_ignores_subframes_and_guard_pages() {
        let browser = Arc::new(MockBrowser::new());
        let engine = engine(awake_store(), browser.clone());
        let tab = browser.open_tab(URL);
        let guard = GuardPages::default().redirect_url(GuardKind::Focus, URL);

        let sub = engine
            .handle_navigation(tab, 3, URL, NavigationPhase::BeforeNavigate, NOW)
            .await;
        assert_eq!(sub, None);

        let on_guard = engine
            .handle_navigation(tab, 0, &guard, NavigationPhase::Completed, NOW)
            .await;
        assert_eq!(on_guard, None);
        assert!(browser.calls().is_empty());

        let top = engine
            .handle_navigation(tab, 0, URL, NavigationPhase::BeforeNavigate, NOW)
            .await;
        assert_eq!(top, Some(EnforcementAction::HardRedirectFocus));
    }

    #[tokio::test]
    async fn challenge_on_guard_page_grants_and_returns() {
        let store = awake_store();
        let browser = Arc::new(MockBrowser::new());
        let engine = engine(store.clone(), browser.clone());
        let guard = GuardPages::default().redirect_url(GuardKind::Focus, URL);
        let tab = browser.open_tab(&guard);

        let events = engine
            .handle_challenge_passed(tab, &guard, ChallengeSurface::GuardPage, NOW)
            .await;

        assert_eq!(events[0], CoreEvent::UnlockGranted { until: NOW + 300_000 });
        assert_eq!(store.read_u64(PolicyKey::UnlockUntilEpochMs), Some(NOW + 300_000));
        assert_eq!(browser.tab_url(tab).as_deref(), Some(URL));

        // The returning navigation is now allowed
        let action = engine
            .handle_navigation(tab, 0, URL, NavigationPhase::BeforeNavigate, NOW + 1)
            .await;
        assert_eq!(action, Some(EnforcementAction::Allow));
    }

    #[tokio::test]
    async fn challenge_on_overlay_hides_it() {
        let browser = Arc::new(MockBrowser::new());
        let engine = engine(awake_store(), browser.clone());
        let tab = browser.open_tab(URL);
        engine
            .enforce(tab, URL, CheckContext::SoftCheck, &engine.snapshot(), NOW)
            .await;

        engine
            .handle_challenge_passed(tab, URL, ChallengeSurface::Overlay, NOW)
            .await;
        assert!(!browser.overlay_present(tab));
        assert_eq!(browser.overlay_requests(tab).last(), Some(&OverlayRequest::HideBlocker));
    }

    #[tokio::test]
    async fn challenge_without_timed_unlock_gives_one_visit() {
        let store = awake_store();
        store.set(PolicyKey::UnlockDurationEnabled, json!(false)).unwrap();
        let browser = Arc::new(MockBrowser::new());
        let engine = engine(store.clone(), browser.clone());
        let guard = GuardPages::default().redirect_url(GuardKind::Focus, URL);
        let tab = browser.open_tab(&guard);

        let events = engine
            .handle_challenge_passed(tab, &guard, ChallengeSurface::GuardPage, NOW)
            .await;
        assert_eq!(events[0], CoreEvent::UnlockGranted { until: 0 });

        let action = engine
            .handle_navigation(tab, 0, URL, NavigationPhase::BeforeNavigate, NOW)
            .await;
        assert_eq!(action, Some(EnforcementAction::Allow));
        let action = engine
            .handle_navigation(tab, 0, URL, NavigationPhase::Completed, NOW)
            .await;
        assert_eq!(action, Some(EnforcementAction::HideOverlay));

        // A second fresh visit needs another challenge
        let action = engine
            .handle_navigation(tab, 0, URL, NavigationPhase::BeforeNavigate, NOW + 3_600_000)
            .await;
        assert_eq!(action, Some(EnforcementAction::HardRedirectFocus));
    }

    #[tokio::test]
    async fn one_visit_pass_ends_when_tab_leaves_host() {
        let store = awake_store();
        store.set(PolicyKey::UnlockDurationEnabled, json!(false)).unwrap();
        let browser = Arc::new(MockBrowser::new());
        let engine = engine(store.clone(), browser.clone());
        let guard = GuardPages::default().redirect_url(GuardKind::Focus, URL);
        let tab = browser.open_tab(&guard);

        engine
            .handle_challenge_passed(tab, &guard, ChallengeSurface::GuardPage, NOW)
            .await;
        engine
            .handle_navigation(tab, 0, "https://example.org/", NavigationPhase::BeforeNavigate, NOW)
            .await;
        let action = engine
            .handle_navigation(tab, 0, URL, NavigationPhase::BeforeNavigate, NOW)
            .await;
        assert_eq!(action, Some(EnforcementAction::HardRedirectFocus));
    }

    #[tokio::test]
    async fn guard_page_without_target_is_left_alone() {
        let browser = Arc::new(MockBrowser::new());
        let engine = engine(awake_store(), browser.clone());
        let bare = GuardPages::default().page(GuardKind::Sleep).to_string();
        let tab = browser.open_tab(&bare);

        let event = engine.release(tab, &bare, GuardKind::Sleep).await;
        assert_eq!(event, CoreEvent::ReleaseSkipped { tab_id: tab, kind: GuardKind::Sleep });
        assert!(browser.navigations().is_empty());
    }

    #[tokio::test]
    async fn set_policy_validates() {
        let store = awake_store();
        let browser = Arc::new(MockBrowser::new());
        let engine = engine(store.clone(), browser);

        assert!(engine.set_policy(PolicyKey::SleepStartSeconds, json!(100_000)).is_err());
        assert!(engine.set_policy(PolicyKey::SleepStartSeconds, json!(79_200)).unwrap());
        assert!(!engine.set_policy(PolicyKey::SleepStartSeconds, json!(79_200)).unwrap());

        assert!(engine.set_policy(PolicyKey::SleepStartSeconds, Value::Null).unwrap());
        assert_eq!(store.get(PolicyKey::SleepStartSeconds).unwrap(), None);
    }

    #[tokio::test]
    async fn disabling_unlock_revokes_and_releases() {
        let store = awake_store();
        store.set(PolicyKey::UnlockUntilEpochMs, json!(NOW + 10_000)).unwrap();
        let browser = Arc::new(MockBrowser::new());
        let engine = engine(store.clone(), browser.clone());

        let guarded = browser.open_tab(&GuardPages::default().redirect_url(GuardKind::Focus, URL));
        let asleep = browser.open_tab(&GuardPages::default().redirect_url(GuardKind::Sleep, URL));
        let other = browser.open_tab("https://example.org/");

        engine.set_policy(PolicyKey::UnlockDurationEnabled, json!(false)).unwrap();
        assert_eq!(store.read_u64(PolicyKey::UnlockUntilEpochMs), Some(0));

        let change = PolicyChange {
            key: PolicyKey::UnlockDurationEnabled,
            value: json!(false),
        };
        let (follow_up, events) = engine.handle_policy_change(&change).await;
        assert_eq!(follow_up, FollowUp::None);
        assert!(events.contains(&CoreEvent::Released {
            tab_id: guarded,
            kind: GuardKind::Focus,
            target: URL.to_string(),
        }));

        assert_eq!(browser.tab_url(guarded).as_deref(), Some(URL));
        assert_ne!(browser.tab_url(asleep).as_deref(), Some(URL));
        assert_eq!(browser.tab_url(other).as_deref(), Some("https://example.org/"));

        // The released tab may stay where it landed
        let action = engine
            .handle_navigation(guarded, 0, URL, NavigationPhase::Completed, NOW)
            .await;
        assert_eq!(action, Some(EnforcementAction::HideOverlay));
    }

    #[tokio::test]
    async fn disabling_sleep_releases_sleep_pages() {
        let browser = Arc::new(MockBrowser::new());
        let engine = engine(awake_store(), browser.clone());
        let asleep = browser.open_tab(&GuardPages::default().redirect_url(GuardKind::Sleep, URL));

        let change = PolicyChange {
            key: PolicyKey::EepyTimeEnabled,
            value: json!(false),
        };
        let (follow_up, _) = engine.handle_policy_change(&change).await;
        assert_eq!(follow_up, FollowUp::None);
        assert_eq!(browser.tab_url(asleep).as_deref(), Some(URL));

        let change = PolicyChange {
            key: PolicyKey::EepyTimeEnabled,
            value: json!(true),
        };
        assert_eq!(engine.handle_policy_change(&change).await.0, FollowUp::ReconcilePass);

        let change = PolicyChange {
            key: PolicyKey::UnlockDurationEnabled,
            value: json!(true),
        };
        assert_eq!(engine.handle_policy_change(&change).await.0, FollowUp::TamperPass);
    }

    #[tokio::test]
    async fn tamper_reports_are_rate_limited() {
        let browser = Arc::new(MockBrowser::new());
        let engine = engine(awake_store(), browser.clone());
        let tab = browser.open_tab(URL);
        browser.set_content_script(tab, false);

        let events = engine.handle_tamper_report(tab, NOW).await;
        assert!(events.contains(&CoreEvent::TamperDetected { tab_id: tab }));

        // Keep the tab on the blocked page and flood reports from it
        for _ in 0..20 {
            browser.set_url(tab, URL);
            engine.handle_tamper_report(tab, NOW).await;
        }
        assert_eq!(browser.navigations().len(), 5);
    }

    #[tokio::test]
    async fn moving_to_sleep_keeps_destination() {
        let browser = Arc::new(MockBrowser::new());
        let engine = engine(awake_store(), browser.clone());
        let guard = GuardPages::default();
        let tab = browser.open_tab(&guard.redirect_url(GuardKind::Focus, URL));
        let url = browser.tab_url(tab).unwrap();

        let action = engine.apply(tab, &url, EnforcementAction::HardRedirectSleep).await;
        assert_eq!(action, EnforcementAction::HardRedirectSleep);
        assert_eq!(
            browser.tab_url(tab),
            Some(guard.redirect_url(GuardKind::Sleep, URL))
        );
    }
}
