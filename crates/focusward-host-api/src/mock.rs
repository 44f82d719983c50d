//! Mock browser for testing

use async_trait::async_trait;
use focusward_api::{BrowserEvent, OverlayOutcome, OverlayReply, OverlayRequest, TabObservation};
use focusward_util::TabId;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::{BrowserHost, HostError, HostResult};

/// Mock tab state for testing
#[derive(Debug, Clone)]
pub struct MockTab {
    pub url: Option<String>,
    /// Whether a content script answers overlay messages
    pub content_script: bool,
    /// Whether `ShowBlocker` reports a failed mount
    pub mount_fails: bool,
    pub overlay_present: bool,
}

impl MockTab {
    fn new(url: String) -> Self {
        Self {
            url: Some(url),
            content_script: true,
            mount_fails: false,
            overlay_present: false,
        }
    }
}

/// A call the mock received, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Navigate { tab_id: TabId, url: String },
    Overlay { tab_id: TabId, request: OverlayRequest },
}

/// Mock browser for unit/integration testing
pub struct MockBrowser {
    next_id: AtomicI64,
    tabs: Mutex<BTreeMap<TabId, MockTab>>,
    calls: Mutex<Vec<MockCall>>,
    event_tx: mpsc::UnboundedSender<BrowserEvent>,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<BrowserEvent>>>,

    /// Configure `list_tabs` to fail
    pub fail_list: AtomicBool,

    /// Round-trip latency of every overlay message, in milliseconds
    pub overlay_latency_ms: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockBrowser {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            next_id: AtomicI64::new(1),
            tabs: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            event_tx: tx,
            event_rx: Mutex::new(Some(rx)),
            fail_list: AtomicBool::new(false),
            overlay_latency_ms: AtomicU64::new(0),
        }
    }

    /// Open a tab at `url` and return its id
    pub fn open_tab(&self, url: &str) -> TabId {
        let tab_id = TabId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        lock(&self.tabs).insert(tab_id, MockTab::new(url.to_string()));
        tab_id
    }

    /// Snapshot of a tab's state
    pub fn tab(&self, tab_id: TabId) -> Option<MockTab> {
        lock(&self.tabs).get(&tab_id).cloned()
    }

    pub fn tab_url(&self, tab_id: TabId) -> Option<String> {
        self.tab(tab_id).and_then(|t| t.url)
    }

    pub fn overlay_present(&self, tab_id: TabId) -> bool {
        self.tab(tab_id).is_some_and(|t| t.overlay_present)
    }

    /// Simulate the user navigating a tab (the overlay goes with the old page)
    pub fn set_url(&self, tab_id: TabId, url: &str) {
        if let Some(tab) = lock(&self.tabs).get_mut(&tab_id) {
            tab.url = Some(url.to_string());
            tab.overlay_present = false;
        }
    }

    /// Simulate the user deleting the overlay from the page
    pub fn remove_overlay(&self, tab_id: TabId) {
        if let Some(tab) = lock(&self.tabs).get_mut(&tab_id) {
            tab.overlay_present = false;
        }
    }

    pub fn set_content_script(&self, tab_id: TabId, present: bool) {
        if let Some(tab) = lock(&self.tabs).get_mut(&tab_id) {
            tab.content_script = present;
        }
    }

    pub fn set_mount_fails(&self, tab_id: TabId, fails: bool) {
        if let Some(tab) = lock(&self.tabs).get_mut(&tab_id) {
            tab.mount_fails = fails;
        }
    }

    /// Push an event as if the browser had sent it
    pub fn push_event(&self, event: BrowserEvent) {
        let _ = self.event_tx.send(event);
    }

    /// All calls received so far
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    /// Navigations received so far, as `(tab, url)`
    pub fn navigations(&self) -> Vec<(TabId, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Navigate { tab_id, url } => Some((tab_id, url)),
                MockCall::Overlay { .. } => None,
            })
            .collect()
    }

    /// Overlay requests received for one tab
    pub fn overlay_requests(&self, tab_id: TabId) -> Vec<OverlayRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Overlay { tab_id: t, request } if t == tab_id => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }
}

impl Default for MockBrowser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserHost for MockBrowser {
    async fn list_tabs(&self) -> HostResult<Vec<TabObservation>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(HostError::Internal("Mock list failure".into()));
        }

        Ok(lock(&self.tabs)
            .iter()
            .map(|(id, tab)| TabObservation {
                tab_id: *id,
                url: tab.url.clone(),
            })
            .collect())
    }

    async fn get_tab(&self, tab_id: TabId) -> HostResult<Option<TabObservation>> {
        Ok(lock(&self.tabs).get(&tab_id).map(|tab| TabObservation {
            tab_id,
            url: tab.url.clone(),
        }))
    }

    async fn navigate(&self, tab_id: TabId, url: &str) -> HostResult<()> {
        lock(&self.calls).push(MockCall::Navigate {
            tab_id,
            url: url.to_string(),
        });

        let mut tabs = lock(&self.tabs);
        let tab = tabs.get_mut(&tab_id).ok_or(HostError::TabNotFound(tab_id))?;
        tab.url = Some(url.to_string());
        tab.overlay_present = false;
        Ok(())
    }

    async fn overlay(&self, tab_id: TabId, request: OverlayRequest) -> OverlayOutcome {
        let latency = self.overlay_latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        lock(&self.calls).push(MockCall::Overlay {
            tab_id,
            request: request.clone(),
        });

        let mut tabs = lock(&self.tabs);
        let Some(tab) = tabs.get_mut(&tab_id) else {
            return OverlayOutcome::Unreachable;
        };
        if !tab.content_script {
            return OverlayOutcome::Unreachable;
        }

        let reply = match request {
            OverlayRequest::ShowBlocker { .. } => {
                tab.overlay_present = !tab.mount_fails;
                OverlayReply::Shown {
                    ok: tab.overlay_present,
                }
            }
            OverlayRequest::HideBlocker => {
                tab.overlay_present = false;
                OverlayReply::Hidden
            }
            OverlayRequest::VerifyBlocker => OverlayReply::Verified {
                present: tab.overlay_present,
            },
        };
        OverlayOutcome::Ok(reply)
    }

    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<BrowserEvent>> {
        lock(&self.event_rx).take()
    }
}
