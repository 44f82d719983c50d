//! Browser host traits

use async_trait::async_trait;
use focusward_api::{BrowserEvent, OverlayOutcome, OverlayRequest, TabObservation};
use focusward_util::TabId;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from browser host operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Tab not found: {0}")]
    TabNotFound(TabId),

    #[error("Browser rejected request: {0}")]
    Rejected(String),

    #[error("Browser did not reply in time")]
    Timeout,

    #[error("Browser connection closed")]
    Disconnected,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// The browser, as seen by the enforcement core.
///
/// Tab operations may fail (tab closed, browser busy); callers log and
/// move on. The overlay round-trip never fails: any transport problem is
/// reported as [`OverlayOutcome::Unreachable`].
#[async_trait]
pub trait BrowserHost: Send + Sync {
    /// Enumerate all open tabs
    async fn list_tabs(&self) -> HostResult<Vec<TabObservation>>;

    /// Look up one tab; `None` if it no longer exists
    async fn get_tab(&self, tab_id: TabId) -> HostResult<Option<TabObservation>>;

    /// Rewrite a tab's location
    async fn navigate(&self, tab_id: TabId, url: &str) -> HostResult<()>;

    /// Deliver an overlay message to the tab's content script and await its reply
    async fn overlay(&self, tab_id: TabId, request: OverlayRequest) -> OverlayOutcome;

    /// Take the stream of browser events. Only the first call returns `Some`.
    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<BrowserEvent>>;

    /// Optional: check if the connection to the browser is healthy
    fn is_healthy(&self) -> bool {
        true
    }
}
