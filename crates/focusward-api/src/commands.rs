//! Command types exchanged with the browser extension

use focusward_util::{RequestId, TabId};
use serde::{Deserialize, Serialize};

use crate::{BrowserEvent, OverlayReply, OverlayRequest, TabObservation, API_VERSION};

/// Request wrapper with metadata (daemon -> browser)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostRequest {
    /// Request ID for correlation
    pub id: RequestId,
    /// API version
    pub api_version: u32,
    /// The command
    pub command: HostCommand,
}

impl HostRequest {
    pub fn new(command: HostCommand) -> Self {
        Self {
            id: RequestId::new(),
            api_version: API_VERSION,
            command,
        }
    }
}

/// Operations the daemon asks the browser to perform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostCommand {
    /// Enumerate all open tabs
    ListTabs,
    /// Look up a single tab
    GetTab { tab_id: TabId },
    /// Rewrite a tab's location
    Navigate { tab_id: TabId, url: String },
    /// Deliver an overlay message to a tab's content script
    Overlay {
        tab_id: TabId,
        request: OverlayRequest,
    },
}

impl HostCommand {
    pub fn name(&self) -> &'static str {
        match self {
            HostCommand::ListTabs => "list_tabs",
            HostCommand::GetTab { .. } => "get_tab",
            HostCommand::Navigate { .. } => "navigate",
            HostCommand::Overlay { .. } => "overlay",
        }
    }
}

/// Result of a command, as reported by the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommandResult {
    Tabs { tabs: Vec<TabObservation> },
    Tab { tab: Option<TabObservation> },
    Done,
    Overlay { reply: OverlayReply },
    /// The browser API rejected the call (tab gone, no listener, ...)
    Failed { message: String },
}

/// Any message from the browser to the daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostMessage {
    /// Reply to an earlier `HostRequest`
    Reply { id: RequestId, result: CommandResult },
    /// Unsolicited event
    Event { event: BrowserEvent },
}
