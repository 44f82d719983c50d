//! Overlay protocol between the engine and the per-tab content script

use serde::{Deserialize, Serialize};

/// Message from the engine to a tab's overlay collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OverlayRequest {
    /// Mount the blocking overlay over the page
    ShowBlocker { target_url: String },
    /// Remove the overlay and stop watching for its removal
    HideBlocker,
    /// Report whether the overlay is currently mounted
    VerifyBlocker,
}

impl OverlayRequest {
    pub fn name(&self) -> &'static str {
        match self {
            OverlayRequest::ShowBlocker { .. } => "show_blocker",
            OverlayRequest::HideBlocker => "hide_blocker",
            OverlayRequest::VerifyBlocker => "verify_blocker",
        }
    }
}

/// Reply from a tab's overlay collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OverlayReply {
    /// Reply to `ShowBlocker`; `ok` is false if the overlay could not mount
    Shown { ok: bool },
    /// Reply to `HideBlocker`
    Hidden,
    /// Reply to `VerifyBlocker`
    Verified { present: bool },
}

/// Result of an overlay round-trip.
///
/// A tab that navigated away, has no content script, or never answered is
/// `Unreachable`; callers treat that as "overlay not present".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayOutcome {
    Ok(OverlayReply),
    Unreachable,
}

impl OverlayOutcome {
    /// True only if the collaborator confirmed a mounted overlay
    pub fn overlay_present(&self) -> bool {
        matches!(
            self,
            OverlayOutcome::Ok(OverlayReply::Shown { ok: true })
                | OverlayOutcome::Ok(OverlayReply::Verified { present: true })
        )
    }

    pub fn is_reachable(&self) -> bool {
        matches!(self, OverlayOutcome::Ok(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_is_tagged() {
        let req = OverlayRequest::ShowBlocker {
            target_url: "https://reddit.com/".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["type"], "show_blocker");
        assert_eq!(json["target_url"], "https://reddit.com/");

        let reply: OverlayReply =
            serde_json::from_str(r#"{"type":"verified","present":false}"#).unwrap();
        assert_eq!(reply, OverlayReply::Verified { present: false });
    }

    #[test]
    fn presence_requires_confirmation() {
        assert!(OverlayOutcome::Ok(OverlayReply::Shown { ok: true }).overlay_present());
        assert!(OverlayOutcome::Ok(OverlayReply::Verified { present: true }).overlay_present());
        assert!(!OverlayOutcome::Ok(OverlayReply::Shown { ok: false }).overlay_present());
        assert!(!OverlayOutcome::Ok(OverlayReply::Hidden).overlay_present());
        assert!(!OverlayOutcome::Unreachable.overlay_present());
    }
}
