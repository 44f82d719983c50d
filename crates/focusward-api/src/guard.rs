//! Guard page URL contract
//!
//! A blocked navigation is rewritten to `<guard-page>?target=<encoded original URL>`.
//! The guard page restores `target` once the user completes the challenge,
//! and the daemon restores it directly when a feature is switched off.

use thiserror::Error;
use url::Url;

use crate::GuardKind;

/// Query parameter carrying the original destination
pub const TARGET_PARAM: &str = "target";

/// Default focus guard page (extension-relative)
pub const DEFAULT_FOCUS_GUARD_URL: &str = "chrome-extension://focusward/focus/focus.html";

/// Default sleep guard page (extension-relative)
pub const DEFAULT_SLEEP_GUARD_URL: &str = "chrome-extension://focusward/sleep/sleep.html";

#[derive(Debug, Error)]
pub enum GuardUrlError {
    #[error("Invalid {kind} guard page URL '{url}': {source}")]
    Invalid {
        kind: GuardKind,
        url: String,
        source: url::ParseError,
    },

    #[error("Focus and sleep guard pages must be different pages")]
    NotDistinct,
}

/// The two guard pages blocked tabs can be sent to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardPages {
    focus: Url,
    sleep: Url,
}

impl GuardPages {
    pub fn new(focus: &str, sleep: &str) -> Result<Self, GuardUrlError> {
        let focus = parse_base(GuardKind::Focus, focus)?;
        let sleep = parse_base(GuardKind::Sleep, sleep)?;

        if same_page(&focus, &sleep) {
            return Err(GuardUrlError::NotDistinct);
        }

        Ok(Self { focus, sleep })
    }

    pub fn page(&self, kind: GuardKind) -> &Url {
        match kind {
            GuardKind::Focus => &self.focus,
            GuardKind::Sleep => &self.sleep,
        }
    }

    /// Build the redirect URL for a blocked destination
    pub fn redirect_url(&self, kind: GuardKind, original: &str) -> String {
        let mut url = self.page(kind).clone();
        url.query_pairs_mut().append_pair(TARGET_PARAM, original);
        url.into()
    }

    /// Which guard page (if any) a URL points at. Query and fragment are ignored.
    pub fn classify(&self, url: &str) -> Option<GuardKind> {
        let parsed = Url::parse(url).ok()?;
        if same_page(&parsed, &self.focus) {
            Some(GuardKind::Focus)
        } else if same_page(&parsed, &self.sleep) {
            Some(GuardKind::Sleep)
        } else {
            None
        }
    }

    pub fn is_guard_page(&self, url: &str) -> bool {
        self.classify(url).is_some()
    }
}

impl Default for GuardPages {
    fn default() -> Self {
        Self {
            focus: Url::parse(DEFAULT_FOCUS_GUARD_URL).expect("default focus guard URL is valid"),
            sleep: Url::parse(DEFAULT_SLEEP_GUARD_URL).expect("default sleep guard URL is valid"),
        }
    }
}

/// Decode the original destination carried by a guard page URL.
///
/// Returns `None` if the URL doesn't parse or carries no non-empty `target`.
pub fn guard_target(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(name, _)| name == TARGET_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

fn parse_base(kind: GuardKind, raw: &str) -> Result<Url, GuardUrlError> {
    let mut url = Url::parse(raw).map_err(|source| GuardUrlError::Invalid {
        kind,
        url: raw.to_string(),
        source,
    })?;
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn same_page(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port() == b.port()
        && a.path() == b.path()
}
