//! One-visit passes for individual tabs

use focusward_api::CheckContext;
use focusward_util::TabId;
use std::collections::HashMap;

use crate::host_of;

#[derive(Debug)]
struct Pass {
    host: String,
    visited: bool,
}

/// Single visits a tab may make without an unlock.
///
/// A pass is handed out when a tab is released from the focus guard while
/// timed unlocks are off. The first fresh navigation to its host uses it up;
/// later checks of that same page load still pass. The next fresh
/// navigation, or any sight of the tab on another host, ends it.
#[derive(Debug, Default)]
pub struct TabPasses {
    passes: HashMap<TabId, Pass>,
}

impl TabPasses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `tab_id` one upcoming navigation to the host of `url`
    pub fn grant(&mut self, tab_id: TabId, url: &str) -> bool {
        self.insert(tab_id, url, false)
    }

    /// Allow `tab_id` to keep the page at `url` it is already showing
    pub fn grant_current(&mut self, tab_id: TabId, url: &str) -> bool {
        self.insert(tab_id, url, true)
    }

    fn insert(&mut self, tab_id: TabId, url: &str, visited: bool) -> bool {
        match host_of(url) {
            Some(host) => {
                self.passes.insert(tab_id, Pass { host, visited });
                true
            }
            None => false,
        }
    }

    /// Drop the tab's pass if `url` is on another host
    pub fn observe(&mut self, tab_id: TabId, url: &str) {
        let elsewhere = self
            .passes
            .get(&tab_id)
            .is_some_and(|pass| host_of(url).as_deref() != Some(pass.host.as_str()));
        if elsewhere {
            self.passes.remove(&tab_id);
        }
    }

    /// Whether the tab may see `url` in `context`. A fresh navigation
    /// spends the visit; a second one ends the pass.
    pub fn admit(&mut self, tab_id: TabId, url: &str, context: CheckContext) -> bool {
        self.observe(tab_id, url);
        let Some(pass) = self.passes.get_mut(&tab_id) else {
            return false;
        };

        if context != CheckContext::Navigating {
            return true;
        }
        if pass.visited {
            self.passes.remove(&tab_id);
            return false;
        }
        pass.visited = true;
        true
    }

    /// Whether the tab's current page is covered, without spending anything
    pub fn covers(&mut self, tab_id: TabId, url: &str) -> bool {
        self.observe(tab_id, url);
        self.passes.contains_key(&tab_id)
    }

    pub fn remove_tab(&mut self, tab_id: TabId) {
        self.passes.remove(&tab_id);
    }

    pub fn clear(&mut self) {
        self.passes.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_covers_one_visit() {
        let mut passes = TabPasses::new();
        let tab = TabId::new(1);
        let url = "https://www.reddit.com/r/rust";

        assert!(passes.grant(tab, url));
        assert!(passes.admit(tab, url, CheckContext::Navigating));
        assert!(passes.admit(tab, url, CheckContext::SoftCheck));
        assert!(passes.covers(tab, url));
        assert!(!passes.admit(TabId::new(2), url, CheckContext::Navigating));

        assert!(!passes.admit(tab, "https://www.reddit.com/r/other", CheckContext::Navigating));
        assert!(!passes.admit(tab, url, CheckContext::SoftCheck));
        assert!(passes.is_empty());
    }

    #[test]
    fn leaving_the_host_ends_the_pass() {
        let mut passes = TabPasses::new();
        let tab = TabId::new(1);

        passes.grant(tab, "https://www.reddit.com/");
        passes.observe(tab, "https://example.com/");
        assert!(!passes.admit(tab, "https://www.reddit.com/", CheckContext::Navigating));
        assert!(passes.is_empty());
    }

    #[test]
    fn current_page_pass_has_no_fresh_visit_left() {
        let mut passes = TabPasses::new();
        let tab = TabId::new(1);
        let url = "https://www.reddit.com/r/rust";

        assert!(passes.grant_current(tab, url));
        assert!(passes.admit(tab, url, CheckContext::SoftCheck));
        assert!(!passes.admit(tab, url, CheckContext::Navigating));
    }

    #[test]
    fn hostless_urls_get_no_pass() {
        let mut passes = TabPasses::new();
        assert!(!passes.grant(TabId::new(1), "about:blank"));
        assert!(passes.is_empty());
    }
}
