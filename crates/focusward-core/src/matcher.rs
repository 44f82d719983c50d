//! Rule matching: does a URL belong to an enforced site?

use focusward_api::BlockedFlags;
use focusward_config::{SiteRule, SiteRuleSet};
use url::Url;

/// Whether `url` matches any rule of a site whose flag is set.
///
/// Unparsable URLs and URLs without a host are never blocked.
pub fn is_blocked(url: &str, flags: &BlockedFlags, sites: &SiteRuleSet) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str().map(normalize_host) else {
        return false;
    };
    let path = parsed.path().to_lowercase();

    flags
        .iter()
        .filter(|(_, enabled)| **enabled)
        .filter_map(|(site, _)| sites.get(site))
        .flatten()
        .any(|rule| rule_matches(rule, &host, &path))
}

/// Lowercased host of a URL, if it has one
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(normalize_host))
}

/// `reddit.com.` and `reddit.com` name the same host
fn normalize_host(host: &str) -> String {
    let host = host.strip_suffix('.').unwrap_or(host);
    host.to_ascii_lowercase()
}

fn rule_matches(rule: &SiteRule, host: &str, path: &str) -> bool {
    let domain = rule.domain_str();
    let host_ok = host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|rest| rest.ends_with('.'));

    host_ok && rule.path_prefix().is_none_or(|prefix| path.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use focusward_util::SiteKey;

    fn flags(enabled: &[&str]) -> BlockedFlags {
        SiteRuleSet::builtin()
            .keys()
            .map(|k| (k.clone(), enabled.contains(&k.as_str())))
            .collect()
    }

    #[test]
    fn malformed_urls_fail_open() {
        let all = flags(&["shorts", "instagram", "x", "reddit"]);
        let sites = SiteRuleSet::builtin();

        for url in ["", "reddit.com", "not a url", "http://", "https://[::1"] {
            assert!(!is_blocked(url, &all, &sites), "{url}");
        }
    }

    #[test]
    fn domain_and_subdomains_match() {
        let sites = SiteRuleSet::builtin();
        let f = flags(&["reddit"]);

        assert!(is_blocked("https://reddit.com/", &f, &sites));
        assert!(is_blocked("https://old.reddit.com/r/rust", &f, &sites));
        assert!(is_blocked("https://WWW.Reddit.COM/", &f, &sites));
        assert!(!is_blocked("https://notreddit.com/", &f, &sites));
        assert!(!is_blocked("https://reddit.com.evil.net/", &f, &sites));
    }

    #[test]
    fn fully_qualified_hosts_match() {
        let sites = SiteRuleSet::builtin();
        let f = flags(&["reddit"]);

        assert!(is_blocked("https://reddit.com./r/all", &f, &sites));
        assert!(is_blocked("https://old.reddit.com./r/rust", &f, &sites));
        assert!(!is_blocked("https://notreddit.com./", &f, &sites));
        assert_eq!(host_of("https://Reddit.com./r"), Some("reddit.com".into()));
    }

    #[test]
    fn path_prefix_is_case_insensitive() {
        let sites = SiteRuleSet::builtin();
        let f = flags(&["shorts"]);

        assert!(is_blocked("https://www.youtube.com/shorts/abc", &f, &sites));
        assert!(is_blocked("https://m.youtube.com/SHORTS/abc", &f, &sites));
        assert!(!is_blocked("https://www.youtube.com/watch?v=abc", &f, &sites));
    }

    #[test]
    fn disabled_sites_never_match() {
        let sites = SiteRuleSet::builtin();
        let f = flags(&["reddit"]);

        assert!(!is_blocked("https://x.com/home", &f, &sites));
        assert!(!is_blocked("https://twitter.com/", &f, &SiteRuleSet::default()));
        assert!(!is_blocked("https://reddit.com/", &BlockedFlags::new(), &sites));
    }

    #[test]
    fn unknown_flag_keys_are_ignored() {
        let sites = SiteRuleSet::builtin();
        let mut f = BlockedFlags::new();
        f.insert(SiteKey::new("tiktok"), true);

        assert!(!is_blocked("https://tiktok.com/", &f, &sites));
    }

    #[test]
    fn custom_rule_set() {
        let sites = SiteRuleSet::from_rules([(
            "video",
            vec![SiteRule::domain("video.example.com")],
        )]);
        let mut f = BlockedFlags::new();
        f.insert(SiteKey::new("video"), true);

        assert!(is_blocked("https://video.example.com/watch", &f, &sites));
        assert!(!is_blocked("https://example.com/watch", &f, &sites));
    }

    #[test]
    fn host_extraction() {
        assert_eq!(host_of("https://Old.Reddit.com/r"), Some("old.reddit.com".into()));
        assert_eq!(host_of("about:blank"), None);
    }
}
