//! Built-in site rule set
//!
//! The set of blockable destinations is fixed at build time. Users only
//! toggle which sites are enforced (the `blockedFlags` policy key).

use focusward_util::SiteKey;
use std::collections::BTreeMap;

/// One match rule: a domain (and its subdomains) plus an optional path prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRule {
    domain: String,
    path_prefix: Option<String>,
}

impl SiteRule {
    pub fn domain(domain: &str) -> Self {
        Self {
            domain: domain.to_ascii_lowercase(),
            path_prefix: None,
        }
    }

    pub fn with_path(domain: &str, path_prefix: &str) -> Self {
        Self {
            domain: domain.to_ascii_lowercase(),
            path_prefix: Some(path_prefix.to_lowercase()),
        }
    }

    /// Lowercased domain
    pub fn domain_str(&self) -> &str {
        &self.domain
    }

    /// Lowercased path prefix, if any
    pub fn path_prefix(&self) -> Option<&str> {
        self.path_prefix.as_deref()
    }
}

/// Mapping from site key to its ordered match rules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteRuleSet {
    sites: BTreeMap<SiteKey, Vec<SiteRule>>,
}

impl SiteRuleSet {
    /// The distraction sites focusward ships with
    pub fn builtin() -> Self {
        Self::from_rules([
            ("shorts", vec![SiteRule::with_path("youtube.com", "/shorts")]),
            ("instagram", vec![SiteRule::domain("instagram.com")]),
            ("x", vec![SiteRule::domain("x.com"), SiteRule::domain("twitter.com")]),
            ("reddit", vec![SiteRule::domain("reddit.com")]),
        ])
    }

    pub fn from_rules<K, I>(rules: I) -> Self
    where
        K: Into<SiteKey>,
        I: IntoIterator<Item = (K, Vec<SiteRule>)>,
    {
        Self {
            sites: rules.into_iter().map(|(k, r)| (k.into(), r)).collect(),
        }
    }

    pub fn get(&self, site: &SiteKey) -> Option<&[SiteRule]> {
        self.sites.get(site).map(Vec::as_slice)
    }

    pub fn contains(&self, site: &SiteKey) -> bool {
        self.sites.contains_key(site)
    }

    pub fn keys(&self) -> impl Iterator<Item = &SiteKey> {
        self.sites.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SiteKey, &[SiteRule])> {
        self.sites.iter().map(|(k, r)| (k, r.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}
