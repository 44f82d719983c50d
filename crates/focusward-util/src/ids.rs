//! Strongly-typed identifiers for focusward

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identifier for a blockable site (e.g. "shorts", "reddit")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteKey(String);

impl SiteKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SiteKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SiteKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Browser-assigned tab identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(i64);

impl TabId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TabId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Correlation id for a request sent to the browser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_key_equality() {
        let a = SiteKey::new("reddit");
        let b = SiteKey::from("reddit");
        let c = SiteKey::new("x");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn request_id_uniqueness() {
        assert_ne!(RequestId::new(), RequestId::new());
    }

    #[test]
    fn ids_serialize_transparently() {
        let key = SiteKey::new("shorts");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"shorts\"");

        let tab = TabId::new(42);
        assert_eq!(serde_json::to_string(&tab).unwrap(), "42");
        let parsed: TabId = serde_json::from_str("42").unwrap();
        assert_eq!(parsed, tab);

        let id = RequestId::new();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: RequestId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}
