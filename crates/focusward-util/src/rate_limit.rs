//! Rate limiting utilities

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::TabId;

/// Simple token-bucket rate limiter keyed by tab
#[derive(Debug)]
pub struct RateLimiter {
    /// Maximum tokens (reports) per bucket
    max_tokens: u32,
    /// How often tokens are replenished
    refill_interval: Duration,
    /// Per-tab state
    tabs: HashMap<TabId, TabBucket>,
}

#[derive(Debug)]
struct TabBucket {
    tokens: u32,
    last_refill: Instant,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// # Arguments
    /// * `max_requests` - Maximum reports allowed per interval
    /// * `interval` - Time interval for the limit
    pub fn new(max_requests: u32, interval: Duration) -> Self {
        Self {
            max_tokens: max_requests,
            refill_interval: interval,
            tabs: HashMap::new(),
        }
    }

    /// Check if a report from the given tab should be processed
    ///
    /// Returns `true` if allowed, `false` if rate limited
    pub fn check(&mut self, tab_id: TabId) -> bool {
        self.check_at(tab_id, Instant::now())
    }

    fn check_at(&mut self, tab_id: TabId, now: Instant) -> bool {
        let bucket = self.tabs.entry(tab_id).or_insert(TabBucket {
            tokens: self.max_tokens,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill);
        if elapsed >= self.refill_interval {
            let intervals = (elapsed.as_millis() / self.refill_interval.as_millis().max(1)) as u32;
            bucket.tokens = bucket
                .tokens
                .saturating_add(intervals.saturating_mul(self.max_tokens))
                .min(self.max_tokens);
            bucket.last_refill = now;
        }

        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Forget a tab's state (e.g. after it closed)
    pub fn remove_tab(&mut self, tab_id: TabId) {
        self.tabs.remove(&tab_id);
    }

    /// Clean up stale tab entries
    pub fn cleanup(&mut self, stale_after: Duration) {
        let now = Instant::now();
        self.tabs
            .retain(|_, bucket| now.duration_since(bucket.last_refill) < stale_after);
    }
}
