//! Time utilities for focusward
//!
//! The policy store records instants as milliseconds since the Unix epoch
//! (the browser's `Date.now()` unit), while the sleep window is expressed in
//! seconds since local midnight. This module converts between the two.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `FOCUSWARD_MOCK_TIME` environment variable can be set
//! to override the system time for all time-sensitive operations. This is useful
//! for exercising the sleep window without waiting for midnight.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 23:30:00`)

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Timelike};
use std::sync::OnceLock;
use std::time::Duration;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "FOCUSWARD_MOCK_TIME";

/// Number of seconds in a day; seconds-of-day values are in `0..SECONDS_PER_DAY`
pub const SECONDS_PER_DAY: u32 = 86_400;

/// Milliseconds since the Unix epoch
pub type EpochMillis = u64;

/// Cached mock time offset from the real time when the process started.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Local::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match NaiveDateTime::parse_from_str(&mock_time_str, "%Y-%m-%d %H:%M:%S") {
                    Ok(naive_dt) => {
                        if let Some(mock_dt) = Local.from_local_datetime(&naive_dt).single() {
                            let offset = mock_dt.signed_duration_since(chrono::Local::now());
                            tracing::info!(
                                mock_time = %mock_time_str,
                                offset_secs = offset.num_seconds(),
                                "Mock time enabled"
                            );
                            return Some(offset);
                        }
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            "Failed to convert mock time to local timezone"
                        );
                    }
                    Err(_) => {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            expected_format = "%Y-%m-%d %H:%M:%S",
                            "Invalid mock time format"
                        );
                    }
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Get the current local time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    match get_mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// Current time in epoch milliseconds (mock-aware).
pub fn now_ms() -> EpochMillis {
    to_epoch_ms(&now())
}

/// Convert a local datetime to epoch milliseconds, clamping pre-epoch times to zero.
pub fn to_epoch_ms(dt: &DateTime<Local>) -> EpochMillis {
    dt.timestamp_millis().max(0) as EpochMillis
}

/// Convert epoch milliseconds to a local datetime.
pub fn from_epoch_ms(ms: EpochMillis) -> Option<DateTime<Local>> {
    let ms = i64::try_from(ms).ok()?;
    Local.timestamp_millis_opt(ms).single()
}

/// Seconds since local midnight for the given instant.
///
/// Returns `None` only for instants chrono cannot represent.
pub fn seconds_of_day(ms: EpochMillis) -> Option<u32> {
    from_epoch_ms(ms).map(|dt| dt.time().num_seconds_from_midnight())
}

/// Format seconds-of-day as `HH:MM:SS`.
pub fn format_seconds_of_day(secs: u32) -> String {
    let secs = secs % SECONDS_PER_DAY;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Helper to format durations in human-readable form
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
