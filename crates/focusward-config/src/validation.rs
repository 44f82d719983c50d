//! Configuration validation

use focusward_api::GuardPages;
use focusward_util::{SiteKey, SECONDS_PER_DAY};
use thiserror::Error;

use crate::schema::RawConfig;
use crate::sites::SiteRuleSet;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Invalid time format '{value}': {message}")]
    InvalidTimeFormat { value: String, message: String },

    #[error("Unknown site '{0}' in defaults.blocked")]
    UnknownSite(String),

    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },

    #[error("Invalid guard pages: {0}")]
    GuardPages(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig, sites: &SiteRuleSet) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    // Sleep window
    for value in [&config.defaults.sleep_start, &config.defaults.sleep_end]
        .into_iter()
        .flatten()
    {
        if let Err(message) = parse_time_of_day(value) {
            errors.push(ValidationError::InvalidTimeFormat {
                value: value.clone(),
                message,
            });
        }
    }

    // Durations
    let positive = [
        ("defaults.unlock_duration_seconds", config.defaults.unlock_duration_seconds),
        ("service.reconcile_interval_ms", config.service.reconcile_interval_ms),
        ("service.tamper_interval_ms", config.service.tamper_interval_ms),
        ("service.request_timeout_ms", config.service.request_timeout_ms),
        (
            "service.tamper_reports_per_second",
            config.service.tamper_reports_per_second.map(u64::from),
        ),
    ];
    for (field, value) in positive {
        if value == Some(0) {
            errors.push(ValidationError::ZeroValue { field });
        }
    }

    // Blocked sites must exist
    for site in &config.defaults.blocked {
        if !sites.contains(&SiteKey::new(site.as_str())) {
            errors.push(ValidationError::UnknownSite(site.clone()));
        }
    }

    // Guard pages
    if config.service.focus_guard_url.is_some() || config.service.sleep_guard_url.is_some() {
        let defaults = GuardPages::default();
        let focus = config
            .service
            .focus_guard_url
            .clone()
            .unwrap_or_else(|| defaults.page(focusward_api::GuardKind::Focus).to_string());
        let sleep = config
            .service
            .sleep_guard_url
            .clone()
            .unwrap_or_else(|| defaults.page(focusward_api::GuardKind::Sleep).to_string());

        if let Err(e) = GuardPages::new(&focus, &sleep) {
            errors.push(ValidationError::GuardPages(e.to_string()));
        }
    }

    errors
}

/// Parse `HH:MM` or `HH:MM:SS` into seconds since midnight
pub fn parse_time_of_day(s: &str) -> Result<u32, String> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    if parts.len() != 2 && parts.len() != 3 {
        return Err("Expected HH:MM or HH:MM:SS format".into());
    }

    let hour: u32 = parts[0].parse().map_err(|_| "Invalid hour".to_string())?;
    let minute: u32 = parts[1].parse().map_err(|_| "Invalid minute".to_string())?;
    let second: u32 = match parts.get(2) {
        Some(s) => s.parse().map_err(|_| "Invalid second".to_string())?,
        None => 0,
    };

    if hour >= 24 {
        return Err("Hour must be 0-23".into());
    }
    if minute >= 60 {
        return Err("Minute must be 0-59".into());
    }
    if second >= 60 {
        return Err("Second must be 0-59".into());
    }

    let total = hour * 3600 + minute * 60 + second;
    debug_assert!(total < SECONDS_PER_DAY);
    Ok(total)
}
