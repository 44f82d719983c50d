//! Configuration parsing and validation for focuswardd
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Service timing and guard page locations
//! - Policy defaults for keys the store doesn't hold yet
//! - Validation with clear error messages
//!
//! The set of blockable sites is built in; see [`SiteRuleSet::builtin`].

mod policy;
mod schema;
mod sites;
mod validation;

pub use policy::*;
pub use schema::*;
pub use sites::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<FocusConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Load configuration, falling back to built-in defaults if the file doesn't exist.
///
/// A file that exists but fails to parse or validate is still an error.
pub fn load_config_or_default(path: impl AsRef<Path>) -> ConfigResult<FocusConfig> {
    let path = path.as_ref();
    if !path.exists() {
        info!(path = %path.display(), "No config file, using built-in defaults");
        return Ok(FocusConfig::default());
    }
    load_config(path)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<FocusConfig> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let sites = SiteRuleSet::builtin();
    let errors = validate_config(&raw, &sites);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    let config = FocusConfig::from_raw(raw, sites);
    if config.defaults.sleep_start_seconds == config.defaults.sleep_end_seconds {
        warn!("Sleep window start equals end; the window will never be active");
    }

    Ok(config)
}
