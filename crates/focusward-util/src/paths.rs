//! Default paths for focusward components
//!
//! Paths are user-writable (the daemon runs as the browser's child process):
//! - Config: `$XDG_CONFIG_HOME/focusward/config.toml` or `~/.config/focusward/config.toml`
//! - Data: `$XDG_DATA_HOME/focusward` or `~/.local/share/focusward`

use std::path::PathBuf;

/// Application subdirectory name
const APP_DIR: &str = "focusward";

/// Config filename within the config directory
const CONFIG_FILENAME: &str = "config.toml";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$XDG_CONFIG_HOME/focusward/config.toml` (if XDG_CONFIG_HOME is set)
/// 2. `~/.config/focusward/config.toml` (fallback)
///
/// `FOCUSWARD_CONFIG` is handled by the CLI layer.
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME)
}

/// Get the default data directory.
///
/// `$XDG_DATA_HOME/focusward`, else `~/.local/share/focusward`.
/// `FOCUSWARD_DATA_DIR` is handled by the CLI layer.
pub fn default_data_dir() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}
