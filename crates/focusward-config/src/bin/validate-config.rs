//! Config validation CLI tool
//!
//! Validates a focusward configuration file and reports any errors.

use focusward_api::GuardKind;
use focusward_util::{default_config_path, format_seconds_of_day};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a focusward configuration file.");
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match focusward_config::load_config(&config_path) {
        Ok(config) => {
            let defaults = &config.defaults;
            let service = &config.service;

            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", focusward_config::CURRENT_CONFIG_VERSION);
            println!(
                "  Sleep window: {} - {} ({})",
                format_seconds_of_day(defaults.sleep_start_seconds),
                format_seconds_of_day(defaults.sleep_end_seconds),
                if defaults.sleep_enabled { "enabled" } else { "disabled" }
            );
            println!(
                "  Unlock: {} ({})",
                focusward_util::format_duration(Duration::from_millis(defaults.unlock_duration_ms)),
                if defaults.unlock_enabled { "enabled" } else { "disabled" }
            );
            println!("  Focus guard: {}", service.guard_pages.page(GuardKind::Focus));
            println!("  Sleep guard: {}", service.guard_pages.page(GuardKind::Sleep));
            println!();
            println!("Sites:");
            for (site, rules) in config.sites.iter() {
                let marker = if defaults.blocked.contains(site) { "*" } else { " " };
                let patterns: Vec<String> = rules
                    .iter()
                    .map(|r| format!("{}{}", r.domain_str(), r.path_prefix().unwrap_or("")))
                    .collect();
                println!("  {} {}: {}", marker, site, patterns.join(", "));
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                focusward_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                focusward_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                focusward_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                focusward_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        focusward_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
