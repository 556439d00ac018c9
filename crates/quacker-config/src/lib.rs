//! Quacker configuration system.
//!
//! TOML-based configuration for the duck network client. Every section
//! uses serde defaults so a partial (or empty) file works out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use quacker_config::{load_config, config_to_json};
//!
//! let config = load_config().expect("failed to load config");
//! println!("{}", config_to_json(&config));
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{LogLevel, LoggingConfig, QuackerConfig, RealtimeSection, CONFIG_SCHEMA_VERSION};
pub use toml_loader::{load_default, load_from_path};

use quacker_common::ConfigError;
use std::path::Path;

/// Load config from the platform default path and validate it.
///
/// Creates a commented default file if none exists yet.
pub fn load_config() -> Result<QuackerConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Load config from an explicit path when given, else the platform default.
pub fn load_config_from(path: Option<&Path>) -> Result<QuackerConfig, ConfigError> {
    match path {
        Some(path) => {
            let config = toml_loader::load_from_path(path)?;
            validation::validate(&config)?;
            Ok(config)
        }
        None => load_config(),
    }
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &QuackerConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
