// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for Switchboard.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, environment variable overrides, and miette
//! diagnostics with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use switchboard_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("listening on {}:{}", config.server.host, config.server.port);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::SwitchboardConfig;

/// Load configuration from the XDG hierarchy and validate it.
///
/// Figment errors become diagnostics pointing into whichever config file
/// introduced the bad key.
pub fn load_and_validate() -> Result<SwitchboardConfig, Vec<ConfigError>> {
    let config = loader::load_config()
        .map_err(|err| diagnostic::figment_to_config_errors(err, &collect_toml_sources()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// Load configuration from an explicit file (plus env overrides) and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<SwitchboardConfig, Vec<ConfigError>> {
    let config = loader::load_config_from_path(path).map_err(|err| {
        let sources: Vec<_> = std::fs::read_to_string(path)
            .map(|content| vec![(path.display().to_string(), content)])
            .unwrap_or_default();
        diagnostic::figment_to_config_errors(err, &sources)
    })?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<SwitchboardConfig, Vec<ConfigError>> {
    let config = loader::load_config_from_str(toml_content).map_err(|err| {
        let sources = [("<inline>".to_string(), toml_content.to_string())];
        diagnostic::figment_to_config_errors(err, &sources)
    })?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// Contents of every config file in the hierarchy that exists.
fn collect_toml_sources() -> Vec<(String, String)> {
    let local = std::env::current_dir()
        .map(|d| d.join(loader::CONFIG_FILE_NAME))
        .unwrap_or_else(|_| loader::CONFIG_FILE_NAME.into());

    [
        Some(local),
        loader::user_config_path(),
        Some(loader::SYSTEM_CONFIG_PATH.into()),
    ]
    .into_iter()
    .flatten()
    .filter_map(|path| {
        let content = std::fs::read_to_string(&path).ok()?;
        Some((path.display().to_string(), content))
    })
    .collect()
}
