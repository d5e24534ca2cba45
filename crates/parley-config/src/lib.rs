// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for Parley.
//!
//! TOML files plus `PARLEY_*` environment overrides, merged with Figment,
//! checked with `deny_unknown_fields` and a semantic validation pass, and
//! reported as miette diagnostics.
//!
//! ```no_run
//! let config = parley_config::load_and_validate().expect("config errors");
//! println!("listening on {}:{}", config.gateway.host, config.gateway.port);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::ParleyConfig;

/// Load configuration from the standard hierarchy and validate it.
pub fn load_and_validate() -> Result<ParleyConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => validated(config),
        Err(err) => Err(diagnostic::figment_to_config_errors(
            err,
            &collect_toml_sources(),
        )),
    }
}

/// Load configuration from one explicit file (plus env vars) and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<ParleyConfig, Vec<ConfigError>> {
    match loader::load_config_from_path(path) {
        Ok(config) => validated(config),
        Err(err) => {
            let sources = std::fs::read_to_string(path)
                .map(|content| vec![(path.display().to_string(), content)])
                .unwrap_or_default();
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<ParleyConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => validated(config),
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

fn validated(config: ParleyConfig) -> Result<ParleyConfig, Vec<ConfigError>> {
    validation::validate_config(&config)?;
    Ok(config)
}

fn collect_toml_sources() -> Vec<(String, String)> {
    let local = std::env::current_dir()
        .map(|d| d.join(loader::LOCAL_CONFIG))
        .unwrap_or_else(|_| loader::LOCAL_CONFIG.into());
    [
        local,
        loader::user_config_path(),
        Path::new(loader::SYSTEM_CONFIG).to_path_buf(),
    ]
    .into_iter()
    .filter_map(|path| {
        std::fs::read_to_string(&path)
            .ok()
            .map(|content| (path.display().to_string(), content))
    })
    .collect()
}
