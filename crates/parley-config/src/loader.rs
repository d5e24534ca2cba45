// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered config loading with Figment.
//!
//! Lookup order: `./parley.toml` > `~/.config/parley/parley.toml` >
//! `/etc/parley/parley.toml`, with `PARLEY_*` environment variables on top.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ParleyConfig;

/// Top-level sections, used to split env var names into `section.key`.
const SECTIONS: &[&str] = &[
    "agent",
    "anthropic",
    "storage",
    "cache",
    "search",
    "memory",
    "streaming",
    "gateway",
];

pub(crate) const SYSTEM_CONFIG: &str = "/etc/parley/parley.toml";
pub(crate) const LOCAL_CONFIG: &str = "parley.toml";

pub(crate) fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("parley").join("parley.toml"))
        .unwrap_or_default()
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/parley/parley.toml`
/// 3. `~/.config/parley/parley.toml`
/// 4. `./parley.toml`
/// 5. `PARLEY_*` environment variables
pub fn load_config() -> Result<ParleyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ParleyConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<ParleyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ParleyConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file, with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ParleyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ParleyConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// `PARLEY_*` variables, keyed by their lowercased config path.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("PARLEY_").map(|key| map_env_key(&key.as_str().to_ascii_lowercase()).into())
}

/// Maps a lowercased, prefix-stripped env var name onto a config path.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `search_brave_api_key` maps to `search.brave_api_key`.
pub fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
