// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation.
//!
//! Collects every violation instead of stopping at the first one.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::ParleyConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const KNOWN_BACKENDS: &[&str] = &["brave", "tavily"];

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &ParleyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "agent.log_level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            config.agent.log_level
        )));
    }

    if config.agent.fallback_reply.trim().is_empty() {
        errors.push(ConfigError::validation("agent.fallback_reply must not be empty"));
    }

    if config.anthropic.max_tokens == 0 {
        errors.push(ConfigError::validation("anthropic.max_tokens must be positive"));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation("storage.database_path must not be empty"));
    }

    if config.cache.max_entries == 0 {
        errors.push(ConfigError::validation("cache.max_entries must be positive"));
    }

    validate_search(config, &mut errors);

    if config.memory.recall_limit == 0 {
        errors.push(ConfigError::validation("memory.recall_limit must be positive"));
    }

    if config.streaming.batch_size == 0 || config.streaming.forced_interval == 0 {
        errors.push(ConfigError::validation(
            "streaming.batch_size and streaming.forced_interval must be positive",
        ));
    }

    if config.streaming.channel_capacity == 0 {
        errors.push(ConfigError::validation(
            "streaming.channel_capacity must be positive",
        ));
    }

    let host = config.gateway.host.trim();
    let is_ip = host.parse::<std::net::IpAddr>().is_ok();
    let is_hostname = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if !is_ip && !is_hostname {
        errors.push(ConfigError::validation(format!(
            "gateway.host `{host}` is not a valid IP address or hostname"
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_search(config: &ParleyConfig, errors: &mut Vec<ConfigError>) {
    let search = &config.search;
    let mut seen = HashSet::new();
    for name in &search.backends {
        if !KNOWN_BACKENDS.contains(&name.as_str()) {
            errors.push(ConfigError::validation(format!(
                "search.backends: unknown backend `{name}` (known: {})",
                KNOWN_BACKENDS.join(", ")
            )));
        }
        if !seen.insert(name) {
            errors.push(ConfigError::validation(format!(
                "search.backends lists `{name}` more than once"
            )));
        }
    }

    if search.result_count == 0 {
        errors.push(ConfigError::validation("search.result_count must be positive"));
    }

    if search.prewarm_result_count == 0 || search.prewarm_result_count > search.result_count {
        errors.push(ConfigError::validation(format!(
            "search.prewarm_result_count must be between 1 and result_count ({}), got {}",
            search.result_count, search.prewarm_result_count
        )));
    }

    if !(1..=3).contains(&search.max_related_queries) {
        errors.push(ConfigError::validation(format!(
            "search.max_related_queries must be between 1 and 3, got {}",
            search.max_related_queries
        )));
    }

    if search.content_max_chars < 50 {
        errors.push(ConfigError::validation(
            "search.content_max_chars must be at least 50",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&ParleyConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = ParleyConfig::default();
        config.agent.log_level = "loud".into();
        config.search.backends = vec!["brave".into(), "bing".into(), "brave".into()];
        config.streaming.batch_size = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn prewarm_cannot_exceed_result_count() {
        let mut config = ParleyConfig::default();
        config.search.result_count = 2;
        config.search.prewarm_result_count = 3;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("prewarm_result_count"));
    }

    #[test]
    fn bad_host_rejected() {
        let mut config = ParleyConfig::default();
        config.gateway.host = "not a host!".into();
        assert!(validate_config(&config).is_err());
    }
}
