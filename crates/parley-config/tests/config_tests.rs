// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the configuration system.

use parley_config::diagnostic::ConfigError;
use parley_config::model::ParleyConfig;
use parley_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[agent]
name = "helper"
log_level = "debug"
locale = "en-AU"

[anthropic]
api_key = "sk-ant-123"
max_tokens = 1024

[storage]
database_path = "/tmp/parley-test.db"
wal_mode = false

[search]
backends = ["tavily", "brave"]
brave_api_key = "brv"
result_count = 4
prewarm_result_count = 2
cache_ttl_secs = 120

[memory]
recall_limit = 3
extraction_enabled = false

[streaming]
buffer_threshold = 20

[gateway]
host = "0.0.0.0"
port = 8080
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.agent.name, "helper");
    assert_eq!(config.agent.locale, "en-AU");
    assert_eq!(config.anthropic.api_key.as_deref(), Some("sk-ant-123"));
    assert_eq!(config.anthropic.max_tokens, 1024);
    assert!(!config.storage.wal_mode);
    assert_eq!(config.search.backends, vec!["tavily", "brave"]);
    assert_eq!(config.search.result_count, 4);
    assert_eq!(config.search.cache_ttl_secs, 120);
    assert_eq!(config.memory.recall_limit, 3);
    assert!(!config.memory.extraction_enabled);
    assert_eq!(config.streaming.buffer_threshold, 20);
    assert_eq!(config.streaming.batch_size, 2);
    assert_eq!(config.gateway.port, 8080);
}

#[test]
fn empty_toml_yields_defaults() {
    let config = load_config_from_str("").unwrap();
    let defaults = ParleyConfig::default();
    assert_eq!(config.agent.name, defaults.agent.name);
    assert!(config.search.enabled);
    assert_eq!(config.search.cache_ttl_secs, 600);
    assert_eq!(config.memory.cache_ttl_secs, 300);
    assert_eq!(config.streaming.forced_interval, 10);
}

#[test]
fn unknown_key_gets_suggestion() {
    let toml = r#"
[search]
reslt_count = 3
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "reslt_count");
            assert_eq!(suggestion.as_deref(), Some("result_count"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[gateway]
port = "eighty"
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(matches!(errors[0], ConfigError::InvalidType { .. }));
}

#[test]
fn semantic_errors_surface_through_loader() {
    let toml = r#"
[search]
backends = ["altavista"]
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(errors[0].to_string().contains("altavista"));
}

#[test]
fn env_overrides_file_values() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "custom.toml",
            r#"
[search]
brave_api_key = "from-file"
result_count = 4
"#,
        )?;
        jail.set_env("PARLEY_SEARCH_BRAVE_API_KEY", "from-env");
        jail.set_env("PARLEY_GATEWAY_PORT", "9191");

        let config = load_and_validate_path(std::path::Path::new("custom.toml"))
            .map_err(|errors| errors[0].to_string())?;
        assert_eq!(config.search.brave_api_key.as_deref(), Some("from-env"));
        assert_eq!(config.search.result_count, 4);
        assert_eq!(config.gateway.port, 9191);
        Ok(())
    });
}
