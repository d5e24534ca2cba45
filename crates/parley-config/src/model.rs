// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a mistyped key fails
//! at startup instead of being silently ignored.

use serde::{Deserialize, Serialize};

/// Top-level Parley configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParleyConfig {
    /// Assistant identity and prompt settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Anthropic API settings.
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Primary store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Process-wide TTL cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Web search grounding settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Long-term memory settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Token batching for streamed replies.
    #[serde(default)]
    pub streaming: StreamingConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Assistant identity and prompt configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the assistant.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Inline base instruction. A default persona is used when unset.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Locale stamped into the base instruction (BCP 47).
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Stored as the assistant message when a turn produced no text.
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            system_prompt: None,
            locale: default_locale(),
            fallback_reply: default_fallback_reply(),
        }
    }
}

fn default_agent_name() -> String {
    "parley".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_locale() -> String {
    "en-US".to_string()
}

fn default_fallback_reply() -> String {
    "Sorry, I wasn't able to produce a response this time. Please try again.".to_string()
}

/// Anthropic API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnthropicConfig {
    /// API key. `None` falls back to the `ANTHROPIC_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Value sent as the `anthropic-version` header.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Model used when a request does not name one.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Cheaper model for titles and memory extraction.
    #[serde(default = "default_utility_model")]
    pub utility_model: String,

    /// Maximum tokens to generate per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Messages endpoint URL.
    #[serde(default = "default_anthropic_url")]
    pub base_url: String,

    /// Whole-request timeout in seconds.
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_version: default_api_version(),
            default_model: default_model(),
            utility_model: default_utility_model(),
            max_tokens: default_max_tokens(),
            base_url: default_anthropic_url(),
            timeout_secs: default_provider_timeout(),
        }
    }
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_utility_model() -> String {
    "claude-haiku-4-5-20251001".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_anthropic_url() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}

fn default_provider_timeout() -> u64 {
    300
}

/// Primary store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL journal mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("parley").join("parley.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("parley.db"))
        .display()
        .to_string()
}

fn default_true() -> bool {
    true
}

/// Process-wide TTL cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Upper bound on entries per cache instance.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

fn default_max_entries() -> usize {
    10_000
}

/// Web search grounding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// Master switch. When false, turns are never web-grounded.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Backend names in the order they are tried.
    #[serde(default = "default_backends")]
    pub backends: Vec<String>,

    /// Brave Search API key.
    #[serde(default)]
    pub brave_api_key: Option<String>,

    /// Brave web search endpoint.
    #[serde(default = "default_brave_url")]
    pub brave_base_url: String,

    /// Tavily API key.
    #[serde(default)]
    pub tavily_api_key: Option<String>,

    /// Tavily search endpoint.
    #[serde(default = "default_tavily_url")]
    pub tavily_base_url: String,

    /// Results requested on the critical path.
    #[serde(default = "default_result_count")]
    pub result_count: usize,

    /// Results requested when pre-warming related queries.
    #[serde(default = "default_prewarm_count")]
    pub prewarm_result_count: usize,

    /// How many related queries to pre-warm (1-3).
    #[serde(default = "default_related_queries")]
    pub max_related_queries: usize,

    /// Truncation length for each result's content.
    #[serde(default = "default_content_max_chars")]
    pub content_max_chars: usize,

    /// How long built grounding text stays cached.
    #[serde(default = "default_search_ttl")]
    pub cache_ttl_secs: u64,

    /// Per-backend HTTP timeout.
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backends: default_backends(),
            brave_api_key: None,
            brave_base_url: default_brave_url(),
            tavily_api_key: None,
            tavily_base_url: default_tavily_url(),
            result_count: default_result_count(),
            prewarm_result_count: default_prewarm_count(),
            max_related_queries: default_related_queries(),
            content_max_chars: default_content_max_chars(),
            cache_ttl_secs: default_search_ttl(),
            timeout_secs: default_search_timeout(),
        }
    }
}

fn default_backends() -> Vec<String> {
    vec!["brave".to_string(), "tavily".to_string()]
}

fn default_brave_url() -> String {
    "https://api.search.brave.com/res/v1/web/search".to_string()
}

fn default_tavily_url() -> String {
    "https://api.tavily.com/search".to_string()
}

fn default_result_count() -> usize {
    5
}

fn default_prewarm_count() -> usize {
    3
}

fn default_related_queries() -> usize {
    3
}

fn default_content_max_chars() -> usize {
    600
}

fn default_search_ttl() -> u64 {
    600
}

fn default_search_timeout() -> u64 {
    8
}

/// Long-term memory configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Enable recall and extraction.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum memories injected into a prompt.
    #[serde(default = "default_recall_limit")]
    pub recall_limit: usize,

    /// How long a (user, query) recall result stays cached.
    #[serde(default = "default_recall_ttl")]
    pub cache_ttl_secs: u64,

    /// Run post-turn extraction.
    #[serde(default = "default_true")]
    pub extraction_enabled: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            recall_limit: default_recall_limit(),
            cache_ttl_secs: default_recall_ttl(),
            extraction_enabled: true,
        }
    }
}

fn default_recall_limit() -> usize {
    5
}

fn default_recall_ttl() -> u64 {
    300
}

/// Token batching for streamed replies.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StreamingConfig {
    /// Flush every N tokens.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Flush when the unsent buffer exceeds this many characters.
    #[serde(default = "default_buffer_threshold")]
    pub buffer_threshold: usize,

    /// Always flush on multiples of this token count.
    #[serde(default = "default_forced_interval")]
    pub forced_interval: usize,

    /// Bound on chunks queued between the pipeline and the HTTP body.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Bounded wait for grounding lookups before generation starts.
    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout_secs: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            buffer_threshold: default_buffer_threshold(),
            forced_interval: default_forced_interval(),
            channel_capacity: default_channel_capacity(),
            lookup_timeout_secs: default_lookup_timeout(),
        }
    }
}

fn default_batch_size() -> usize {
    2
}

fn default_buffer_threshold() -> usize {
    15
}

fn default_forced_interval() -> usize {
    10
}

fn default_channel_capacity() -> usize {
    64
}

fn default_lookup_timeout() -> u64 {
    10
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds to wait for in-flight turns and background work on shutdown.
    #[serde(default = "default_grace")]
    pub shutdown_grace_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_grace_secs: default_grace(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_grace() -> u64 {
    10
}
