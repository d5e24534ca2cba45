// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cached web grounding with related-query pre-warming.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use parley_cache::TtlCache;
use parley_config::model::SearchConfig;
use parley_core::types::{SearchHit, WebContext};
use parley_core::{ParleyError, SearchBackend};

use crate::brave::BraveBackend;
use crate::related::derive_related_queries;
use crate::text::{normalize_query, truncate_chars};
use crate::tavily::TavilyBackend;

/// Tunables copied out of [`SearchConfig`].
#[derive(Debug, Clone)]
pub struct WebContextSettings {
    pub enabled: bool,
    pub result_count: usize,
    pub prewarm_result_count: usize,
    pub max_related_queries: usize,
    pub content_max_chars: usize,
    pub cache_ttl: Duration,
}

impl From<&SearchConfig> for WebContextSettings {
    fn from(config: &SearchConfig) -> Self {
        Self {
            enabled: config.enabled,
            result_count: config.result_count,
            prewarm_result_count: config.prewarm_result_count,
            max_related_queries: config.max_related_queries,
            content_max_chars: config.content_max_chars,
            cache_ttl: Duration::from_secs(config.cache_ttl_secs),
        }
    }
}

/// Builds the ordered backend chain named by `search.backends`.
///
/// Backends without an API key are skipped with a warning.
pub fn build_backends(config: &SearchConfig) -> Result<Vec<Arc<dyn SearchBackend>>, ParleyError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let mut backends: Vec<Arc<dyn SearchBackend>> = Vec::new();
    for name in &config.backends {
        match name.as_str() {
            "brave" => match config.brave_api_key.as_deref().filter(|k| !k.is_empty()) {
                Some(key) => backends.push(Arc::new(BraveBackend::new(
                    key,
                    &config.brave_base_url,
                    timeout,
                )?)),
                None => warn!("search backend `brave` listed but search.brave_api_key is unset"),
            },
            "tavily" => match config.tavily_api_key.as_deref().filter(|k| !k.is_empty()) {
                Some(key) => backends.push(Arc::new(TavilyBackend::new(
                    key,
                    &config.tavily_base_url,
                    timeout,
                )?)),
                None => warn!("search backend `tavily` listed but search.tavily_api_key is unset"),
            },
            other => {
                return Err(ParleyError::Config(format!(
                    "unknown search backend `{other}`"
                )));
            }
        }
    }
    Ok(backends)
}

/// Formats hits as a numbered grounding block that asks for `[n]` citations.
pub fn format_context(query: &str, hits: &[SearchHit], content_max_chars: usize) -> String {
    let mut text = format!("Web search results for \"{}\":\n", query.trim());
    for (i, hit) in hits.iter().enumerate() {
        text.push_str(&format!(
            "\n[{n}] {title}\n{content}\nSource: {url}\n",
            n = i + 1,
            title = hit.title.trim(),
            content = truncate_chars(&hit.content, content_max_chars),
            url = hit.url,
        ));
    }
    let markers: String = (1..=hits.len().min(3)).map(|n| format!("[{n}]")).collect();
    text.push_str(&format!(
        "\nUse these results when they are relevant and cite them inline by number, like {markers}."
    ));
    text
}

/// Queries backends in order; the first non-empty answer wins.
async fn search_ranked(
    backends: &[Arc<dyn SearchBackend>],
    query: &str,
    count: usize,
) -> Option<Vec<SearchHit>> {
    for backend in backends {
        match backend.search(query, count).await {
            Ok(hits) if !hits.is_empty() => {
                debug!(backend = backend.name(), hits = hits.len(), "search backend answered");
                return Some(hits.into_iter().take(count).collect());
            }
            Ok(_) => debug!(backend = backend.name(), "search backend returned nothing"),
            Err(e) => warn!(backend = backend.name(), error = %e, "search backend failed"),
        }
    }
    None
}

async fn fetch_context(
    backends: &[Arc<dyn SearchBackend>],
    query: &str,
    count: usize,
    content_max_chars: usize,
) -> Option<WebContext> {
    let hits = search_ranked(backends, query, count).await?;
    Some(WebContext {
        query: query.to_string(),
        text: format_context(query, &hits, content_max_chars),
        sources: hits,
    })
}

/// Produces cached web grounding for a query.
pub struct WebContextProvider {
    backends: Vec<Arc<dyn SearchBackend>>,
    cache: Arc<TtlCache<WebContext>>,
    settings: WebContextSettings,
    tracker: TaskTracker,
}

impl WebContextProvider {
    pub fn new(
        backends: Vec<Arc<dyn SearchBackend>>,
        cache: Arc<TtlCache<WebContext>>,
        settings: WebContextSettings,
        tracker: TaskTracker,
    ) -> Self {
        info!(
            backends = ?backends.iter().map(|b| b.name().to_string()).collect::<Vec<_>>(),
            enabled = settings.enabled,
            "web context provider ready"
        );
        Self {
            backends,
            cache,
            settings,
            tracker,
        }
    }

    /// Builds the provider and its backend chain from config.
    pub fn from_config(
        config: &SearchConfig,
        cache: Arc<TtlCache<WebContext>>,
        tracker: TaskTracker,
    ) -> Result<Self, ParleyError> {
        Ok(Self::new(
            build_backends(config)?,
            cache,
            WebContextSettings::from(config),
            tracker,
        ))
    }

    /// Returns grounding for `query`, or `None` when grounding is off, the
    /// query is blank, or no backend produced results.
    pub async fn build_context(&self, query: &str, grounding_enabled: bool) -> Option<WebContext> {
        if !self.settings.enabled || !grounding_enabled || self.backends.is_empty() {
            return None;
        }
        let key = normalize_query(query);
        if key.is_empty() {
            return None;
        }

        if let Some(hit) = self.cache.get(&key) {
            debug!(query = %key, "web context cache hit");
            return Some(hit);
        }

        self.prewarm(&key);

        let context = fetch_context(
            &self.backends,
            query.trim(),
            self.settings.result_count,
            self.settings.content_max_chars,
        )
        .await;
        match context {
            Some(context) => {
                self.cache
                    .set(key, context.clone(), self.settings.cache_ttl);
                Some(context)
            }
            None => {
                warn!(query = %key, "no search backend produced results, continuing without grounding");
                None
            }
        }
    }

    /// Warms the cache for related queries on the background tracker.
    fn prewarm(&self, key: &str) {
        let related: Vec<String> = derive_related_queries(
            key,
            chrono::Utc::now().date_naive(),
            self.settings.max_related_queries,
        )
        .into_iter()
        .filter(|q| !self.cache.has(q))
        .collect();
        if related.is_empty() {
            return;
        }

        let backends = self.backends.clone();
        let cache = Arc::clone(&self.cache);
        let settings = self.settings.clone();
        self.tracker.spawn(async move {
            for query in related {
                match fetch_context(
                    &backends,
                    &query,
                    settings.prewarm_result_count,
                    settings.content_max_chars,
                )
                .await
                {
                    Some(context) => {
                        debug!(query = %query, "pre-warmed related query");
                        cache.set(query, context, settings.cache_ttl);
                    }
                    None => debug!(query = %query, "pre-warm produced nothing"),
                }
            }
        });
    }
}
