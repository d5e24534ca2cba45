// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tavily search API backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use parley_core::types::SearchHit;
use parley_core::{ParleyError, SearchBackend};

const NAME: &str = "tavily";

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
    search_depth: &'static str,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    title: String,
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    published_date: Option<String>,
}

pub struct TavilyBackend {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl TavilyBackend {
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, ParleyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ParleyError::Config(format!("failed to build Tavily client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
        })
    }
}

fn upstream(message: String) -> ParleyError {
    ParleyError::Upstream {
        service: NAME.to_string(),
        message,
    }
}

#[async_trait]
impl SearchBackend for TavilyBackend {
    fn name(&self) -> &str {
        NAME
    }

    async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchHit>, ParleyError> {
        let body = TavilyRequest {
            api_key: &self.api_key,
            query,
            max_results: count,
            search_depth: "basic",
        };
        let response = self
            .client
            .post(&self.base_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| upstream(format!("request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upstream(format!("returned {status}: {body}")));
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| upstream(format!("malformed response: {e}")))?;
        let hits: Vec<SearchHit> = parsed
            .results
            .into_iter()
            .take(count)
            .map(|r| SearchHit {
                title: r.title,
                url: r.url,
                content: r.content,
                source_label: NAME.to_string(),
                published_at: r.published_date,
            })
            .collect();
        debug!(query, hits = hits.len(), "tavily search complete");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn posts_query_and_parses_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "api_key": "tvly-key",
                "query": "rust async",
                "max_results": 2
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "query": "rust async",
                "results": [
                    {"title": "Async Book", "url": "https://rust-lang.github.io/async-book/",
                     "content": "Asynchronous programming in Rust", "score": 0.9},
                    {"title": "Tokio", "url": "https://tokio.rs", "content": "Runtime",
                     "published_date": "2026-01-02"}
                ]
            })))
            .mount(&server)
            .await;

        let backend = TavilyBackend::new("tvly-key", &server.uri(), Duration::from_secs(5)).unwrap();
        let hits = backend.search("rust async", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "Asynchronous programming in Rust");
        assert_eq!(hits[1].published_at.as_deref(), Some("2026-01-02"));
        assert!(hits.iter().all(|h| h.source_label == "tavily"));
    }

    #[tokio::test]
    async fn server_error_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let backend = TavilyBackend::new("k", &server.uri(), Duration::from_secs(5)).unwrap();
        assert!(matches!(
            backend.search("x", 3).await,
            Err(ParleyError::Upstream { .. })
        ));
    }
}
