// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Brave Search web API backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::debug;

use parley_core::types::SearchHit;
use parley_core::{ParleyError, SearchBackend};

use crate::text::html_to_text;

const NAME: &str = "brave";

#[derive(Debug, Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Debug, Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    title: String,
    url: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    page_age: Option<String>,
    #[serde(default)]
    age: Option<String>,
}

pub struct BraveBackend {
    client: reqwest::Client,
    base_url: String,
}

impl BraveBackend {
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, ParleyError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            "X-Subscription-Token",
            HeaderValue::from_str(api_key)
                .map_err(|e| ParleyError::Config(format!("invalid Brave API key: {e}")))?,
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ParleyError::Config(format!("failed to build Brave client: {e}")))?;
        Ok(Self {
            client,
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
impl SearchBackend for BraveBackend {
    fn name(&self) -> &str {
        NAME
    }

    async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchHit>, ParleyError> {
        let count = count.to_string();
        let url = reqwest::Url::parse_with_params(
            &self.base_url,
            &[("q", query), ("count", count.as_str())],
        )
        .map_err(|e| upstream(format!("invalid base url: {e}")))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| upstream(format!("request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upstream(format!("returned {status}: {body}")));
        }

        let parsed: BraveResponse = response
            .json()
            .await
            .map_err(|e| upstream(format!("malformed response: {e}")))?;
        let hits: Vec<SearchHit> = parsed
            .web
            .map(|web| web.results)
            .unwrap_or_default()
            .into_iter()
            .map(|r| SearchHit {
                title: html_to_text(&r.title),
                url: r.url,
                content: html_to_text(&r.description),
                source_label: NAME.to_string(),
                published_at: r.page_age.or(r.age),
            })
            .collect();
        debug!(query, hits = hits.len(), "brave search complete");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> BraveBackend {
        BraveBackend::new("brv-key", &server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn parses_web_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "sydney weather"))
            .and(query_param("count", "5"))
            .and(header("X-Subscription-Token", "brv-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "web": {"results": [
                    {"title": "Sydney <strong>Weather</strong>", "url": "https://bom.gov.au/nsw",
                     "description": "Sunny, <strong>24°C</strong>", "page_age": "2026-03-14T00:00:00"},
                    {"title": "Forecast", "url": "https://weather.example.com"}
                ]}
            })))
            .mount(&server)
            .await;

        let hits = backend(&server).search("sydney weather", 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Sydney Weather");
        assert_eq!(hits[0].content, "Sunny, 24°C");
        assert_eq!(hits[0].source_label, "brave");
        assert_eq!(hits[0].published_at.as_deref(), Some("2026-03-14T00:00:00"));
        assert_eq!(hits[1].content, "");
    }

    #[tokio::test]
    async fn missing_web_section_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"type": "search"})))
            .mount(&server)
            .await;
        assert!(backend(&server).search("x", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn http_error_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        let err = backend(&server).search("x", 3).await.unwrap_err();
        assert!(matches!(err, ParleyError::Upstream { ref service, .. } if service == "brave"));
    }
}
