// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Anthropic Messages API.
//!
//! Handles authentication headers, one retry on transient statuses, and
//! classification of every failure into a [`ParleyError::Generation`].

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use parley_core::{GenerationErrorKind, ParleyError};

use crate::classify::classify_status;
use crate::sse::{self, EventStream};
use crate::types::{ApiErrorResponse, MessageRequest, MessageResponse};

/// Delay before retrying a transient failure.
const RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl AnthropicClient {
    pub fn new(
        api_key: &str,
        api_version: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ParleyError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|e| ParleyError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_str(api_version).map_err(|e| {
                ParleyError::Config(format!("invalid API version header value: {e}"))
            })?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ParleyError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            max_retries: 1,
        })
    }

    /// Sends a streaming request and returns its SSE events.
    pub async fn stream_message(&self, request: &MessageRequest) -> Result<EventStream, ParleyError> {
        let mut req = request.clone();
        req.stream = true;
        let response = self.send(&req).await?;
        Ok(sse::parse_sse_stream(response))
    }

    /// Sends a non-streaming request and returns the full response.
    pub async fn complete_message(
        &self,
        request: &MessageRequest,
    ) -> Result<MessageResponse, ParleyError> {
        let mut req = request.clone();
        req.stream = false;
        let response = self.send(&req).await?;
        let body = response.text().await.map_err(|e| {
            ParleyError::generation(
                GenerationErrorKind::ServerError,
                format!("failed to read response body: {e}"),
            )
        })?;
        serde_json::from_str(&body).map_err(|e| {
            ParleyError::generation(
                GenerationErrorKind::ServerError,
                format!("failed to parse API response: {e}"),
            )
        })
    }

    /// Posts `req`, retrying once on 429/500/503/529.
    async fn send(&self, req: &MessageRequest) -> Result<reqwest::Response, ParleyError> {
        let mut attempt = 0;
        loop {
            if attempt > 0 {
                warn!(attempt, "retrying request after transient error");
                tokio::time::sleep(RETRY_DELAY).await;
            }

            let response = self
                .client
                .post(&self.base_url)
                .json(req)
                .send()
                .await
                .map_err(|e| {
                    ParleyError::generation(
                        GenerationErrorKind::ServerError,
                        format!("HTTP request failed: {e}"),
                    )
                })?;

            let status = response.status();
            debug!(status = %status, attempt, stream = req.stream, "provider response received");
            if status.is_success() {
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, body = %body, "transient provider error, will retry");
                attempt += 1;
                continue;
            }

            return Err(error_from_body(status, &body));
        }
    }
}

fn error_from_body(status: reqwest::StatusCode, body: &str) -> ParleyError {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api_err) => ParleyError::generation(
            classify_status(status.as_u16(), &api_err.error.message),
            format!(
                "Anthropic API error ({}): {}",
                api_err.error.type_, api_err.error.message
            ),
        ),
        Err(_) => ParleyError::generation(
            classify_status(status.as_u16(), body),
            format!("API returned {status}: {body}"),
        ),
    }
}

fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503 | 529)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ApiMessage;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> AnthropicClient {
        AnthropicClient::new(
            "test-api-key",
            "2023-06-01",
            base_url,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn test_request() -> MessageRequest {
        MessageRequest {
            model: "claude-sonnet-4-20250514".into(),
            messages: vec![ApiMessage {
                role: "user".into(),
                content: "Hello".into(),
            }],
            system: None,
            max_tokens: 1024,
            temperature: Some(0.2),
            stream: false,
        }
    }

    fn success_body(id: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": "Hi there!"}],
            "model": "claude-sonnet-4-20250514",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        })
    }

    #[tokio::test]
    async fn complete_message_sends_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("x-api-key", "test-api-key"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(serde_json::json!({"stream": false, "max_tokens": 1024})))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("msg_test")))
            .mount(&server)
            .await;

        let result = test_client(&server.uri())
            .complete_message(&test_request())
            .await
            .unwrap();
        assert_eq!(result.id, "msg_test");
        assert_eq!(result.usage.input_tokens, 10);
    }

    #[tokio::test]
    async fn retries_once_on_429() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"type": "rate_limit_error", "message": "Rate limited"}
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("msg_retry")))
            .mount(&server)
            .await;

        let result = test_client(&server.uri())
            .complete_message(&test_request())
            .await
            .unwrap();
        assert_eq!(result.id, "msg_retry");
    }

    #[tokio::test]
    async fn exhausted_retries_classify_as_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_json(serde_json::json!({
                "error": {"type": "overloaded_error", "message": "Overloaded"}
            })))
            .expect(2)
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .complete_message(&test_request())
            .await
            .unwrap_err();
        match err {
            ParleyError::Generation { kind, message } => {
                assert_eq!(kind, GenerationErrorKind::RateLimit);
                assert!(message.contains("overloaded_error"), "got: {message}");
            }
            other => panic!("expected Generation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unauthorized_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"type": "authentication_error", "message": "invalid x-api-key"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .complete_message(&test_request())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ParleyError::Generation {
                kind: GenerationErrorKind::Unauthorized,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn low_credit_is_insufficient_balance() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {
                    "type": "invalid_request_error",
                    "message": "Your credit balance is too low to access the API."
                }
            })))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .complete_message(&test_request())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ParleyError::Generation {
                kind: GenerationErrorKind::InsufficientBalance,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn unreachable_host_is_server_error() {
        let err = test_client("http://127.0.0.1:9")
            .complete_message(&test_request())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ParleyError::Generation {
                kind: GenerationErrorKind::ServerError,
                ..
            }
        ));
    }
}
