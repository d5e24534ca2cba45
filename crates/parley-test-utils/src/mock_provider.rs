// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock inference provider for deterministic testing.
//!
//! Replies are popped from a FIFO script. Streamed replies are split into
//! word tokens so pipeline batching behaves like a real provider.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, stream};
use tokio::sync::Mutex;

use parley_core::types::{ProviderRequest, ProviderResponse, ProviderStreamChunk, TokenUsage};
use parley_core::{
    AdapterType, GenerationErrorKind, HealthStatus, ParleyError, PluginAdapter, ProviderAdapter,
    ProviderStream,
};

/// One scripted provider outcome.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Succeeds with this text.
    Text(String),
    /// Fails before any token is produced.
    Fail {
        kind: GenerationErrorKind,
        message: String,
    },
    /// Streams `tokens`, then yields a generation error.
    FailMidStream {
        tokens: Vec<String>,
        kind: GenerationErrorKind,
        message: String,
    },
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }

    pub fn fail(kind: GenerationErrorKind, message: impl Into<String>) -> Self {
        MockReply::Fail {
            kind,
            message: message.into(),
        }
    }
}

const MOCK_USAGE: TokenUsage = TokenUsage {
    input_tokens: 10,
    output_tokens: 20,
};

/// A provider that replays scripted replies and records every request.
pub struct MockProvider {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
    token_delay: Option<Duration>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::with_replies(Vec::new())
    }

    /// A provider pre-loaded with successful text replies.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self::with_replies(responses.into_iter().map(MockReply::Text).collect())
    }

    pub fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            requests: Arc::new(Mutex::new(Vec::new())),
            token_delay: None,
        }
    }

    /// Sleeps (on the tokio clock) before each streamed token.
    pub fn with_token_delay(mut self, delay: Duration) -> Self {
        self.token_delay = Some(delay);
        self
    }

    pub async fn add_reply(&self, reply: MockReply) {
        self.replies.lock().await.push_back(reply);
    }

    /// Every request received so far, oldest first.
    pub async fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().await.clone()
    }

    async fn next_reply(&self, request: &ProviderRequest) -> MockReply {
        self.requests.lock().await.push(request.clone());
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| MockReply::text("mock response"))
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits text into word tokens, keeping the trailing whitespace on each.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_inclusive(' ').map(str::to_string).collect()
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ParleyError> {
        match self.next_reply(&request).await {
            MockReply::Text(text) => Ok(ProviderResponse {
                id: format!("mock-resp-{}", parley_core::generate_id("res")),
                content: text,
                model: request.model,
                stop_reason: Some("end_turn".to_string()),
                usage: MOCK_USAGE,
            }),
            MockReply::Fail { kind, message } | MockReply::FailMidStream { kind, message, .. } => {
                Err(ParleyError::generation(kind, message))
            }
        }
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ProviderStream, ParleyError> {
        let chunks: Vec<Result<ProviderStreamChunk, ParleyError>> =
            match self.next_reply(&request).await {
                MockReply::Fail { kind, message } => {
                    return Err(ParleyError::generation(kind, message));
                }
                MockReply::Text(text) => tokenize(&text)
                    .into_iter()
                    .map(|t| Ok(ProviderStreamChunk::Text(t)))
                    .chain([
                        Ok(ProviderStreamChunk::Usage(MOCK_USAGE)),
                        Ok(ProviderStreamChunk::Done {
                            stop_reason: Some("end_turn".to_string()),
                        }),
                    ])
                    .collect(),
                MockReply::FailMidStream {
                    tokens,
                    kind,
                    message,
                } => tokens
                    .into_iter()
                    .map(|t| Ok(ProviderStreamChunk::Text(t)))
                    .chain([Err(ParleyError::generation(kind, message))])
                    .collect(),
            };

        match self.token_delay {
            Some(delay) => Ok(Box::pin(stream::iter(chunks).then(move |chunk| async move {
                tokio::time::sleep(delay).await;
                chunk
            }))),
            None => Ok(Box::pin(stream::iter(chunks))),
        }
    }
}
