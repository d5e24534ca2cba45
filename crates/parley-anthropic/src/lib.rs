// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Messages API provider for Parley.
//!
//! Implements [`ProviderAdapter`] with single-shot completion and SSE
//! streaming. Every failure, whether an HTTP status, a transport error or
//! an in-stream `error` event, is surfaced as a typed
//! [`ParleyError::Generation`].

pub mod classify;
pub mod client;
pub mod sse;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::StreamExt;
use tracing::{debug, info};

use parley_config::model::AnthropicConfig;
use parley_core::types::{
    ProviderRequest, ProviderResponse, ProviderStreamChunk, Role, TokenUsage,
};
use parley_core::{
    AdapterType, HealthStatus, ParleyError, PluginAdapter, ProviderAdapter, ProviderStream,
};

use crate::classify::classify_error_type;
use crate::client::AnthropicClient;
use crate::sse::StreamEvent;
use crate::types::{
    ApiMessage, ApiUsage, MessageRequest, ResponseContentBlock, SseDelta, SystemBlock,
    SystemContent,
};

/// Anthropic provider implementing [`ProviderAdapter`].
///
/// API key resolution order: config, then `ANTHROPIC_API_KEY`, else a
/// configuration error.
pub struct AnthropicProvider {
    client: AnthropicClient,
    default_model: String,
}

impl AnthropicProvider {
    pub fn new(config: &AnthropicConfig) -> Result<Self, ParleyError> {
        let api_key = resolve_api_key(config.api_key.as_deref())?;
        let client = AnthropicClient::new(
            &api_key,
            &config.api_version,
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
        )?;

        info!(
            model = %config.default_model,
            base_url = %config.base_url,
            "Anthropic provider initialized"
        );
        Ok(Self {
            client,
            default_model: config.default_model.clone(),
        })
    }

    /// Converts a [`ProviderRequest`] into a Messages API request.
    ///
    /// System messages become system blocks in prompt order, so a trailing
    /// grounding message stays the last system block.
    fn to_message_request(&self, request: &ProviderRequest) -> MessageRequest {
        let mut system_blocks = Vec::new();
        let mut messages = Vec::new();
        for message in &request.messages {
            match message.role {
                Role::System => system_blocks.push(SystemBlock::text(message.content.clone())),
                Role::User | Role::Assistant => messages.push(ApiMessage {
                    role: message.role.to_string(),
                    content: message.content.clone(),
                }),
            }
        }

        let model = if request.model.trim().is_empty() {
            self.default_model.clone()
        } else {
            request.model.clone()
        };

        MessageRequest {
            model,
            messages,
            system: (!system_blocks.is_empty()).then_some(SystemContent::Blocks(system_blocks)),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: request.stream,
        }
    }
}

#[async_trait]
impl PluginAdapter for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        // No token-consuming probe; the client is built and configured.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        debug!("Anthropic provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ParleyError> {
        let api_request = self.to_message_request(&request);
        let response = self.client.complete_message(&api_request).await?;

        let content = response
            .content
            .iter()
            .filter_map(|block| match block {
                ResponseContentBlock::Text { text } => Some(text.as_str()),
                ResponseContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("");

        Ok(ProviderResponse {
            id: response.id,
            content,
            model: response.model,
            stop_reason: response.stop_reason,
            usage: to_usage(response.usage),
        })
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ProviderStream, ParleyError> {
        let api_request = self.to_message_request(&request);
        let events = self.client.stream_message(&api_request).await?;

        let mut stop_reason: Option<String> = None;
        let chunks = events.filter_map(move |result| {
            let chunk = match result {
                Ok(event) => map_stream_event(event, &mut stop_reason),
                Err(e) => Some(Err(e)),
            };
            async move { chunk }
        });

        Ok(Box::pin(chunks))
    }
}

fn to_usage(usage: ApiUsage) -> TokenUsage {
    TokenUsage {
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
    }
}

/// Maps one SSE event to a provider chunk, remembering the stop reason
/// from `message_delta` for the final `Done`.
fn map_stream_event(
    event: StreamEvent,
    stop_reason: &mut Option<String>,
) -> Option<Result<ProviderStreamChunk, ParleyError>> {
    match event {
        StreamEvent::MessageStart(ms) => {
            debug!(id = %ms.message.id, model = %ms.message.model, "stream started");
            Some(Ok(ProviderStreamChunk::Usage(to_usage(ms.message.usage))))
        }
        StreamEvent::ContentBlockDelta(delta) => match delta.delta {
            SseDelta::TextDelta { text } if !text.is_empty() => {
                Some(Ok(ProviderStreamChunk::Text(text)))
            }
            _ => None,
        },
        StreamEvent::MessageDelta(md) => {
            if md.delta.stop_reason.is_some() {
                *stop_reason = md.delta.stop_reason;
            }
            md.usage.map(|u| Ok(ProviderStreamChunk::Usage(to_usage(u))))
        }
        StreamEvent::MessageStop => Some(Ok(ProviderStreamChunk::Done {
            stop_reason: stop_reason.take(),
        })),
        StreamEvent::Error(err) => Some(Err(ParleyError::generation(
            classify_error_type(&err.error.type_, &err.error.message),
            format!("{}: {}", err.error.type_, err.error.message),
        ))),
        StreamEvent::Ping => None,
    }
}

/// Resolves the API key from config or the environment.
pub fn resolve_api_key(config_key: Option<&str>) -> Result<String, ParleyError> {
    if let Some(key) = config_key.filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_string());
    }

    std::env::var("ANTHROPIC_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            ParleyError::Config(
                "Anthropic API key not found. Set anthropic.api_key in config or the ANTHROPIC_API_KEY environment variable.".into(),
            )
        })
}
