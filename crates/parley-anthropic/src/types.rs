// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Messages API wire types.

use serde::{Deserialize, Serialize};

// --- Request types ---

/// System prompt content, sent as ordered text blocks.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SystemContent {
    Text(String),
    Blocks(Vec<SystemBlock>),
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: String,
}

impl SystemBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            block_type: "text".to_string(),
            text: text.into(),
        }
    }
}

/// A request to the Messages API.
#[derive(Debug, Clone, Serialize)]
pub struct MessageRequest {
    pub model: String,
    pub messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemContent>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub stream: bool,
}

/// A single user or assistant turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    pub role: String,
    pub content: String,
}

// --- Response types ---

/// A full, non-streamed response.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub id: String,
    pub content: Vec<ResponseContentBlock>,
    pub model: String,
    pub stop_reason: Option<String>,
    pub usage: ApiUsage,
}

/// A content block in a response. Only text is requested; anything else is
/// kept opaque and ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ApiUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

// --- SSE event payloads ---

/// `message_start`
#[derive(Debug, Clone, Deserialize)]
pub struct SseMessageStart {
    pub message: SseMessageInfo,
}

/// The partial message object carried by `message_start`.
#[derive(Debug, Clone, Deserialize)]
pub struct SseMessageInfo {
    pub id: String,
    pub model: String,
    #[serde(default)]
    pub usage: ApiUsage,
}

/// `content_block_delta`
#[derive(Debug, Clone, Deserialize)]
pub struct SseContentBlockDelta {
    pub index: usize,
    pub delta: SseDelta,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum SseDelta {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

/// `message_delta`
#[derive(Debug, Clone, Deserialize)]
pub struct SseMessageDelta {
    pub delta: SseMessageDeltaInfo,
    pub usage: Option<ApiUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SseMessageDeltaInfo {
    pub stop_reason: Option<String>,
}

/// Error body, shared by HTTP error responses and the SSE `error` event.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(rename = "type")]
    pub type_: String,
    pub message: String,
}
