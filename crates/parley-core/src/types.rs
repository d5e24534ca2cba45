// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data model shared across Parley crates.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::ids::{generate_id, now_timestamp};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

impl HealthStatus {
    /// Short lowercase label for health endpoints.
    pub fn label(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded(_) => "degraded",
            HealthStatus::Unhealthy(_) => "unhealthy",
        }
    }
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Storage,
}

/// Speaker of a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

// --- Persisted records ---

/// A registered account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub credential_hash: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub avatar_ref: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields supplied at registration.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub credential_hash: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub avatar_ref: Option<String>,
}

/// Profile or password update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub display_name: Option<String>,
    pub credential_hash: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub avatar_ref: Option<String>,
}

impl User {
    /// Builds a user record with a fresh id and timestamps.
    pub fn from_new(new: NewUser) -> Self {
        let now = now_timestamp();
        Self {
            id: generate_id("usr"),
            email: new.email,
            credential_hash: new.credential_hash,
            display_name: new.display_name,
            phone: new.phone,
            bio: new.bio,
            avatar_ref: new.avatar_ref,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Returns a copy with the patch applied and `updated_at` bumped.
    pub fn patched(&self, patch: &UserPatch) -> Self {
        let mut user = self.clone();
        if let Some(ref v) = patch.display_name {
            user.display_name = v.clone();
        }
        if let Some(ref v) = patch.credential_hash {
            user.credential_hash = v.clone();
        }
        if let Some(ref v) = patch.phone {
            user.phone = Some(v.clone());
        }
        if let Some(ref v) = patch.bio {
            user.bio = Some(v.clone());
        }
        if let Some(ref v) = patch.avatar_ref {
            user.avatar_ref = Some(v.clone());
        }
        user.updated_at = now_timestamp();
        user
    }
}

/// A titled thread of messages owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub owner_user_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Conversation {
    pub fn new(owner_user_id: &str, title: &str) -> Self {
        let now = now_timestamp();
        Self {
            id: generate_id("conv"),
            title: title.to_string(),
            owner_user_id: owner_user_id.to_string(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Conversation update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ConversationPatch {
    pub title: Option<String>,
}

impl Conversation {
    pub fn patched(&self, patch: &ConversationPatch) -> Self {
        let mut conv = self.clone();
        if let Some(ref title) = patch.title {
            conv.title = title.clone();
        }
        conv.updated_at = now_timestamp();
        conv
    }
}

/// An immutable chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: String,
}

impl Message {
    pub fn new(conversation_id: &str, role: Role, content: &str) -> Self {
        Self {
            id: generate_id("msg"),
            conversation_id: conversation_id.to_string(),
            role,
            content: content.to_string(),
            created_at: now_timestamp(),
        }
    }
}

/// A long-term fact remembered about a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    pub id: String,
    pub owner_user_id: String,
    pub content: String,
    pub category: String,
    /// 1 (trivia) to 10 (core identity fact).
    pub importance: u8,
    pub created_at: String,
    pub updated_at: String,
}

impl Memory {
    pub fn new(owner_user_id: &str, content: &str, category: &str, importance: u8) -> Self {
        let now = now_timestamp();
        Self {
            id: generate_id("mem"),
            owner_user_id: owner_user_id.to_string(),
            content: content.to_string(),
            category: category.to_string(),
            importance: importance.clamp(1, 10),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn patched(&self, patch: &MemoryPatch) -> Self {
        let mut memory = self.clone();
        if let Some(ref content) = patch.content {
            memory.content = content.clone();
        }
        if let Some(ref category) = patch.category {
            memory.category = category.clone();
        }
        if let Some(importance) = patch.importance {
            memory.importance = importance.clamp(1, 10);
        }
        memory.updated_at = now_timestamp();
        memory
    }
}

/// Memory update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct MemoryPatch {
    pub content: Option<String>,
    pub category: Option<String>,
    pub importance: Option<u8>,
}

/// A cited web source attached to an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub id: String,
    pub message_id: String,
    pub url: String,
    pub title: String,
    pub snippet: Option<String>,
    pub source_label: String,
    pub published_at: Option<String>,
    /// Zero-based; citation `[n]` in the text maps to `display_order == n - 1`.
    pub display_order: u32,
}

impl Reference {
    /// Builds the reference rows for a message, numbering them 0..N-1.
    pub fn batch_for(message_id: &str, sources: &[SearchHit]) -> Vec<Reference> {
        sources
            .iter()
            .enumerate()
            .map(|(i, hit)| Reference {
                id: generate_id("ref"),
                message_id: message_id.to_string(),
                url: hit.url.clone(),
                title: hit.title.clone(),
                snippet: (!hit.content.is_empty()).then(|| hit.content.clone()),
                source_label: hit.source_label.clone(),
                published_at: hit.published_at.clone(),
                display_order: i as u32,
            })
            .collect()
    }
}

// --- Grounding ---

/// A single normalized web search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub content: String,
    /// Which backend produced the hit (e.g. "brave").
    pub source_label: String,
    pub published_at: Option<String>,
}

/// Grounding text built from web search, plus the sources it numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct WebContext {
    pub query: String,
    pub text: String,
    pub sources: Vec<SearchHit>,
}

// --- Provider types ---

/// One entry of a prompt sent to the inference provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A request to the inference provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub stream: bool,
}

/// Token accounting for one generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Merges a later usage report, keeping the larger counts.
    pub fn merge(&mut self, other: TokenUsage) {
        self.input_tokens = self.input_tokens.max(other.input_tokens);
        self.output_tokens = self.output_tokens.max(other.output_tokens);
    }
}

/// A complete, non-streamed provider response.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub id: String,
    pub content: String,
    pub model: String,
    pub stop_reason: Option<String>,
    pub usage: TokenUsage,
}

/// An event from a streaming provider response.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderStreamChunk {
    /// A text token.
    Text(String),
    /// Updated token accounting.
    Usage(TokenUsage),
    /// Generation finished.
    Done { stop_reason: Option<String> },
}
