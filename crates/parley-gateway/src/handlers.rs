// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Route handlers.

use std::convert::Infallible;

use axum::Json;
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use parley_agent::TurnRequest;
use parley_core::ParleyError;
use parley_core::types::{ChatMessage, Message, Reference, Role, TokenUsage};

use crate::error::ApiError;
use crate::server::GatewayState;

/// Header carrying the authenticated user id, set by the session layer upstream.
pub const USER_HEADER: &str = "x-parley-user";
/// Response header carrying the conversation id of a turn.
pub const CONVERSATION_HEADER: &str = "x-conversation-id";

fn default_true() -> bool {
    true
}

/// One message of an inbound turn.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    pub role: Role,
    pub content: String,
}

/// `POST /v1/chat` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<InboundMessage>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default = "default_true")]
    pub stream: bool,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default = "default_true")]
    pub grounding_enabled: bool,
    /// Accepted for client compatibility; not processed.
    #[serde(default)]
    pub attachments: Option<serde_json::Value>,
}

impl ChatRequest {
    fn into_turn(self, user_id: Option<String>) -> TurnRequest {
        TurnRequest {
            user_id,
            messages: self
                .messages
                .into_iter()
                .map(|m| ChatMessage {
                    role: m.role,
                    content: m.content,
                })
                .collect(),
            model: self.model.filter(|m| !m.trim().is_empty()),
            temperature: self.temperature,
            conversation_id: self.conversation_id.filter(|c| !c.trim().is_empty()),
            grounding_enabled: self.grounding_enabled,
        }
    }
}

/// Non-streaming `POST /v1/chat` response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub reply: String,
    pub usage: TokenUsage,
    pub conversation_id: Option<String>,
}

/// A stored message together with its citations.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub references: Vec<Reference>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessages {
    pub conversation_id: String,
    pub title: String,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: String,
    pub primary_store: &'static str,
}

fn user_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// `POST /v1/chat`
pub async fn post_chat(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body.map_err(|e| ParleyError::Validation(e.body_text()))?;
    if body.attachments.is_some() {
        debug!("ignoring attachments on chat request");
    }

    let stream = body.stream;
    let request = body.into_turn(user_from(&headers));
    info!(
        anonymous = request.user_id.is_none(),
        stream,
        messages = request.messages.len(),
        "chat turn received"
    );

    if !stream {
        let reply = state.service.complete_turn(request).await?;
        return Ok(Json(ChatResponse {
            reply: reply.reply,
            usage: reply.usage,
            conversation_id: reply.conversation_id,
        })
        .into_response());
    }

    let turn = state.service.stream_turn(request).await?;
    let conversation_id = turn.conversation_id().map(str::to_string);
    let body = Body::from_stream(turn.into_chunks().map(Ok::<_, Infallible>));

    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    if let Some(id) = conversation_id {
        if let Ok(value) = HeaderValue::from_str(&id) {
            headers.insert(CONVERSATION_HEADER, value);
        }
    }
    Ok(response)
}

/// `GET /v1/conversations/{id}/messages`
pub async fn get_messages(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
) -> Result<Json<ConversationMessages>, ApiError> {
    let not_found = || ParleyError::NotFound {
        entity: "conversation",
        id: conversation_id.clone(),
    };
    let user_id = user_from(&headers).ok_or_else(not_found)?;
    let conversation = state
        .gateway
        .find_conversation(&conversation_id)
        .await
        .filter(|c| c.owner_user_id == user_id)
        .ok_or_else(not_found)?;

    let mut messages = Vec::new();
    for message in state.gateway.list_messages(&conversation.id).await {
        let references = match message.role {
            Role::Assistant => state.gateway.list_references(&message.id).await,
            _ => Vec::new(),
        };
        messages.push(MessageView {
            message,
            references,
        });
    }

    Ok(Json(ConversationMessages {
        conversation_id: conversation.id,
        title: conversation.title,
        messages,
    }))
}

/// `GET /health`
pub async fn get_health(State(state): State<GatewayState>) -> impl IntoResponse {
    let health = state.gateway.health();
    let primary_store = if state.gateway.primary_available() {
        "available"
    } else {
        "fallback"
    };
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: health.label(),
            version: state.version.clone(),
            primary_store,
        }),
    )
}
