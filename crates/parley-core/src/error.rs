// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Parley.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// Typed reasons a model generation can fail.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GenerationErrorKind {
    /// The provider account has run out of credit.
    InsufficientBalance,
    /// The provider rejected our credentials.
    Unauthorized,
    /// The provider is throttling requests.
    RateLimit,
    /// Anything else: 5xx, transport failures, broken streams.
    ServerError,
}

/// The primary error type used across all Parley crates.
#[derive(Debug, Error)]
pub enum ParleyError {
    /// Missing or invalid configuration (credentials, paths). Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed inbound request. Raised before any backend is called.
    #[error("validation error: {0}")]
    Validation(String),

    /// Storage backend errors (connection, query, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A search, memory, or persistence backend could not be reached.
    ///
    /// Always recovered at the component boundary and never returned from
    /// the turn service.
    #[error("{service} unavailable: {message}")]
    Upstream { service: String, message: String },

    /// The inference provider failed before or during generation.
    #[error("generation failed ({kind}): {message}")]
    Generation {
        kind: GenerationErrorKind,
        message: String,
    },

    /// A record addressed by id does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A uniqueness constraint would be violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ParleyError {
    /// Shorthand for a [`ParleyError::Generation`].
    pub fn generation(kind: GenerationErrorKind, message: impl Into<String>) -> Self {
        ParleyError::Generation {
            kind,
            message: message.into(),
        }
    }

    /// Stable machine-readable label for the error, used in API responses.
    pub fn error_type(&self) -> String {
        match self {
            ParleyError::Config(_) => "configuration".into(),
            ParleyError::Validation(_) => "validation".into(),
            ParleyError::Storage { .. } => "storage".into(),
            ParleyError::Upstream { .. } => "upstream_unavailable".into(),
            ParleyError::Generation { kind, .. } => kind.to_string(),
            ParleyError::NotFound { .. } => "not_found".into(),
            ParleyError::Conflict(_) => "conflict".into(),
            ParleyError::Timeout { .. } => "timeout".into(),
            ParleyError::Internal(_) => "internal".into(),
        }
    }

    /// The human-facing part of the error without the category prefix.
    pub fn user_message(&self) -> String {
        match self {
            ParleyError::Generation { message, .. } => message.clone(),
            ParleyError::Validation(message) => message.clone(),
            other => other.to_string(),
        }
    }
}
