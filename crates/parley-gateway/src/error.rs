// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maps [`ParleyError`] onto HTTP error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, warn};

use parley_core::{GenerationErrorKind, ParleyError};

/// `{"error": {"type", "message"}}`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

/// An error leaving a handler.
#[derive(Debug)]
pub struct ApiError(pub ParleyError);

impl From<ParleyError> for ApiError {
    fn from(err: ParleyError) -> Self {
        ApiError(err)
    }
}

/// HTTP status for an error.
pub fn status_for(err: &ParleyError) -> StatusCode {
    match err {
        ParleyError::Validation(_) => StatusCode::BAD_REQUEST,
        ParleyError::Generation { kind, .. } => match kind {
            GenerationErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            GenerationErrorKind::InsufficientBalance => StatusCode::PAYMENT_REQUIRED,
            GenerationErrorKind::RateLimit => StatusCode::TOO_MANY_REQUESTS,
            GenerationErrorKind::ServerError => StatusCode::BAD_GATEWAY,
        },
        ParleyError::NotFound { .. } => StatusCode::NOT_FOUND,
        ParleyError::Conflict(_) => StatusCode::CONFLICT,
        ParleyError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        ParleyError::Config(_)
        | ParleyError::Storage { .. }
        | ParleyError::Upstream { .. }
        | ParleyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self.0, "request rejected");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                kind: self.0.error_type(),
                message: self.0.user_message(),
            },
        };
        (status, Json(body)).into_response()
    }
}
