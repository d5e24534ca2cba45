// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maps provider failures onto [`GenerationErrorKind`].

use parley_core::GenerationErrorKind;

fn mentions_billing(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("credit") || lower.contains("balance")
}

/// Classifies a non-success HTTP status plus its error message.
pub fn classify_status(status: u16, message: &str) -> GenerationErrorKind {
    match status {
        401 | 403 => GenerationErrorKind::Unauthorized,
        402 => GenerationErrorKind::InsufficientBalance,
        _ if mentions_billing(message) => GenerationErrorKind::InsufficientBalance,
        429 | 529 => GenerationErrorKind::RateLimit,
        _ => GenerationErrorKind::ServerError,
    }
}

/// Classifies the `error.type` of an in-stream error event.
pub fn classify_error_type(error_type: &str, message: &str) -> GenerationErrorKind {
    match error_type {
        "authentication_error" | "permission_error" => GenerationErrorKind::Unauthorized,
        "billing_error" => GenerationErrorKind::InsufficientBalance,
        _ if mentions_billing(message) => GenerationErrorKind::InsufficientBalance,
        "rate_limit_error" | "overloaded_error" => GenerationErrorKind::RateLimit,
        _ => GenerationErrorKind::ServerError,
    }
}
