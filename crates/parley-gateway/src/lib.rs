// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for Parley.
//!
//! Exposes the chat turn endpoint (streamed as chunked `text/plain` or
//! returned as JSON), a conversation transcript route, and a health probe.

pub mod error;
pub mod handlers;
pub mod server;

pub use error::{ApiError, ErrorResponse, status_for};
pub use handlers::{CONVERSATION_HEADER, USER_HEADER};
pub use server::{GatewayState, router, serve};
