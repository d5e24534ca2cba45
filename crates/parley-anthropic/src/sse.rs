// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE parser for streamed Messages API responses.
//!
//! Converts the response byte stream into typed [`StreamEvent`]s using
//! `eventsource-stream`. Event types this crate does not use are skipped.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use serde::de::DeserializeOwned;

use parley_core::{GenerationErrorKind, ParleyError};

use crate::types::{ApiErrorResponse, SseContentBlockDelta, SseMessageDelta, SseMessageStart};

/// Typed SSE events from the Messages API.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    MessageStart(SseMessageStart),
    ContentBlockDelta(SseContentBlockDelta),
    MessageDelta(SseMessageDelta),
    MessageStop,
    Ping,
    Error(ApiErrorResponse),
}

pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ParleyError>> + Send>>;

fn parse<T: DeserializeOwned>(event: &str, data: &str) -> Result<T, ParleyError> {
    serde_json::from_str(data).map_err(|e| {
        ParleyError::generation(
            GenerationErrorKind::ServerError,
            format!("failed to parse {event} event: {e}"),
        )
    })
}

/// Parses a streaming response into [`StreamEvent`]s.
pub fn parse_sse_stream(response: reqwest::Response) -> EventStream {
    let events = response.bytes_stream().eventsource();

    let mapped = events.filter_map(|result| async move {
        match result {
            Ok(event) => {
                let parsed = match event.event.as_str() {
                    "message_start" => {
                        parse(&event.event, &event.data).map(StreamEvent::MessageStart)
                    }
                    "content_block_delta" => {
                        parse(&event.event, &event.data).map(StreamEvent::ContentBlockDelta)
                    }
                    "message_delta" => {
                        parse(&event.event, &event.data).map(StreamEvent::MessageDelta)
                    }
                    "message_stop" => Ok(StreamEvent::MessageStop),
                    "ping" => Ok(StreamEvent::Ping),
                    "error" => parse(&event.event, &event.data).map(StreamEvent::Error),
                    // content_block_start/stop and future event types.
                    _ => return None,
                };
                Some(parsed)
            }
            Err(e) => Some(Err(ParleyError::generation(
                GenerationErrorKind::ServerError,
                format!("SSE stream error: {e}"),
            ))),
        }
    });

    Box::pin(mapped)
}
