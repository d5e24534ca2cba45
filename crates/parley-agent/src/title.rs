// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation titles: a provisional one at creation, rewritten once by the
//! utility model after the first turn.

use std::sync::Arc;

use parley_core::types::{ChatMessage, ProviderRequest};
use parley_core::{ParleyError, ProviderAdapter};

pub const DEFAULT_TITLE: &str = "New chat";

const PROVISIONAL_MAX_CHARS: usize = 48;
const TITLE_MAX_CHARS: usize = 60;

fn title_prompt(first_message: &str) -> String {
    format!(
        "Write a short title (at most six words) for a conversation that starts with the message below. Reply with the title only, without quotes.\n\nMessage: {0}",
        first_message
    )
}

/// First line of the opening message, shortened on a word boundary.
pub fn provisional_title(first_message: &str) -> String {
    let line = first_message.lines().map(str::trim).find(|l| !l.is_empty());
    let Some(line) = line else {
        return DEFAULT_TITLE.to_string();
    };
    if line.chars().count() <= PROVISIONAL_MAX_CHARS {
        return line.to_string();
    }
    let cut: String = line.chars().take(PROVISIONAL_MAX_CHARS).collect();
    let cut = match cut.rfind(' ') {
        Some(idx) if idx > PROVISIONAL_MAX_CHARS / 2 => &cut[..idx],
        _ => cut.as_str(),
    };
    format!("{}...", cut.trim_end())
}

/// Normalizes a model-written title; `None` if nothing usable remains.
pub fn clean_title(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let line = line
        .trim_start_matches("Title:")
        .trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '*' | '#'))
        .trim()
        .trim_end_matches('.');
    if line.is_empty() {
        return None;
    }
    Some(line.chars().take(TITLE_MAX_CHARS).collect())
}

/// Asks the utility model for a conversation title.
pub struct TitleWriter {
    provider: Arc<dyn ProviderAdapter>,
    model: String,
}

impl TitleWriter {
    pub fn new(provider: Arc<dyn ProviderAdapter>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub async fn write_title(&self, first_message: &str) -> Result<Option<String>, ParleyError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(title_prompt(first_message))],
            max_tokens: 32,
            temperature: Some(0.3),
            stream: false,
        };
        let response = self.provider.complete(request).await?;
        Ok(clean_title(&response.content))
    }
}
