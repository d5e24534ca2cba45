// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt construction.
//!
//! Order: stamped base instruction, memory block, message history, then the
//! web grounding block as a trailing system message.

use chrono::{DateTime, Utc};

use parley_config::model::AgentConfig;
use parley_core::types::{ChatMessage, Memory, WebContext};
use parley_memory::format_memory_block;

/// The unstamped base instruction for the assistant.
#[derive(Debug, Clone)]
pub struct BaseInstruction {
    text: String,
    locale: String,
}

impl BaseInstruction {
    /// Uses `agent.system_prompt` when set, otherwise a default persona.
    pub fn from_config(config: &AgentConfig) -> Self {
        let text = match config.system_prompt.as_deref().map(str::trim) {
            Some(prompt) if !prompt.is_empty() => prompt.to_string(),
            _ => format!(
                "You are {}, a helpful and concise assistant. When web search results \
                 are provided, ground your answer in them and cite sources inline by number.",
                config.name
            ),
        };
        Self {
            text,
            locale: config.locale.clone(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The instruction with the current time and locale appended.
    pub fn stamped(&self, now: DateTime<Utc>) -> String {
        format!(
            "{}\n\nCurrent date and time: {} (UTC).\nUser locale: {}. Reply in the language the user writes in.",
            self.text,
            now.format("%A, %B %-d, %Y %H:%M"),
            self.locale
        )
    }
}

/// Builds the message list sent to the provider.
pub fn build_prompt(
    base: &BaseInstruction,
    now: DateTime<Utc>,
    memories: &[Memory],
    history: &[ChatMessage],
    web: Option<&WebContext>,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 3);
    messages.push(ChatMessage::system(base.stamped(now)));
    if !memories.is_empty() {
        messages.push(ChatMessage::system(format_memory_block(memories)));
    }
    messages.extend(history.iter().cloned());
    if let Some(web) = web {
        messages.push(ChatMessage::system(web.text.clone()));
    }
    messages
}
