// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local mirror of every record the gateway has written or read.
//!
//! Lost on restart. Messages are kept per conversation in insertion order
//! and references per message in display order.

use dashmap::DashMap;

use parley_core::types::{Conversation, Memory, Message, Reference, User};

#[derive(Debug, Default)]
pub struct FallbackStore {
    users: DashMap<String, User>,
    user_ids_by_email: DashMap<String, String>,
    conversations: DashMap<String, Conversation>,
    messages: DashMap<String, Vec<Message>>,
    message_conversation: DashMap<String, String>,
    memories: DashMap<String, Memory>,
    references: DashMap<String, Vec<Reference>>,
}

impl FallbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_user(&self, user: User) {
        self.user_ids_by_email
            .insert(user.email.to_lowercase(), user.id.clone());
        self.users.insert(user.id.clone(), user);
    }

    pub fn user(&self, id: &str) -> Option<User> {
        self.users.get(id).map(|u| u.clone())
    }

    pub fn user_by_email(&self, email: &str) -> Option<User> {
        let id = self.user_ids_by_email.get(&email.to_lowercase())?.clone();
        self.user(&id)
    }

    pub fn put_conversation(&self, conversation: Conversation) {
        self.conversations
            .insert(conversation.id.clone(), conversation);
    }

    pub fn conversation(&self, id: &str) -> Option<Conversation> {
        self.conversations.get(id).map(|c| c.clone())
    }

    /// Most recently updated first.
    pub fn conversations_for(&self, owner_user_id: &str) -> Vec<Conversation> {
        let mut found: Vec<Conversation> = self
            .conversations
            .iter()
            .filter(|c| c.owner_user_id == owner_user_id)
            .map(|c| c.clone())
            .collect();
        found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        found
    }

    /// Appends a message, or replaces it in place if the id is known.
    pub fn put_message(&self, message: Message) {
        self.message_conversation
            .insert(message.id.clone(), message.conversation_id.clone());
        let mut thread = self
            .messages
            .entry(message.conversation_id.clone())
            .or_default();
        match thread.iter_mut().find(|m| m.id == message.id) {
            Some(existing) => *existing = message,
            None => thread.push(message),
        }
    }

    pub fn message(&self, id: &str) -> Option<Message> {
        let conversation_id = self.message_conversation.get(id)?.clone();
        let thread = self.messages.get(&conversation_id)?;
        thread.iter().find(|m| m.id == id).cloned()
    }

    pub fn messages_for(&self, conversation_id: &str) -> Vec<Message> {
        self.messages
            .get(conversation_id)
            .map(|thread| thread.clone())
            .unwrap_or_default()
    }

    pub fn put_memory(&self, memory: Memory) {
        self.memories.insert(memory.id.clone(), memory);
    }

    pub fn memory(&self, id: &str) -> Option<Memory> {
        self.memories.get(id).map(|m| m.clone())
    }

    /// Most recently updated first.
    pub fn memories_for(&self, owner_user_id: &str) -> Vec<Memory> {
        let mut found: Vec<Memory> = self
            .memories
            .iter()
            .filter(|m| m.owner_user_id == owner_user_id)
            .map(|m| m.clone())
            .collect();
        found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        found
    }

    /// Replaces the reference set of the message they belong to.
    pub fn put_references(&self, message_id: &str, references: Vec<Reference>) {
        let mut references = references;
        references.sort_by_key(|r| r.display_order);
        self.references.insert(message_id.to_string(), references);
    }

    pub fn references_for(&self, message_id: &str) -> Vec<Reference> {
        self.references
            .get(message_id)
            .map(|refs| refs.clone())
            .unwrap_or_default()
    }
}
