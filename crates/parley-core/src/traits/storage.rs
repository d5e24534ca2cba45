// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Primary (durable) store trait.

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Conversation, Memory, Message, Reference, User};

/// The durable relational store behind the persistence gateway.
///
/// Any `Err` returned from these methods is treated by the gateway as
/// "primary unreachable". Updates take the full, already-patched record and
/// return `false` when no row matched.
#[async_trait]
pub trait PrimaryStore: PluginAdapter {
    // --- Users ---
    async fn insert_user(&self, user: &User) -> Result<(), ParleyError>;
    async fn get_user(&self, id: &str) -> Result<Option<User>, ParleyError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, ParleyError>;
    async fn update_user(&self, user: &User) -> Result<bool, ParleyError>;

    // --- Conversations ---
    async fn insert_conversation(&self, conversation: &Conversation) -> Result<(), ParleyError>;
    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, ParleyError>;
    async fn update_conversation(&self, conversation: &Conversation) -> Result<bool, ParleyError>;
    async fn list_conversations(&self, owner_user_id: &str)
    -> Result<Vec<Conversation>, ParleyError>;

    // --- Messages ---
    async fn insert_message(&self, message: &Message) -> Result<(), ParleyError>;
    async fn get_message(&self, id: &str) -> Result<Option<Message>, ParleyError>;
    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, ParleyError>;

    // --- Memories ---
    async fn insert_memory(&self, memory: &Memory) -> Result<(), ParleyError>;
    async fn get_memory(&self, id: &str) -> Result<Option<Memory>, ParleyError>;
    async fn update_memory(&self, memory: &Memory) -> Result<bool, ParleyError>;
    async fn list_memories(&self, owner_user_id: &str) -> Result<Vec<Memory>, ParleyError>;

    // --- References ---
    async fn insert_references(&self, references: &[Reference]) -> Result<(), ParleyError>;
    async fn list_references(&self, message_id: &str) -> Result<Vec<Reference>, ParleyError>;
}
