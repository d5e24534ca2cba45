// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dual-tier persistence: a durable primary store with an in-memory fallback.
//!
//! Writes go to the primary first and are always mirrored into the fallback.
//! The first primary error flips a process-wide flag; from then on the
//! primary is never called again and the fallback is the only source of
//! truth. Primary failures are logged, never returned.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, warn};

use parley_core::types::{
    Conversation, ConversationPatch, Memory, MemoryPatch, Message, NewUser, Reference, Role,
    SearchHit, User, UserPatch,
};
use parley_core::{HealthStatus, ParleyError, PrimaryStore};

use crate::fallback::FallbackStore;

/// Storage facade shared by the whole process.
pub struct PersistenceGateway {
    primary: Option<Arc<dyn PrimaryStore>>,
    primary_down: AtomicBool,
    fallback: FallbackStore,
}

impl PersistenceGateway {
    pub fn new(primary: Arc<dyn PrimaryStore>) -> Self {
        Self {
            primary: Some(primary),
            primary_down: AtomicBool::new(false),
            fallback: FallbackStore::new(),
        }
    }

    /// A gateway with no primary at all; every record lives in memory.
    pub fn in_memory() -> Self {
        Self {
            primary: None,
            primary_down: AtomicBool::new(false),
            fallback: FallbackStore::new(),
        }
    }

    /// Whether writes are still reaching the primary store.
    pub fn primary_available(&self) -> bool {
        self.primary.is_some() && !self.primary_down.load(Ordering::Acquire)
    }

    pub fn health(&self) -> HealthStatus {
        match (&self.primary, self.primary_available()) {
            (None, _) => HealthStatus::Degraded("no primary store configured".into()),
            (Some(_), true) => HealthStatus::Healthy,
            (Some(primary), false) => HealthStatus::Degraded(format!(
                "primary store `{}` unreachable, serving from in-memory fallback",
                primary.name()
            )),
        }
    }

    /// Flushes the primary store if it is still in use.
    pub async fn shutdown(&self) {
        if let Some(primary) = self.primary() {
            if let Err(e) = primary.shutdown().await {
                error!(error = %e, "primary store shutdown failed");
            }
        }
    }

    fn primary(&self) -> Option<Arc<dyn PrimaryStore>> {
        if self.primary_down.load(Ordering::Acquire) {
            return None;
        }
        self.primary.clone()
    }

    /// Converts a primary result into an `Option`, downgrading on error.
    fn settle<T>(&self, op: &'static str, result: Result<T, ParleyError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                if !self.primary_down.swap(true, Ordering::AcqRel) {
                    warn!(
                        op,
                        error = %e,
                        "primary store unreachable, switching to in-memory fallback for the rest of this process"
                    );
                } else {
                    debug!(op, error = %e, "primary store error after downgrade");
                }
                None
            }
        }
    }

    // --- Users ---

    /// Registers a user. Fails with `Conflict` if the email is taken.
    pub async fn create_user(&self, new: NewUser) -> Result<User, ParleyError> {
        let mut new = new;
        new.email = new.email.trim().to_lowercase();
        if self.find_user_by_email(&new.email).await.is_some() {
            return Err(ParleyError::Conflict(format!(
                "email `{}` is already registered",
                new.email
            )));
        }

        let user = User::from_new(new);
        if let Some(primary) = self.primary() {
            self.settle("insert_user", primary.insert_user(&user).await);
        }
        self.fallback.put_user(user.clone());
        Ok(user)
    }

    pub async fn find_user(&self, id: &str) -> Option<User> {
        if let Some(user) = self.fallback.user(id) {
            return Some(user);
        }
        let primary = self.primary()?;
        let user = self.settle("get_user", primary.get_user(id).await).flatten()?;
        self.fallback.put_user(user.clone());
        Some(user)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Option<User> {
        if let Some(user) = self.fallback.user_by_email(email) {
            return Some(user);
        }
        let primary = self.primary()?;
        let user = self
            .settle("get_user_by_email", primary.get_user_by_email(email).await)
            .flatten()?;
        self.fallback.put_user(user.clone());
        Some(user)
    }

    pub async fn update_user(&self, id: &str, patch: &UserPatch) -> Option<User> {
        let updated = self.find_user(id).await?.patched(patch);
        if let Some(primary) = self.primary() {
            self.settle("update_user", primary.update_user(&updated).await);
        }
        self.fallback.put_user(updated.clone());
        Some(updated)
    }

    // --- Conversations ---

    pub async fn create_conversation(&self, owner_user_id: &str, title: &str) -> Conversation {
        self.store_conversation(Conversation::new(owner_user_id, title))
            .await
    }

    /// Stores a conversation whose id was allocated by the caller.
    pub async fn store_conversation(&self, conversation: Conversation) -> Conversation {
        if let Some(primary) = self.primary() {
            self.settle(
                "insert_conversation",
                primary.insert_conversation(&conversation).await,
            );
        }
        self.fallback.put_conversation(conversation.clone());
        conversation
    }

    pub async fn find_conversation(&self, id: &str) -> Option<Conversation> {
        if let Some(conversation) = self.fallback.conversation(id) {
            return Some(conversation);
        }
        let primary = self.primary()?;
        let conversation = self
            .settle("get_conversation", primary.get_conversation(id).await)
            .flatten()?;
        self.fallback.put_conversation(conversation.clone());
        Some(conversation)
    }

    pub async fn update_conversation(
        &self,
        id: &str,
        patch: &ConversationPatch,
    ) -> Option<Conversation> {
        let updated = self.find_conversation(id).await?.patched(patch);
        if let Some(primary) = self.primary() {
            self.settle(
                "update_conversation",
                primary.update_conversation(&updated).await,
            );
        }
        self.fallback.put_conversation(updated.clone());
        Some(updated)
    }

    /// Conversations of one owner, most recently updated first.
    pub async fn list_conversations(&self, owner_user_id: &str) -> Vec<Conversation> {
        if let Some(primary) = self.primary() {
            if let Some(rows) = self.settle(
                "list_conversations",
                primary.list_conversations(owner_user_id).await,
            ) {
                for row in &rows {
                    self.fallback.put_conversation(row.clone());
                }
                return rows;
            }
        }
        self.fallback.conversations_for(owner_user_id)
    }

    // --- Messages ---

    pub async fn create_message(&self, conversation_id: &str, role: Role, content: &str) -> Message {
        let message = Message::new(conversation_id, role, content);
        if let Some(primary) = self.primary() {
            self.settle("insert_message", primary.insert_message(&message).await);
        }
        self.fallback.put_message(message.clone());
        message
    }

    pub async fn find_message(&self, id: &str) -> Option<Message> {
        if let Some(message) = self.fallback.message(id) {
            return Some(message);
        }
        let primary = self.primary()?;
        let message = self
            .settle("get_message", primary.get_message(id).await)
            .flatten()?;
        self.fallback.put_message(message.clone());
        Some(message)
    }

    /// Messages of a conversation in insertion order.
    pub async fn list_messages(&self, conversation_id: &str) -> Vec<Message> {
        if let Some(primary) = self.primary() {
            if let Some(rows) = self.settle(
                "list_messages",
                primary.list_messages(conversation_id).await,
            ) {
                for row in &rows {
                    self.fallback.put_message(row.clone());
                }
                return rows;
            }
        }
        self.fallback.messages_for(conversation_id)
    }

    // --- Memories ---

    pub async fn create_memory(
        &self,
        owner_user_id: &str,
        content: &str,
        category: &str,
        importance: u8,
    ) -> Memory {
        let memory = Memory::new(owner_user_id, content, category, importance);
        if let Some(primary) = self.primary() {
            self.settle("insert_memory", primary.insert_memory(&memory).await);
        }
        self.fallback.put_memory(memory.clone());
        memory
    }

    pub async fn find_memory(&self, id: &str) -> Option<Memory> {
        if let Some(memory) = self.fallback.memory(id) {
            return Some(memory);
        }
        let primary = self.primary()?;
        let memory = self
            .settle("get_memory", primary.get_memory(id).await)
            .flatten()?;
        self.fallback.put_memory(memory.clone());
        Some(memory)
    }

    pub async fn update_memory(&self, id: &str, patch: &MemoryPatch) -> Option<Memory> {
        let updated = self.find_memory(id).await?.patched(patch);
        if let Some(primary) = self.primary() {
            self.settle("update_memory", primary.update_memory(&updated).await);
        }
        self.fallback.put_memory(updated.clone());
        Some(updated)
    }

    /// Memories of one owner, most recently updated first.
    pub async fn list_memories(&self, owner_user_id: &str) -> Vec<Memory> {
        if let Some(primary) = self.primary() {
            if let Some(rows) = self.settle(
                "list_memories",
                primary.list_memories(owner_user_id).await,
            ) {
                for row in &rows {
                    self.fallback.put_memory(row.clone());
                }
                return rows;
            }
        }
        self.fallback.memories_for(owner_user_id)
    }

    // --- References ---

    /// Stores the cited sources of a message with `display_order` 0..N-1.
    pub async fn create_references(&self, message_id: &str, sources: &[SearchHit]) -> Vec<Reference> {
        let references = Reference::batch_for(message_id, sources);
        if references.is_empty() {
            return references;
        }
        if let Some(primary) = self.primary() {
            self.settle(
                "insert_references",
                primary.insert_references(&references).await,
            );
        }
        self.fallback.put_references(message_id, references.clone());
        references
    }

    /// References of a message ordered by `display_order`.
    pub async fn list_references(&self, message_id: &str) -> Vec<Reference> {
        if let Some(primary) = self.primary() {
            if let Some(rows) = self.settle(
                "list_references",
                primary.list_references(message_id).await,
            ) {
                if !rows.is_empty() {
                    self.fallback.put_references(message_id, rows.clone());
                }
                return rows;
            }
        }
        self.fallback.references_for(message_id)
    }
}
