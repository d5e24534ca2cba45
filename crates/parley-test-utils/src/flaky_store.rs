// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A [`PrimaryStore`] wrapper whose calls can be made to fail on demand.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use parley_core::types::{Conversation, Memory, Message, Reference, User};
use parley_core::{AdapterType, HealthStatus, ParleyError, PluginAdapter, PrimaryStore};

/// Delegates to an inner store until [`FlakyStore::set_failing`] is
/// switched on, then errors on every call. Counts calls either way.
pub struct FlakyStore {
    inner: Arc<dyn PrimaryStore>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn PrimaryStore>) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of data calls received (successful or not).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn gate(&self) -> Result<(), ParleyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ParleyError::Storage {
                source: "injected primary failure".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for FlakyStore {
    fn name(&self) -> &str {
        "flaky"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Ok(HealthStatus::Unhealthy("injected primary failure".into()));
        }
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl PrimaryStore for FlakyStore {
    async fn insert_user(&self, user: &User) -> Result<(), ParleyError> {
        self.gate()?;
        self.inner.insert_user(user).await
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, ParleyError> {
        self.gate()?;
        self.inner.get_user(id).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, ParleyError> {
        self.gate()?;
        self.inner.get_user_by_email(email).await
    }

    async fn update_user(&self, user: &User) -> Result<bool, ParleyError> {
        self.gate()?;
        self.inner.update_user(user).await
    }

    async fn insert_conversation(&self, conversation: &Conversation) -> Result<(), ParleyError> {
        self.gate()?;
        self.inner.insert_conversation(conversation).await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, ParleyError> {
        self.gate()?;
        self.inner.get_conversation(id).await
    }

    async fn update_conversation(&self, conversation: &Conversation) -> Result<bool, ParleyError> {
        self.gate()?;
        self.inner.update_conversation(conversation).await
    }

    async fn list_conversations(
        &self,
        owner_user_id: &str,
    ) -> Result<Vec<Conversation>, ParleyError> {
        self.gate()?;
        self.inner.list_conversations(owner_user_id).await
    }

    async fn insert_message(&self, message: &Message) -> Result<(), ParleyError> {
        self.gate()?;
        self.inner.insert_message(message).await
    }

    async fn get_message(&self, id: &str) -> Result<Option<Message>, ParleyError> {
        self.gate()?;
        self.inner.get_message(id).await
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, ParleyError> {
        self.gate()?;
        self.inner.list_messages(conversation_id).await
    }

    async fn insert_memory(&self, memory: &Memory) -> Result<(), ParleyError> {
        self.gate()?;
        self.inner.insert_memory(memory).await
    }

    async fn get_memory(&self, id: &str) -> Result<Option<Memory>, ParleyError> {
        self.gate()?;
        self.inner.get_memory(id).await
    }

    async fn update_memory(&self, memory: &Memory) -> Result<bool, ParleyError> {
        self.gate()?;
        self.inner.update_memory(memory).await
    }

    async fn list_memories(&self, owner_user_id: &str) -> Result<Vec<Memory>, ParleyError> {
        self.gate()?;
        self.inner.list_memories(owner_user_id).await
    }

    async fn insert_references(&self, references: &[Reference]) -> Result<(), ParleyError> {
        self.gate()?;
        self.inner.insert_references(references).await
    }

    async fn list_references(&self, message_id: &str) -> Result<Vec<Reference>, ParleyError> {
        self.gate()?;
        self.inner.list_references(message_id).await
    }
}
