// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of [`PrimaryStore`].

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use parley_config::model::StorageConfig;
use parley_core::types::{Conversation, Memory, Message, Reference, User};
use parley_core::{AdapterType, HealthStatus, ParleyError, PluginAdapter, PrimaryStore};

use crate::database::Database;
use crate::queries;

/// SQLite-backed primary store.
///
/// The database is opened by [`SqliteStore::initialize`]; every other call
/// fails with a storage error until then.
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// The connection is not opened until [`SqliteStore::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Opens the database and runs migrations.
    pub async fn initialize(&self) -> Result<(), ParleyError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| ParleyError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    fn db(&self) -> Result<&Database, ParleyError> {
        self.db.get().ok_or_else(|| ParleyError::Storage {
            source: "storage not initialized, call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl PrimaryStore for SqliteStore {
    async fn insert_user(&self, user: &User) -> Result<(), ParleyError> {
        queries::users::insert_user(self.db()?, user).await
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, ParleyError> {
        queries::users::get_user(self.db()?, id).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, ParleyError> {
        queries::users::get_user_by_email(self.db()?, email).await
    }

    async fn update_user(&self, user: &User) -> Result<bool, ParleyError> {
        queries::users::update_user(self.db()?, user).await
    }

    async fn insert_conversation(&self, conversation: &Conversation) -> Result<(), ParleyError> {
        queries::conversations::insert_conversation(self.db()?, conversation).await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, ParleyError> {
        queries::conversations::get_conversation(self.db()?, id).await
    }

    async fn update_conversation(&self, conversation: &Conversation) -> Result<bool, ParleyError> {
        queries::conversations::update_conversation(self.db()?, conversation).await
    }

    async fn list_conversations(
        &self,
        owner_user_id: &str,
    ) -> Result<Vec<Conversation>, ParleyError> {
        queries::conversations::list_conversations(self.db()?, owner_user_id).await
    }

    async fn insert_message(&self, message: &Message) -> Result<(), ParleyError> {
        queries::messages::insert_message(self.db()?, message).await
    }

    async fn get_message(&self, id: &str) -> Result<Option<Message>, ParleyError> {
        queries::messages::get_message(self.db()?, id).await
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, ParleyError> {
        queries::messages::list_messages(self.db()?, conversation_id).await
    }

    async fn insert_memory(&self, memory: &Memory) -> Result<(), ParleyError> {
        queries::memories::insert_memory(self.db()?, memory).await
    }

    async fn get_memory(&self, id: &str) -> Result<Option<Memory>, ParleyError> {
        queries::memories::get_memory(self.db()?, id).await
    }

    async fn update_memory(&self, memory: &Memory) -> Result<bool, ParleyError> {
        queries::memories::update_memory(self.db()?, memory).await
    }

    async fn list_memories(&self, owner_user_id: &str) -> Result<Vec<Memory>, ParleyError> {
        queries::memories::list_memories(self.db()?, owner_user_id).await
    }

    async fn insert_references(&self, references: &[Reference]) -> Result<(), ParleyError> {
        queries::references::insert_references(self.db()?, references).await
    }

    async fn list_references(&self, message_id: &str) -> Result<Vec<Reference>, ParleyError> {
        queries::references::list_references(self.db()?, message_id).await
    }
}
