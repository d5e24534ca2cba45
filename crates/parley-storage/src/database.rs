// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements run on tokio-rusqlite's single background thread, which
//! also serializes writes.

use std::path::Path;

use parley_core::ParleyError;
use tracing::{debug, info};

/// Handle to the SQLite database backing the primary store.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path`, applies PRAGMAs and
    /// runs pending migrations.
    ///
    /// `":memory:"` opens a private in-memory database.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, ParleyError> {
        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| ParleyError::Storage {
                        source: Box::new(e),
                    })?;
                }
            }
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| ParleyError::Storage {
                source: Box::new(e),
            })?;

        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            if wal_mode {
                conn.execute_batch("PRAGMA journal_mode = WAL;")?;
            }
            conn.execute_batch(
                "PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA foreign_keys = ON;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
        debug!(path, wal_mode, "database pragmas applied");

        let migrated = conn
            .call(|conn| -> Result<Result<usize, String>, rusqlite::Error> {
                Ok(crate::migrations::run_migrations(conn))
            })
            .await
            .map_err(map_tr_err)?;
        let applied = migrated.map_err(|e| ParleyError::Storage { source: e.into() })?;
        info!(path, applied, "database opened");

        Ok(Self { conn })
    }

    /// The underlying async connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoints the WAL so the main database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), ParleyError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Maps a tokio-rusqlite error onto [`ParleyError::Storage`].
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> ParleyError {
    ParleyError::Storage {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_creates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("parley.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();

        let tables: Vec<String> = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .unwrap();

        for table in ["conversations", "memories", "message_references", "messages", "users"] {
            assert!(tables.iter().any(|t| t == table), "missing table {table}");
        }
        assert!(path.exists());
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parley.db");
        let path = path.to_str().unwrap();
        Database::open(path, true).await.unwrap().checkpoint().await.unwrap();
        Database::open(path, true).await.unwrap();
    }

    #[tokio::test]
    async fn in_memory_database_opens() {
        Database::open(":memory:", false).await.unwrap();
    }
}
