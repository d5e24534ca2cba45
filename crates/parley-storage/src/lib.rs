// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence for Parley.
//!
//! [`PersistenceGateway`] is the only storage API the rest of the workspace
//! uses. It fronts a [`SqliteStore`] (WAL-mode SQLite with embedded
//! migrations, accessed through tokio-rusqlite) and mirrors every record
//! into a process-local [`FallbackStore`].

pub mod database;
pub mod fallback;
pub mod gateway;
pub mod migrations;
pub mod queries;
pub mod sqlite;

pub use database::Database;
pub use fallback::FallbackStore;
pub use gateway::PersistenceGateway;
pub use sqlite::SqliteStore;
