// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema migrations.
//!
//! SQL files under `migrations/` are compiled in with refinery and applied
//! whenever the database is opened.

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Applies pending migrations and returns how many ran.
///
/// Errors are flattened to strings so the caller can surface them from
/// inside a tokio-rusqlite closure.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<usize, String> {
    embedded::migrations::runner()
        .run(conn)
        .map(|report| report.applied_migrations().len())
        .map_err(|e| e.to_string())
}
