// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-term memory CRUD operations.

use parley_core::ParleyError;
use parley_core::types::Memory;
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};

fn row_to_memory(row: &Row<'_>) -> Result<Memory, rusqlite::Error> {
    Ok(Memory {
        id: row.get(0)?,
        owner_user_id: row.get(1)?,
        content: row.get(2)?,
        category: row.get(3)?,
        importance: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

pub async fn insert_memory(db: &Database, memory: &Memory) -> Result<(), ParleyError> {
    let memory = memory.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO memories (id, owner_user_id, content, category, importance, \
                 created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    memory.id,
                    memory.owner_user_id,
                    memory.content,
                    memory.category,
                    memory.importance,
                    memory.created_at,
                    memory.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_memory(db: &Database, id: &str) -> Result<Option<Memory>, ParleyError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Memory>, rusqlite::Error> {
            conn.query_row(
                "SELECT id, owner_user_id, content, category, importance, created_at, updated_at
                 FROM memories WHERE id = ?1",
                params![id],
                row_to_memory,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn update_memory(db: &Database, memory: &Memory) -> Result<bool, ParleyError> {
    let memory = memory.clone();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE memories SET content = ?2, category = ?3, importance = ?4, updated_at = ?5
                 WHERE id = ?1",
                params![
                    memory.id,
                    memory.content,
                    memory.category,
                    memory.importance,
                    memory.updated_at,
                ],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Memories owned by `owner_user_id`, most recently updated first.
pub async fn list_memories(db: &Database, owner_user_id: &str) -> Result<Vec<Memory>, ParleyError> {
    let owner = owner_user_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Memory>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, owner_user_id, content, category, importance, created_at, updated_at
                 FROM memories WHERE owner_user_id = ?1
                 ORDER BY updated_at DESC, rowid DESC",
            )?;
            let rows = stmt.query_map(params![owner], row_to_memory)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
