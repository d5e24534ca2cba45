// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation CRUD operations.

use parley_core::ParleyError;
use parley_core::types::Conversation;
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};

fn row_to_conversation(row: &Row<'_>) -> Result<Conversation, rusqlite::Error> {
    Ok(Conversation {
        id: row.get(0)?,
        title: row.get(1)?,
        owner_user_id: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

pub async fn insert_conversation(db: &Database, conv: &Conversation) -> Result<(), ParleyError> {
    let conv = conv.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO conversations (id, title, owner_user_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    conv.id,
                    conv.title,
                    conv.owner_user_id,
                    conv.created_at,
                    conv.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_conversation(db: &Database, id: &str) -> Result<Option<Conversation>, ParleyError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Conversation>, rusqlite::Error> {
            conn.query_row(
                "SELECT id, title, owner_user_id, created_at, updated_at
                 FROM conversations WHERE id = ?1",
                params![id],
                row_to_conversation,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn update_conversation(db: &Database, conv: &Conversation) -> Result<bool, ParleyError> {
    let conv = conv.clone();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE conversations SET title = ?2, updated_at = ?3 WHERE id = ?1",
                params![conv.id, conv.title, conv.updated_at],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Conversations owned by `owner_user_id`, most recently updated first.
pub async fn list_conversations(
    db: &Database,
    owner_user_id: &str,
) -> Result<Vec<Conversation>, ParleyError> {
    let owner = owner_user_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Conversation>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, title, owner_user_id, created_at, updated_at
                 FROM conversations WHERE owner_user_id = ?1
                 ORDER BY updated_at DESC, rowid DESC",
            )?;
            let rows = stmt.query_map(params![owner], row_to_conversation)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
