// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message operations. Messages are append-only.

use parley_core::ParleyError;
use parley_core::types::Message;
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};
use crate::queries::parse_text_column;

fn row_to_message(row: &Row<'_>) -> Result<Message, rusqlite::Error> {
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        role: parse_text_column(2, row.get(2)?)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub async fn insert_message(db: &Database, msg: &Message) -> Result<(), ParleyError> {
    let msg = msg.clone();
    let role = msg.role.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO messages (id, conversation_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![msg.id, msg.conversation_id, role, msg.content, msg.created_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_message(db: &Database, id: &str) -> Result<Option<Message>, ParleyError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Message>, rusqlite::Error> {
            conn.query_row(
                "SELECT id, conversation_id, role, content, created_at
                 FROM messages WHERE id = ?1",
                params![id],
                row_to_message,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Messages of a conversation in insertion order.
///
/// `rowid` breaks ties between messages written within the same millisecond.
pub async fn list_messages(db: &Database, conversation_id: &str) -> Result<Vec<Message>, ParleyError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Message>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, role, content, created_at
                 FROM messages WHERE conversation_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt.query_map(params![conversation_id], row_to_message)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
