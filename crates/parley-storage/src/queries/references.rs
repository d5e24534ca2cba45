// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Web references cited by assistant messages.

use parley_core::ParleyError;
use parley_core::types::Reference;
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Inserts a batch of references in one transaction.
pub async fn insert_references(db: &Database, references: &[Reference]) -> Result<(), ParleyError> {
    if references.is_empty() {
        return Ok(());
    }
    let references = references.to_vec();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO message_references (id, message_id, url, title, snippet, \
                     source_label, published_at, display_order)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )?;
                for r in &references {
                    stmt.execute(params![
                        r.id,
                        r.message_id,
                        r.url,
                        r.title,
                        r.snippet,
                        r.source_label,
                        r.published_at,
                        r.display_order,
                    ])?;
                }
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// References of a message ordered by `display_order`.
pub async fn list_references(db: &Database, message_id: &str) -> Result<Vec<Reference>, ParleyError> {
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Reference>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, message_id, url, title, snippet, source_label, published_at, \
                 display_order
                 FROM message_references WHERE message_id = ?1
                 ORDER BY display_order ASC",
            )?;
            let rows = stmt.query_map(params![message_id], |row| {
                Ok(Reference {
                    id: row.get(0)?,
                    message_id: row.get(1)?,
                    url: row.get(2)?,
                    title: row.get(3)?,
                    snippet: row.get(4)?,
                    source_label: row.get(5)?,
                    published_at: row.get(6)?,
                    display_order: row.get(7)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
