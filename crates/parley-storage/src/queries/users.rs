// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User CRUD operations.

use parley_core::ParleyError;
use parley_core::types::User;
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};

const USER_COLUMNS: &str = "id, email, credential_hash, display_name, phone, bio, avatar_ref, \
                            created_at, updated_at";

fn row_to_user(row: &Row<'_>) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        credential_hash: row.get(2)?,
        display_name: row.get(3)?,
        phone: row.get(4)?,
        bio: row.get(5)?,
        avatar_ref: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

pub async fn insert_user(db: &Database, user: &User) -> Result<(), ParleyError> {
    let user = user.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO users (id, email, credential_hash, display_name, phone, bio, \
                 avatar_ref, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    user.id,
                    user.email,
                    user.credential_hash,
                    user.display_name,
                    user.phone,
                    user.bio,
                    user.avatar_ref,
                    user.created_at,
                    user.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_user(db: &Database, id: &str) -> Result<Option<User>, ParleyError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<User>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                row_to_user,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Looks a user up by email. Emails are stored lowercased.
pub async fn get_user_by_email(db: &Database, email: &str) -> Result<Option<User>, ParleyError> {
    let email = email.to_lowercase();
    db.connection()
        .call(move |conn| -> Result<Option<User>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                row_to_user,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Overwrites the mutable columns of an existing user. Returns `false` if
/// no row matched.
pub async fn update_user(db: &Database, user: &User) -> Result<bool, ParleyError> {
    let user = user.clone();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE users SET credential_hash = ?2, display_name = ?3, phone = ?4, \
                 bio = ?5, avatar_ref = ?6, updated_at = ?7 WHERE id = ?1",
                params![
                    user.id,
                    user.credential_hash,
                    user.display_name,
                    user.phone,
                    user.bio,
                    user.avatar_ref,
                    user.updated_at,
                ],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}
