// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query functions, one module per table.

pub mod conversations;
pub mod memories;
pub mod messages;
pub mod references;
pub mod users;

use std::str::FromStr;

use rusqlite::types::Type;

/// Parses a TEXT column into a strum-backed enum.
pub(crate) fn parse_text_column<T>(idx: usize, raw: String) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    T::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
