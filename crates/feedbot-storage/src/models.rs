// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between SQLite and the domain types in `feedbot-core`.

use std::str::FromStr;

use feedbot_core::{ChatId, Source, Subscription, Toggle, User};
use rusqlite::Row;
use rusqlite::types::Type;

pub use feedbot_core::types::{Registration, SubscriptionEntry};

pub(crate) const USER_COLUMNS: &str = "u.id, u.chat_id, u.created_at";

pub(crate) const SOURCE_COLUMNS: &str =
    "src.id, src.link, src.title, src.error_count, src.error_baseline";

/// Subscription columns; queries must join `users u` on `u.id = s.user_id`.
pub(crate) const SUBSCRIPTION_COLUMNS: &str = "s.id, u.chat_id, s.source_id, s.interval_minutes, \
     s.notification, s.telegraph, s.tags";

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        chat_id: ChatId(row.get(1)?),
        created_at: row.get(2)?,
    })
}

/// Reads a source starting at column `offset`.
pub(crate) fn source_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Source> {
    Ok(Source {
        id: row.get(offset)?,
        link: row.get(offset + 1)?,
        title: row.get(offset + 2)?,
        error_count: row.get(offset + 3)?,
        error_baseline: row.get(offset + 4)?,
    })
}

pub(crate) fn subscription_from_row(row: &Row<'_>) -> rusqlite::Result<Subscription> {
    let tags: String = row.get(6)?;
    Ok(Subscription {
        id: row.get(0)?,
        owner: ChatId(row.get(1)?),
        source_id: row.get(2)?,
        interval_minutes: row.get(3)?,
        notification: toggle_at(row, 4)?,
        telegraph: toggle_at(row, 5)?,
        tags: split_tags(&tags),
    })
}

fn toggle_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Toggle> {
    let raw: String = row.get(idx)?;
    Toggle::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Tags are stored space-separated.
pub(crate) fn join_tags(tags: &[String]) -> String {
    tags.join(" ")
}

pub(crate) fn split_tags(stored: &str) -> Vec<String> {
    stored.split_whitespace().map(str::to_string).collect()
}
