// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User records, created lazily on first interaction.

use feedbot_core::{ChatId, FeedbotError, User};
use rusqlite::{Connection, OptionalExtension, params};

use crate::database::Database;
use crate::models::{USER_COLUMNS, user_from_row};

/// Insert the user for `chat` if missing and return its row id.
pub(crate) fn ensure_user_id(conn: &Connection, chat: ChatId) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO users (chat_id) VALUES (?1) ON CONFLICT(chat_id) DO NOTHING",
        params![chat.0],
    )?;
    conn.query_row(
        "SELECT id FROM users WHERE chat_id = ?1",
        params![chat.0],
        |row| row.get(0),
    )
}

/// Return the user for `chat`, creating it on first sight.
pub async fn find_or_create_user(db: &Database, chat: ChatId) -> Result<User, FeedbotError> {
    db.connection()
        .call(move |conn| {
            let id = ensure_user_id(conn, chat)?;
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?1"),
                params![id],
                user_from_row,
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Look up a user without creating it.
pub async fn get_user(db: &Database, chat: ChatId) -> Result<Option<User>, FeedbotError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.chat_id = ?1"),
                params![chat.0],
                user_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;

    #[tokio::test]
    async fn find_or_create_is_idempotent() {
        let (db, _dir) = setup_db().await;

        let first = find_or_create_user(&db, ChatId(1001)).await.unwrap();
        let second = find_or_create_user(&db, ChatId(1001)).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.chat_id, ChatId(1001));

        let other = find_or_create_user(&db, ChatId(-100_200)).await.unwrap();
        assert_ne!(other.id, first.id);
    }

    #[tokio::test]
    async fn get_user_does_not_create() {
        let (db, _dir) = setup_db().await;

        assert!(get_user(&db, ChatId(7)).await.unwrap().is_none());
        find_or_create_user(&db, ChatId(7)).await.unwrap();
        assert!(get_user(&db, ChatId(7)).await.unwrap().is_some());
    }
}
