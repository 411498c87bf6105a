// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feed sources and their fetch-enabled state.
//!
//! The fetcher owns `error_count`. Control operations only move
//! `error_baseline`, so enabling and disabling never rewrite fetch history.

use feedbot_core::{ChatId, FeedbotError, Source};
use rusqlite::{OptionalExtension, params};

use crate::database::Database;
use crate::models::{SOURCE_COLUMNS, source_from_row};

/// Sources subscribed to by the user with chat id `?1`.
const OWNER_SOURCE_IDS: &str = "SELECT s.source_id FROM subscriptions s \
     JOIN users u ON u.id = s.user_id WHERE u.chat_id = ?1";

/// Return the source for `link`, creating it on first sight.
///
/// A known title fills in a source that has none yet; an existing title
/// is never overwritten.
pub async fn find_or_create_source(
    db: &Database,
    link: &str,
    title: Option<&str>,
) -> Result<Source, FeedbotError> {
    let link = link.to_string();
    let title = title.map(str::trim).unwrap_or_default().to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sources (link, title) VALUES (?1, ?2)
                 ON CONFLICT(link) DO UPDATE SET
                    title = excluded.title,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE sources.title = '' AND excluded.title <> ''",
                params![link, title],
            )?;
            conn.query_row(
                &format!("SELECT {SOURCE_COLUMNS} FROM sources src WHERE src.link = ?1"),
                params![link],
                |row| source_from_row(row, 0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a source by id.
pub async fn get_source(db: &Database, id: i64) -> Result<Option<Source>, FeedbotError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {SOURCE_COLUMNS} FROM sources src WHERE src.id = ?1"),
                params![id],
                |row| source_from_row(row, 0),
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a source by its exact link.
pub async fn get_source_by_link(db: &Database, link: &str) -> Result<Option<Source>, FeedbotError> {
    let link = link.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {SOURCE_COLUMNS} FROM sources src WHERE src.link = ?1"),
                params![link],
                |row| source_from_row(row, 0),
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Sources of `owner` whose effective error count reached `threshold`.
pub async fn list_error_sources(
    db: &Database,
    owner: ChatId,
    threshold: i64,
) -> Result<Vec<Source>, FeedbotError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SOURCE_COLUMNS} FROM sources src
                 WHERE src.id IN ({OWNER_SOURCE_IDS})
                   AND src.error_count - src.error_baseline >= ?2
                 ORDER BY src.id ASC"
            ))?;
            let rows = stmt.query_map(params![owner.0, threshold], |row| source_from_row(row, 0))?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Flip fetching for one source. Returns `false` if the source does not exist.
///
/// An enabled source gets its baseline moved so the effective count sits
/// exactly at the threshold; a disabled one gets its baseline caught up
/// with the raw count.
pub async fn toggle_source_enabled(
    db: &Database,
    id: i64,
    threshold: i64,
) -> Result<bool, FeedbotError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE sources SET
                    error_baseline = CASE
                        WHEN error_count - error_baseline >= ?2 THEN error_count
                        ELSE error_count - ?2
                    END,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id, threshold],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Disable every enabled source `owner` subscribes to.
pub async fn pause_all(db: &Database, owner: ChatId, threshold: i64) -> Result<usize, FeedbotError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "UPDATE sources SET
                        error_baseline = error_count - ?2,
                        updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id IN ({OWNER_SOURCE_IDS})
                       AND error_count - error_baseline < ?2"
                ),
                params![owner.0, threshold],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Clear the effective error count of every source `owner` subscribes to.
pub async fn resume_all(db: &Database, owner: ChatId, threshold: i64) -> Result<usize, FeedbotError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "UPDATE sources SET
                        error_baseline = error_count,
                        updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id IN ({OWNER_SOURCE_IDS})
                       AND error_count - error_baseline >= ?2"
                ),
                params![owner.0, threshold],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count one failed fetch.
pub async fn record_fetch_failure(db: &Database, id: i64) -> Result<bool, FeedbotError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE sources SET error_count = error_count + 1,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Reset the error history after a successful fetch.
pub async fn record_fetch_success(db: &Database, id: i64) -> Result<bool, FeedbotError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE sources SET error_count = 0, error_baseline = 0,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use feedbot_core::{SubscriptionDefaults, Toggle};

    use super::*;
    use crate::queries::subscriptions::register_subscription;
    use crate::queries::test_support::setup_db;

    const LINK: &str = "https://example.com/feed.xml";

    fn defaults() -> SubscriptionDefaults {
        SubscriptionDefaults {
            interval_minutes: 10,
            notification: Toggle::On,
            telegraph: Toggle::On,
        }
    }

    async fn fail_times(db: &Database, id: i64, n: usize) {
        for _ in 0..n {
            assert!(record_fetch_failure(db, id).await.unwrap());
        }
    }

    #[tokio::test]
    async fn find_or_create_reuses_link() {
        let (db, _dir) = setup_db().await;

        let a = find_or_create_source(&db, LINK, None).await.unwrap();
        let b = find_or_create_source(&db, LINK, None).await.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.title, "");
    }

    #[tokio::test]
    async fn title_fills_in_once() {
        let (db, _dir) = setup_db().await;

        find_or_create_source(&db, LINK, None).await.unwrap();
        let titled = find_or_create_source(&db, LINK, Some("Example")).await.unwrap();
        assert_eq!(titled.title, "Example");
        let kept = find_or_create_source(&db, LINK, Some("Other")).await.unwrap();
        assert_eq!(kept.title, "Example");
    }

    #[tokio::test]
    async fn lookups_by_id_and_link() {
        let (db, _dir) = setup_db().await;

        let created = find_or_create_source(&db, LINK, None).await.unwrap();
        assert_eq!(get_source(&db, created.id).await.unwrap(), Some(created.clone()));
        assert_eq!(get_source_by_link(&db, LINK).await.unwrap(), Some(created));
        assert!(get_source(&db, 999).await.unwrap().is_none());
        assert!(get_source_by_link(&db, "https://nope.example/rss").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn toggle_reenables_without_touching_error_count() {
        let (db, _dir) = setup_db().await;
        let src = find_or_create_source(&db, LINK, None).await.unwrap();
        fail_times(&db, src.id, 5).await;

        let disabled = get_source(&db, src.id).await.unwrap().unwrap();
        assert!(!disabled.is_enabled(5));

        assert!(toggle_source_enabled(&db, src.id, 5).await.unwrap());
        let enabled = get_source(&db, src.id).await.unwrap().unwrap();
        assert!(enabled.is_enabled(5));
        assert_eq!(enabled.error_count, 5);

        assert!(toggle_source_enabled(&db, src.id, 5).await.unwrap());
        let again = get_source(&db, src.id).await.unwrap().unwrap();
        assert!(!again.is_enabled(5));
        assert_eq!(again.error_count, 5);
    }

    #[tokio::test]
    async fn toggle_missing_source_reports_false() {
        let (db, _dir) = setup_db().await;
        assert!(!toggle_source_enabled(&db, 42, 5).await.unwrap());
    }

    #[tokio::test]
    async fn error_sources_are_scoped_to_owner() {
        let (db, _dir) = setup_db().await;
        let owner = ChatId(1);
        let bad = find_or_create_source(&db, LINK, None).await.unwrap();
        let good = find_or_create_source(&db, "https://ok.example/rss", None).await.unwrap();
        register_subscription(&db, owner, bad.id, &defaults()).await.unwrap();
        register_subscription(&db, owner, good.id, &defaults()).await.unwrap();
        fail_times(&db, bad.id, 3).await;

        let errors = list_error_sources(&db, owner, 3).await.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].id, bad.id);
        assert!(list_error_sources(&db, ChatId(2), 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pause_and_resume_all() {
        let (db, _dir) = setup_db().await;
        let owner = ChatId(1);
        let a = find_or_create_source(&db, LINK, None).await.unwrap();
        let b = find_or_create_source(&db, "https://b.example/rss", None).await.unwrap();
        let foreign = find_or_create_source(&db, "https://c.example/rss", None).await.unwrap();
        register_subscription(&db, owner, a.id, &defaults()).await.unwrap();
        register_subscription(&db, owner, b.id, &defaults()).await.unwrap();
        register_subscription(&db, ChatId(2), foreign.id, &defaults()).await.unwrap();

        assert_eq!(pause_all(&db, owner, 10).await.unwrap(), 2);
        assert_eq!(pause_all(&db, owner, 10).await.unwrap(), 0);
        assert!(!get_source(&db, a.id).await.unwrap().unwrap().is_enabled(10));
        assert!(get_source(&db, foreign.id).await.unwrap().unwrap().is_enabled(10));

        assert_eq!(resume_all(&db, owner, 10).await.unwrap(), 2);
        let a = get_source(&db, a.id).await.unwrap().unwrap();
        assert!(a.is_enabled(10));
        assert_eq!(a.effective_errors(), 0);
    }

    #[tokio::test]
    async fn fetch_success_clears_history() {
        let (db, _dir) = setup_db().await;
        let src = find_or_create_source(&db, LINK, None).await.unwrap();
        fail_times(&db, src.id, 2).await;
        assert!(record_fetch_success(&db, src.id).await.unwrap());
        let src = get_source(&db, src.id).await.unwrap().unwrap();
        assert_eq!((src.error_count, src.error_baseline), (0, 0));
    }
}
