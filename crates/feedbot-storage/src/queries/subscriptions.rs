// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subscription CRUD and per-subscription preference updates.

use feedbot_core::{
    BulkOutcome, ChatId, FeedbotError, Registration, Subscription, SubscriptionDefaults,
    SubscriptionEntry, Toggle,
};
use rusqlite::{Connection, OptionalExtension, params};

use crate::database::Database;
use crate::models::{
    SOURCE_COLUMNS, SUBSCRIPTION_COLUMNS, join_tags, source_from_row, subscription_from_row,
};
use crate::queries::users::ensure_user_id;

/// Column count of [`SUBSCRIPTION_COLUMNS`], where joined source columns start.
const SUBSCRIPTION_WIDTH: usize = 7;

/// A per-subscription switch column.
#[derive(Debug, Clone, Copy)]
enum Switch {
    Notification,
    Telegraph,
}

impl Switch {
    fn column(self) -> &'static str {
        match self {
            Self::Notification => "notification",
            Self::Telegraph => "telegraph",
        }
    }
}

fn select_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Subscription>> {
    conn.query_row(
        &format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions s
             JOIN users u ON u.id = s.user_id WHERE s.id = ?1"
        ),
        params![id],
        subscription_from_row,
    )
    .optional()
}

fn select_by_pair(
    conn: &Connection,
    owner: ChatId,
    source_id: i64,
) -> rusqlite::Result<Option<Subscription>> {
    conn.query_row(
        &format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions s
             JOIN users u ON u.id = s.user_id
             WHERE u.chat_id = ?1 AND s.source_id = ?2"
        ),
        params![owner.0, source_id],
        subscription_from_row,
    )
    .optional()
}

/// Subscribe `owner` to `source_id`, creating the user if needed.
///
/// Returns `NotFound` when the source does not exist. An existing pair is
/// returned untouched as [`Registration::Existing`].
pub async fn register_subscription(
    db: &Database,
    owner: ChatId,
    source_id: i64,
    defaults: &SubscriptionDefaults,
) -> Result<Registration, FeedbotError> {
    if defaults.interval_minutes == 0 {
        return Err(FeedbotError::InvalidInput(
            "The update interval must be a positive number of minutes.".to_string(),
        ));
    }
    let defaults = *defaults;
    let registration = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let source_exists = tx
                .query_row(
                    "SELECT 1 FROM sources WHERE id = ?1",
                    params![source_id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if !source_exists {
                return Ok(None);
            }

            let user_id = ensure_user_id(&tx, owner)?;
            let inserted = tx.execute(
                "INSERT INTO subscriptions
                    (user_id, source_id, interval_minutes, notification, telegraph)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(user_id, source_id) DO NOTHING",
                params![
                    user_id,
                    source_id,
                    defaults.interval_minutes,
                    defaults.notification.to_string(),
                    defaults.telegraph.to_string(),
                ],
            )?;
            let subscription = select_by_pair(&tx, owner, source_id)?;
            tx.commit()?;

            Ok(subscription.map(|s| {
                if inserted == 1 {
                    Registration::Created(s)
                } else {
                    Registration::Existing(s)
                }
            }))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    registration.ok_or_else(|| FeedbotError::not_found("source"))
}

/// Get a subscription by id.
pub async fn get_subscription(db: &Database, id: i64) -> Result<Option<Subscription>, FeedbotError> {
    db.connection()
        .call(move |conn| select_by_id(conn, id))
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the subscription pairing `owner` with `source_id`.
pub async fn find_subscription(
    db: &Database,
    owner: ChatId,
    source_id: i64,
) -> Result<Option<Subscription>, FeedbotError> {
    db.connection()
        .call(move |conn| select_by_pair(conn, owner, source_id))
        .await
        .map_err(crate::database::map_tr_err)
}

/// All subscriptions of `owner` with their sources, ordered by source id.
pub async fn list_subscriptions(
    db: &Database,
    owner: ChatId,
) -> Result<Vec<SubscriptionEntry>, FeedbotError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SUBSCRIPTION_COLUMNS}, {SOURCE_COLUMNS}
                 FROM subscriptions s
                 JOIN users u ON u.id = s.user_id
                 JOIN sources src ON src.id = s.source_id
                 WHERE u.chat_id = ?1
                 ORDER BY src.id ASC"
            ))?;
            let rows = stmt.query_map(params![owner.0], |row| {
                Ok(SubscriptionEntry {
                    subscription: subscription_from_row(row)?,
                    source: source_from_row(row, SUBSCRIPTION_WIDTH)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete one of `owner`'s subscriptions by id.
pub async fn delete_subscription(
    db: &Database,
    owner: ChatId,
    id: i64,
) -> Result<bool, FeedbotError> {
    db.connection()
        .call(move |conn| {
            let removed = conn.execute(
                "DELETE FROM subscriptions
                 WHERE id = ?1 AND user_id = (SELECT id FROM users WHERE chat_id = ?2)",
                params![id, owner.0],
            )?;
            Ok(removed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete the subscription pairing `owner` with `source_id`.
pub async fn delete_subscription_for_source(
    db: &Database,
    owner: ChatId,
    source_id: i64,
) -> Result<bool, FeedbotError> {
    db.connection()
        .call(move |conn| {
            let removed = conn.execute(
                "DELETE FROM subscriptions
                 WHERE source_id = ?1 AND user_id = (SELECT id FROM users WHERE chat_id = ?2)",
                params![source_id, owner.0],
            )?;
            Ok(removed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete every subscription of `owner` in one transaction.
pub async fn delete_all_subscriptions(
    db: &Database,
    owner: ChatId,
) -> Result<BulkOutcome, FeedbotError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let ids: Vec<i64> = {
                let mut stmt = tx.prepare(
                    "SELECT s.id FROM subscriptions s
                     JOIN users u ON u.id = s.user_id WHERE u.chat_id = ?1",
                )?;
                let rows = stmt.query_map(params![owner.0], |row| row.get(0))?;
                rows.collect::<rusqlite::Result<_>>()?
            };

            let mut outcome = BulkOutcome::default();
            for id in ids {
                match tx.execute("DELETE FROM subscriptions WHERE id = ?1", params![id])? {
                    1 => outcome.succeeded += 1,
                    _ => outcome.failed += 1,
                }
            }
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Replace the tags of a subscription.
pub async fn set_tags(db: &Database, id: i64, tags: &[String]) -> Result<bool, FeedbotError> {
    let stored = join_tags(tags);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE subscriptions SET tags = ?2 WHERE id = ?1",
                params![id, stored],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Set the fetch interval of a subscription. Zero is rejected.
pub async fn set_interval(
    db: &Database,
    id: i64,
    interval_minutes: u32,
) -> Result<bool, FeedbotError> {
    if interval_minutes == 0 {
        return Err(FeedbotError::InvalidInput(
            "The update interval must be a positive number of minutes.".to_string(),
        ));
    }
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE subscriptions SET interval_minutes = ?2 WHERE id = ?1",
                params![id, interval_minutes],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Flip a switch in one statement so concurrent toggles never lose an update.
async fn toggle_switch(
    db: &Database,
    switch: Switch,
    id: i64,
    default_on: bool,
) -> Result<bool, FeedbotError> {
    let from_default = Toggle::Default.flipped(default_on).to_string();
    let column = switch.column();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                &format!(
                    "UPDATE subscriptions SET {column} = CASE {column}
                        WHEN 'on' THEN 'off'
                        WHEN 'off' THEN 'on'
                        ELSE ?2
                     END
                     WHERE id = ?1"
                ),
                params![id, from_default],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn toggle_notification(
    db: &Database,
    id: i64,
    default_on: bool,
) -> Result<bool, FeedbotError> {
    toggle_switch(db, Switch::Notification, id, default_on).await
}

pub async fn toggle_telegraph(
    db: &Database,
    id: i64,
    default_on: bool,
) -> Result<bool, FeedbotError> {
    toggle_switch(db, Switch::Telegraph, id, default_on).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::sources::find_or_create_source;
    use crate::queries::test_support::setup_db;

    const OWNER: ChatId = ChatId(1001);

    fn defaults() -> SubscriptionDefaults {
        SubscriptionDefaults {
            interval_minutes: 10,
            notification: Toggle::On,
            telegraph: Toggle::Off,
        }
    }

    async fn subscribed(db: &Database, link: &str) -> Subscription {
        let src = find_or_create_source(db, link, None).await.unwrap();
        register_subscription(db, OWNER, src.id, &defaults())
            .await
            .unwrap()
            .subscription()
            .clone()
    }

    #[tokio::test]
    async fn register_then_reregister_is_existing() {
        let (db, _dir) = setup_db().await;
        let src = find_or_create_source(&db, "https://a.example/rss", None).await.unwrap();

        let first = register_subscription(&db, OWNER, src.id, &defaults()).await.unwrap();
        assert!(first.is_new());
        let sub = first.subscription();
        assert_eq!(sub.owner, OWNER);
        assert_eq!(sub.interval_minutes, 10);
        assert_eq!(sub.notification, Toggle::On);
        assert_eq!(sub.telegraph, Toggle::Off);
        assert!(sub.tags.is_empty());

        let second = register_subscription(&db, OWNER, src.id, &defaults()).await.unwrap();
        assert!(!second.is_new());
        assert_eq!(second.subscription().id, sub.id);
    }

    #[tokio::test]
    async fn register_unknown_source_is_not_found() {
        let (db, _dir) = setup_db().await;
        let err = register_subscription(&db, OWNER, 404, &defaults()).await.unwrap_err();
        assert!(matches!(err, FeedbotError::NotFound { .. }));
    }

    #[tokio::test]
    async fn lookups_and_listing() {
        let (db, _dir) = setup_db().await;
        let a = subscribed(&db, "https://a.example/rss").await;
        let b = subscribed(&db, "https://b.example/rss").await;

        assert_eq!(get_subscription(&db, a.id).await.unwrap(), Some(a.clone()));
        assert_eq!(find_subscription(&db, OWNER, b.source_id).await.unwrap(), Some(b.clone()));
        assert!(find_subscription(&db, ChatId(5), b.source_id).await.unwrap().is_none());

        let listed = list_subscriptions(&db, OWNER).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].subscription, a);
        assert_eq!(listed[0].source.link, "https://a.example/rss");
        assert_eq!(listed[1].source.id, b.source_id);
    }

    #[tokio::test]
    async fn delete_is_scoped_to_owner() {
        let (db, _dir) = setup_db().await;
        let sub = subscribed(&db, "https://a.example/rss").await;

        assert!(!delete_subscription(&db, ChatId(5), sub.id).await.unwrap());
        assert!(delete_subscription(&db, OWNER, sub.id).await.unwrap());
        assert!(!delete_subscription(&db, OWNER, sub.id).await.unwrap());
    }

    #[tokio::test]
    async fn delete_by_source() {
        let (db, _dir) = setup_db().await;
        let sub = subscribed(&db, "https://a.example/rss").await;

        assert!(delete_subscription_for_source(&db, OWNER, sub.source_id).await.unwrap());
        assert!(get_subscription(&db, sub.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_all_counts_rows() {
        let (db, _dir) = setup_db().await;
        subscribed(&db, "https://a.example/rss").await;
        subscribed(&db, "https://b.example/rss").await;

        let outcome = delete_all_subscriptions(&db, OWNER).await.unwrap();
        assert_eq!(outcome, BulkOutcome { succeeded: 2, failed: 0 });
        assert!(list_subscriptions(&db, OWNER).await.unwrap().is_empty());

        let empty = delete_all_subscriptions(&db, OWNER).await.unwrap();
        assert_eq!(empty, BulkOutcome::default());
    }

    #[tokio::test]
    async fn tags_and_interval_updates() {
        let (db, _dir) = setup_db().await;
        let sub = subscribed(&db, "https://a.example/rss").await;

        let tags = vec!["rust".to_string(), "news".to_string()];
        assert!(set_tags(&db, sub.id, &tags).await.unwrap());
        assert!(set_interval(&db, sub.id, 45).await.unwrap());
        let updated = get_subscription(&db, sub.id).await.unwrap().unwrap();
        assert_eq!(updated.tags, tags);
        assert_eq!(updated.interval_minutes, 45);

        assert!(!set_tags(&db, 999, &tags).await.unwrap());
        assert!(matches!(
            set_interval(&db, sub.id, 0).await,
            Err(FeedbotError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn toggles_flip_and_restore() {
        let (db, _dir) = setup_db().await;
        let sub = subscribed(&db, "https://a.example/rss").await;

        assert!(toggle_notification(&db, sub.id, true).await.unwrap());
        let once = get_subscription(&db, sub.id).await.unwrap().unwrap();
        assert_eq!(once.notification, Toggle::Off);
        assert_eq!(once.telegraph, Toggle::Off);

        assert!(toggle_notification(&db, sub.id, true).await.unwrap());
        assert!(toggle_telegraph(&db, sub.id, true).await.unwrap());
        let twice = get_subscription(&db, sub.id).await.unwrap().unwrap();
        assert_eq!(twice.notification, Toggle::On);
        assert_eq!(twice.telegraph, Toggle::On);

        assert!(!toggle_notification(&db, 999, true).await.unwrap());
    }

    #[tokio::test]
    async fn toggle_from_default_uses_configured_default() {
        let (db, _dir) = setup_db().await;
        let src = find_or_create_source(&db, "https://a.example/rss", None).await.unwrap();
        let defaults = SubscriptionDefaults {
            interval_minutes: 10,
            notification: Toggle::Default,
            telegraph: Toggle::Default,
        };
        let sub = register_subscription(&db, OWNER, src.id, &defaults)
            .await
            .unwrap()
            .subscription()
            .clone();

        toggle_notification(&db, sub.id, false).await.unwrap();
        let flipped = get_subscription(&db, sub.id).await.unwrap().unwrap();
        assert_eq!(flipped.notification, Toggle::On);
    }
}
