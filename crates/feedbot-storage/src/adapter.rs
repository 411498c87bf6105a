// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the SubscriptionStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use feedbot_config::model::StorageConfig;
use feedbot_core::{
    AdapterType, BulkOutcome, ChatId, FeedbotError, HealthStatus, PluginAdapter, Registration,
    Source, Subscription, SubscriptionDefaults, SubscriptionEntry, SubscriptionStore, User,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed subscription store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is opened on the first call to
/// [`SubscriptionStore::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, FeedbotError> {
        self.db.get().ok_or_else(|| FeedbotError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(db: &Database) -> Result<(), FeedbotError> {
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, FeedbotError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FeedbotError> {
        if let Some(db) = self.db.get() {
            Self::checkpoint(db).await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for SqliteStorage {
    async fn initialize(&self) -> Result<(), FeedbotError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| FeedbotError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), FeedbotError> {
        Self::checkpoint(self.db()?).await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Users ---

    async fn find_or_create_user(&self, chat: ChatId) -> Result<User, FeedbotError> {
        queries::users::find_or_create_user(self.db()?, chat).await
    }

    // --- Sources ---

    async fn find_or_create_source(
        &self,
        link: &str,
        title: Option<&str>,
    ) -> Result<Source, FeedbotError> {
        queries::sources::find_or_create_source(self.db()?, link, title).await
    }

    async fn get_source(&self, id: i64) -> Result<Option<Source>, FeedbotError> {
        queries::sources::get_source(self.db()?, id).await
    }

    async fn get_source_by_link(&self, link: &str) -> Result<Option<Source>, FeedbotError> {
        queries::sources::get_source_by_link(self.db()?, link).await
    }

    async fn list_error_sources(
        &self,
        owner: ChatId,
        threshold: i64,
    ) -> Result<Vec<Source>, FeedbotError> {
        queries::sources::list_error_sources(self.db()?, owner, threshold).await
    }

    async fn toggle_source_enabled(
        &self,
        source_id: i64,
        threshold: i64,
    ) -> Result<bool, FeedbotError> {
        queries::sources::toggle_source_enabled(self.db()?, source_id, threshold).await
    }

    async fn pause_all(&self, owner: ChatId, threshold: i64) -> Result<usize, FeedbotError> {
        queries::sources::pause_all(self.db()?, owner, threshold).await
    }

    async fn resume_all(&self, owner: ChatId, threshold: i64) -> Result<usize, FeedbotError> {
        queries::sources::resume_all(self.db()?, owner, threshold).await
    }

    async fn record_fetch_failure(&self, source_id: i64) -> Result<bool, FeedbotError> {
        queries::sources::record_fetch_failure(self.db()?, source_id).await
    }

    async fn record_fetch_success(&self, source_id: i64) -> Result<bool, FeedbotError> {
        queries::sources::record_fetch_success(self.db()?, source_id).await
    }

    // --- Subscriptions ---

    async fn register_subscription(
        &self,
        owner: ChatId,
        source_id: i64,
        defaults: &SubscriptionDefaults,
    ) -> Result<Registration, FeedbotError> {
        queries::subscriptions::register_subscription(self.db()?, owner, source_id, defaults).await
    }

    async fn get_subscription(&self, id: i64) -> Result<Option<Subscription>, FeedbotError> {
        queries::subscriptions::get_subscription(self.db()?, id).await
    }

    async fn find_subscription(
        &self,
        owner: ChatId,
        source_id: i64,
    ) -> Result<Option<Subscription>, FeedbotError> {
        queries::subscriptions::find_subscription(self.db()?, owner, source_id).await
    }

    async fn list_subscriptions(
        &self,
        owner: ChatId,
    ) -> Result<Vec<SubscriptionEntry>, FeedbotError> {
        queries::subscriptions::list_subscriptions(self.db()?, owner).await
    }

    async fn delete_subscription(
        &self,
        owner: ChatId,
        subscription_id: i64,
    ) -> Result<bool, FeedbotError> {
        queries::subscriptions::delete_subscription(self.db()?, owner, subscription_id).await
    }

    async fn delete_subscription_for_source(
        &self,
        owner: ChatId,
        source_id: i64,
    ) -> Result<bool, FeedbotError> {
        queries::subscriptions::delete_subscription_for_source(self.db()?, owner, source_id).await
    }

    async fn delete_all_subscriptions(&self, owner: ChatId) -> Result<BulkOutcome, FeedbotError> {
        queries::subscriptions::delete_all_subscriptions(self.db()?, owner).await
    }

    async fn set_tags(&self, subscription_id: i64, tags: &[String]) -> Result<bool, FeedbotError> {
        queries::subscriptions::set_tags(self.db()?, subscription_id, tags).await
    }

    async fn set_interval(
        &self,
        subscription_id: i64,
        interval_minutes: u32,
    ) -> Result<bool, FeedbotError> {
        queries::subscriptions::set_interval(self.db()?, subscription_id, interval_minutes).await
    }

    async fn toggle_notification(
        &self,
        subscription_id: i64,
        default_on: bool,
    ) -> Result<bool, FeedbotError> {
        queries::subscriptions::toggle_notification(self.db()?, subscription_id, default_on).await
    }

    async fn toggle_telegraph(
        &self,
        subscription_id: i64,
        default_on: bool,
    ) -> Result<bool, FeedbotError> {
        queries::subscriptions::toggle_telegraph(self.db()?, subscription_id, default_on).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedbot_core::Toggle;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn sqlite_storage_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_opens_database_at_configured_path() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("init_test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err(), "second initialize should fail");
    }

    #[tokio::test]
    async fn operations_fail_before_initialize() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("no_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert!(storage.health_check().await.is_err());
        let err = storage.get_source(1).await.unwrap_err();
        assert!(err.is_collaborator_failure());
    }

    #[tokio::test]
    async fn subscription_lifecycle_through_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("lifecycle.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);

        let owner = ChatId(77);
        let user = storage.find_or_create_user(owner).await.unwrap();
        assert_eq!(user.chat_id, owner);

        let source = storage
            .find_or_create_source("https://blog.example/atom.xml", Some("Blog"))
            .await
            .unwrap();
        let defaults = SubscriptionDefaults {
            interval_minutes: 15,
            notification: Toggle::On,
            telegraph: Toggle::On,
        };
        let registration = storage
            .register_subscription(owner, source.id, &defaults)
            .await
            .unwrap();
        let sub_id = registration.subscription().id;

        assert!(storage.toggle_telegraph(sub_id, true).await.unwrap());
        assert!(storage.set_tags(sub_id, &["tech".to_string()]).await.unwrap());
        let listed = storage.list_subscriptions(owner).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].source.title, "Blog");
        assert_eq!(listed[0].subscription.telegraph, Toggle::Off);
        assert_eq!(listed[0].subscription.tags, vec!["tech"]);

        assert!(storage.delete_subscription(owner, sub_id).await.unwrap());
        storage.close().await.unwrap();
        storage.shutdown().await.unwrap();
    }
}
