// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence trait for users, sources, and subscriptions.

use async_trait::async_trait;

use crate::error::FeedbotError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    BulkOutcome, ChatId, Registration, Source, Subscription, SubscriptionDefaults,
    SubscriptionEntry, User,
};

/// Adapter for the subscription store.
///
/// Every mutating method is a single atomic unit on the backend. Methods
/// that address a row by id return `false` (or `None`) when the row does
/// not exist instead of failing.
#[async_trait]
pub trait SubscriptionStore: PluginAdapter {
    /// Initializes the storage backend (migrations, connection setup).
    async fn initialize(&self) -> Result<(), FeedbotError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), FeedbotError>;

    async fn find_or_create_user(&self, chat: ChatId) -> Result<User, FeedbotError>;

    /// Returns the source for `link`, creating it on first sight.
    async fn find_or_create_source(
        &self,
        link: &str,
        title: Option<&str>,
    ) -> Result<Source, FeedbotError>;

    async fn get_source(&self, id: i64) -> Result<Option<Source>, FeedbotError>;

    async fn get_source_by_link(&self, link: &str) -> Result<Option<Source>, FeedbotError>;

    /// Subscribes `owner` to `source_id`. An existing pair is left untouched
    /// and reported as [`Registration::Existing`].
    async fn register_subscription(
        &self,
        owner: ChatId,
        source_id: i64,
        defaults: &SubscriptionDefaults,
    ) -> Result<Registration, FeedbotError>;

    async fn get_subscription(&self, id: i64) -> Result<Option<Subscription>, FeedbotError>;

    async fn find_subscription(
        &self,
        owner: ChatId,
        source_id: i64,
    ) -> Result<Option<Subscription>, FeedbotError>;

    /// All subscriptions of `owner`, ordered by source id.
    async fn list_subscriptions(
        &self,
        owner: ChatId,
    ) -> Result<Vec<SubscriptionEntry>, FeedbotError>;

    /// Sources of `owner` whose effective error count has reached `threshold`.
    async fn list_error_sources(
        &self,
        owner: ChatId,
        threshold: i64,
    ) -> Result<Vec<Source>, FeedbotError>;

    async fn delete_subscription(
        &self,
        owner: ChatId,
        subscription_id: i64,
    ) -> Result<bool, FeedbotError>;

    async fn delete_subscription_for_source(
        &self,
        owner: ChatId,
        source_id: i64,
    ) -> Result<bool, FeedbotError>;

    async fn delete_all_subscriptions(&self, owner: ChatId) -> Result<BulkOutcome, FeedbotError>;

    async fn set_tags(&self, subscription_id: i64, tags: &[String]) -> Result<bool, FeedbotError>;

    async fn set_interval(
        &self,
        subscription_id: i64,
        interval_minutes: u32,
    ) -> Result<bool, FeedbotError>;

    /// Flips the effective notification state, resolving `Default` against
    /// `default_on`.
    async fn toggle_notification(
        &self,
        subscription_id: i64,
        default_on: bool,
    ) -> Result<bool, FeedbotError>;

    /// Flips the effective telegraph state, resolving `Default` against
    /// `default_on`.
    async fn toggle_telegraph(
        &self,
        subscription_id: i64,
        default_on: bool,
    ) -> Result<bool, FeedbotError>;

    /// Flips fetching for a source without touching its raw error count.
    async fn toggle_source_enabled(
        &self,
        source_id: i64,
        threshold: i64,
    ) -> Result<bool, FeedbotError>;

    /// Disables fetching for every enabled source `owner` subscribes to.
    /// Returns the number of sources changed.
    async fn pause_all(&self, owner: ChatId, threshold: i64) -> Result<usize, FeedbotError>;

    /// Re-enables fetching for every source `owner` subscribes to.
    /// Returns the number of sources changed.
    async fn resume_all(&self, owner: ChatId, threshold: i64) -> Result<usize, FeedbotError>;

    /// Records one failed fetch. Called by the fetch scheduler.
    async fn record_fetch_failure(&self, source_id: i64) -> Result<bool, FeedbotError>;

    /// Clears the error history after a successful fetch. Called by the
    /// fetch scheduler.
    async fn record_fetch_success(&self, source_id: i64) -> Result<bool, FeedbotError>;
}
