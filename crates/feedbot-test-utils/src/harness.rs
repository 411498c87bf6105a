// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end control-plane testing.
//!
//! `TestHarness` assembles the real [`Controller`] over a temp SQLite
//! database, the XML OPML codec, and a [`MockTransport`]. Events go in
//! through `send_text()`, `send_document()`, and `press()`; the replies come
//! back for assertions.

use std::sync::Arc;

use feedbot_config::model::{FeedConfig, StorageConfig};
use feedbot_control::Controller;
use feedbot_core::{
    Actor, ChatId, ChatInfo, FeedbotError, InboundCallback, InboundEvent, InboundMessage,
    MessageContent, Reply, SubscriptionStore,
};
use feedbot_opml::XmlOpmlCodec;
use feedbot_storage::SqliteStorage;

use crate::mock_transport::MockTransport;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    feed: FeedConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            feed: FeedConfig::default(),
        }
    }

    /// Use a custom `[feed]` section.
    pub fn with_feed_config(mut self, feed: FeedConfig) -> Self {
        self.feed = feed;
        self
    }

    /// Set the error count at which a feed stops being fetched.
    pub fn with_error_threshold(mut self, threshold: i64) -> Self {
        self.feed.error_threshold = threshold;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, FeedbotError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| FeedbotError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let storage = SqliteStorage::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        });
        storage.initialize().await?;
        let storage = Arc::new(storage);

        let transport = Arc::new(MockTransport::new());
        let controller = Controller::new(
            storage.clone(),
            transport.clone(),
            Arc::new(XmlOpmlCodec),
            self.feed.clone(),
        );

        Ok(TestHarness {
            transport,
            storage,
            controller: Arc::new(controller),
            feed: self.feed,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with a mock transport and temp storage.
pub struct TestHarness {
    /// The mock transport; set up chats and admins here.
    pub transport: Arc<MockTransport>,
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    /// The controller under test.
    pub controller: Arc<Controller>,
    /// The `[feed]` section the controller was built with.
    pub feed: FeedConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with default settings.
    pub async fn new() -> Result<Self, FeedbotError> {
        Self::builder().build().await
    }

    /// `user` acting from within `chat` (a group the user is in).
    pub fn member_of(user: i64, chat: &ChatInfo) -> Actor {
        Actor {
            user_id: ChatId(user),
            chat: chat.clone(),
        }
    }

    /// Sends a text message (command or free text) and returns the replies.
    pub async fn send_text(&self, actor: &Actor, text: &str) -> Vec<Reply> {
        self.controller
            .handle(InboundEvent::Message(InboundMessage {
                actor: actor.clone(),
                message_id: 1,
                content: MessageContent::Text(text.to_string()),
            }))
            .await
    }

    /// Uploads `bytes` as a document and returns the replies.
    pub async fn send_document(
        &self,
        actor: &Actor,
        file_name: &str,
        bytes: &[u8],
        caption: Option<&str>,
    ) -> Vec<Reply> {
        let file_id = format!("file-{file_name}");
        self.transport.add_file(&file_id, bytes.to_vec()).await;
        self.controller
            .handle(InboundEvent::Message(InboundMessage {
                actor: actor.clone(),
                message_id: 2,
                content: MessageContent::Document {
                    file_id,
                    file_name: Some(file_name.to_string()),
                    caption: caption.map(str::to_string),
                },
            }))
            .await
    }

    /// Presses an inline button carrying `data` on message 10.
    pub async fn press(&self, actor: &Actor, data: &str) -> Vec<Reply> {
        self.controller
            .handle(InboundEvent::Callback(InboundCallback {
                actor: actor.clone(),
                callback_id: "cb-1".to_string(),
                message_id: Some(10),
                data: data.to_string(),
            }))
            .await
    }
}

/// Text of every reply that carries one, in order.
pub fn reply_texts(replies: &[Reply]) -> Vec<String> {
    replies
        .iter()
        .filter_map(|r| r.text().map(str::to_string))
        .collect()
}
