// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport adapter for deterministic testing.
//!
//! `MockTransport` answers chat and admin lookups from tables the test fills
//! in, serves uploaded files from memory, and captures every delivered
//! reply for assertions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use feedbot_core::{
    AdapterType, ChatId, ChatInfo, ChatKind, ChatLookup, FeedbotError, HealthStatus,
    PluginAdapter, Reply, TransportAdapter,
};

/// A scriptable messaging transport for tests.
#[derive(Default)]
pub struct MockTransport {
    chats: Mutex<HashMap<ChatId, ChatInfo>>,
    admins: Mutex<HashMap<ChatId, Vec<ChatId>>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    delivered: Mutex<Vec<Reply>>,
    failing: AtomicBool,
    admin_lookups: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a chat so it can be resolved by id or `@username`.
    pub async fn add_chat(&self, chat: ChatInfo) {
        self.chats.lock().await.insert(chat.id, chat);
    }

    /// Registers a public channel administered by `admins`.
    pub async fn add_channel(&self, id: i64, username: &str, admins: &[i64]) -> ChatInfo {
        self.add_with_admins(id, ChatKind::Channel, username, admins).await
    }

    /// Registers a supergroup administered by `admins`.
    pub async fn add_group(&self, id: i64, username: &str, admins: &[i64]) -> ChatInfo {
        self.add_with_admins(id, ChatKind::Supergroup, username, admins).await
    }

    async fn add_with_admins(&self, id: i64, kind: ChatKind, username: &str, admins: &[i64]) -> ChatInfo {
        let chat = ChatInfo {
            id: ChatId(id),
            kind,
            title: Some(format!("{username} title")),
            username: Some(username.to_string()),
        };
        self.add_chat(chat.clone()).await;
        self.set_admins(id, admins).await;
        chat
    }

    /// Replaces a chat's administrator list.
    pub async fn set_admins(&self, chat: i64, admins: &[i64]) {
        self.admins
            .lock()
            .await
            .insert(ChatId(chat), admins.iter().copied().map(ChatId).collect());
    }

    /// Makes `file_id` downloadable with the given content.
    pub async fn add_file(&self, file_id: &str, bytes: impl Into<Vec<u8>>) {
        self.files.lock().await.insert(file_id.to_string(), bytes.into());
    }

    /// When set, every lookup fails as if the platform were unreachable.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of admin lookups served so far.
    pub fn admin_lookups(&self) -> usize {
        self.admin_lookups.load(Ordering::SeqCst)
    }

    /// Every reply passed to `deliver()`.
    pub async fn delivered(&self) -> Vec<Reply> {
        self.delivered.lock().await.clone()
    }

    pub async fn clear_delivered(&self) {
        self.delivered.lock().await.clear();
    }

    fn check_available(&self) -> Result<(), FeedbotError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(FeedbotError::transport("mock transport unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, FeedbotError> {
        Ok(if self.failing.load(Ordering::SeqCst) {
            HealthStatus::Unhealthy("failing".to_string())
        } else {
            HealthStatus::Healthy
        })
    }

    async fn shutdown(&self) -> Result<(), FeedbotError> {
        Ok(())
    }
}

#[async_trait]
impl TransportAdapter for MockTransport {
    async fn resolve_chat(&self, lookup: &ChatLookup) -> Result<ChatInfo, FeedbotError> {
        self.check_available()?;
        let chats = self.chats.lock().await;
        let found = match lookup {
            ChatLookup::Id(id) => chats.get(id).cloned(),
            ChatLookup::Mention(name) => {
                let name = name.trim_start_matches('@');
                chats
                    .values()
                    .find(|c| {
                        c.username
                            .as_deref()
                            .is_some_and(|u| u.eq_ignore_ascii_case(name))
                    })
                    .cloned()
            }
        };
        found.ok_or_else(|| FeedbotError::transport(format!("Bad Request: chat not found: {lookup}")))
    }

    async fn chat_administrators(&self, chat: ChatId) -> Result<Vec<ChatId>, FeedbotError> {
        self.check_available()?;
        self.admin_lookups.fetch_add(1, Ordering::SeqCst);
        self.admins
            .lock()
            .await
            .get(&chat)
            .cloned()
            .ok_or_else(|| FeedbotError::transport(format!("Bad Request: chat not found: {chat}")))
    }

    async fn is_chat_admin(&self, chat: ChatId, user: ChatId) -> Result<bool, FeedbotError> {
        Ok(self.chat_administrators(chat).await?.contains(&user))
    }

    async fn deliver(&self, reply: Reply) -> Result<(), FeedbotError> {
        self.check_available()?;
        self.delivered.lock().await.push(reply);
        Ok(())
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, FeedbotError> {
        self.check_available()?;
        self.files
            .lock()
            .await
            .get(file_id)
            .cloned()
            .ok_or_else(|| FeedbotError::transport(format!("file {file_id} not found")))
    }
}
