// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport adapter trait for the messaging platform (Telegram).

use async_trait::async_trait;

use crate::error::FeedbotError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatId, ChatInfo, ChatLookup, Reply};

/// Adapter for the messaging platform the bot talks through.
///
/// Lookups are always answered fresh; callers must not cache chat kinds
/// or admin lists across requests.
#[async_trait]
pub trait TransportAdapter: PluginAdapter {
    /// Resolves a chat by id or public mention.
    async fn resolve_chat(&self, lookup: &ChatLookup) -> Result<ChatInfo, FeedbotError>;

    /// Lists the user ids holding administrator rights in a chat.
    async fn chat_administrators(&self, chat: ChatId) -> Result<Vec<ChatId>, FeedbotError>;

    /// Whether `user` is currently an owner or administrator of `chat`.
    async fn is_chat_admin(&self, chat: ChatId, user: ChatId) -> Result<bool, FeedbotError>;

    /// Performs one outbound action.
    async fn deliver(&self, reply: Reply) -> Result<(), FeedbotError>;

    /// Downloads an uploaded file by its transport file id.
    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, FeedbotError>;
}
