// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Update routing, sender filtering, and conversion into inbound events.
//!
//! Determines whether an incoming Telegram update should be processed
//! based on the `allowed_users` list, then converts it into a
//! transport-agnostic [`InboundEvent`] for the controller.

use std::sync::Arc;

use feedbot_control::Controller;
use feedbot_core::{
    Actor, ChatId, ChatInfo, ChatKind, InboundCallback, InboundEvent, InboundMessage,
    MessageContent,
};
use teloxide::prelude::*;
use teloxide::types::{Chat, ChatFullInfo, User, UserId};
use tracing::debug;

/// Users permitted to talk to the bot. Empty admits everyone.
#[derive(Debug, Clone, Default)]
pub struct AllowedUsers(Arc<[String]>);

impl AllowedUsers {
    pub fn new(users: Vec<String>) -> Self {
        Self(users.into())
    }

    /// Matches the sender's numeric id or username (with or without `@`,
    /// case-insensitive). Updates without a sender are never admitted.
    pub fn permits(&self, user: Option<&User>) -> bool {
        let Some(user) = user else {
            return false;
        };
        if self.0.is_empty() {
            return true;
        }

        let user_id = user.id.0.to_string();
        self.0.iter().any(|allowed| {
            if *allowed == user_id {
                return true;
            }
            let allowed = allowed.strip_prefix('@').unwrap_or(allowed);
            user.username
                .as_deref()
                .is_some_and(|name| name.eq_ignore_ascii_case(allowed))
        })
    }
}

/// The private-chat id of a Telegram user.
pub fn user_chat_id(user: UserId) -> ChatId {
    ChatId(teloxide::types::ChatId::from(user).0)
}

fn chat_kind(private: bool, channel: bool, supergroup: bool) -> ChatKind {
    if private {
        ChatKind::Private
    } else if channel {
        ChatKind::Channel
    } else if supergroup {
        ChatKind::Supergroup
    } else {
        ChatKind::Group
    }
}

/// Describes the chat an update arrived in.
pub fn chat_info(chat: &Chat) -> ChatInfo {
    ChatInfo {
        id: ChatId(chat.id.0),
        kind: chat_kind(chat.is_private(), chat.is_channel(), chat.is_supergroup()),
        title: chat.title().map(str::to_string),
        username: chat.username().map(str::to_string),
    }
}

/// Describes a chat returned by `getChat`.
pub fn full_chat_info(chat: &ChatFullInfo) -> ChatInfo {
    ChatInfo {
        id: ChatId(chat.id.0),
        kind: chat_kind(chat.is_private(), chat.is_channel(), chat.is_supergroup()),
        title: chat.title().map(str::to_string),
        username: chat.username().map(str::to_string),
    }
}

/// Converts a Telegram message into an [`InboundMessage`].
///
/// Handles text and document messages. Returns `None` for messages
/// without a sender and for unsupported kinds (photos, stickers, etc.).
pub fn to_inbound_message(msg: &Message) -> Option<InboundMessage> {
    let user = msg.from.as_ref()?;
    let content = if let Some(text) = msg.text() {
        MessageContent::Text(text.to_string())
    } else if let Some(doc) = msg.document() {
        MessageContent::Document {
            file_id: doc.file.id.0.clone(),
            file_name: doc.file_name.clone(),
            caption: msg.caption().map(str::to_string),
        }
    } else {
        return None;
    };

    Some(InboundMessage {
        actor: Actor {
            user_id: user_chat_id(user.id),
            chat: chat_info(&msg.chat),
        },
        message_id: msg.id.0,
        content,
    })
}

/// Converts a callback query into an [`InboundCallback`].
///
/// When the message carrying the keyboard is no longer accessible the press
/// is attributed to the presser's private chat and nothing can be edited.
pub fn to_inbound_callback(query: &CallbackQuery) -> Option<InboundCallback> {
    let data = query.data.clone()?;
    let user_id = user_chat_id(query.from.id);
    let (chat, message_id) = match query.regular_message() {
        Some(msg) => (chat_info(&msg.chat), Some(msg.id.0)),
        None => (ChatInfo::private(user_id), None),
    };

    Some(InboundCallback {
        actor: Actor { user_id, chat },
        callback_id: query.id.0.clone(),
        message_id,
        data,
    })
}

/// Dispatcher endpoint for message updates.
pub async fn on_message(
    msg: Message,
    controller: Arc<Controller>,
    allowed: AllowedUsers,
) -> ResponseResult<()> {
    if !allowed.permits(msg.from.as_ref()) {
        debug!(chat_id = msg.chat.id.0, "ignoring message from unlisted sender");
        return respond(());
    }

    match to_inbound_message(&msg) {
        Some(inbound) => controller.dispatch(InboundEvent::Message(inbound)).await,
        None => debug!(msg_id = msg.id.0, "ignoring unsupported message type"),
    }
    respond(())
}

/// Dispatcher endpoint for inline button presses.
pub async fn on_callback(
    query: CallbackQuery,
    controller: Arc<Controller>,
    allowed: AllowedUsers,
) -> ResponseResult<()> {
    if !allowed.permits(Some(&query.from)) {
        debug!(user_id = query.from.id.0, "ignoring callback from unlisted sender");
        return respond(());
    }

    match to_inbound_callback(&query) {
        Some(inbound) => controller.dispatch(InboundEvent::Callback(inbound)).await,
        None => debug!(user_id = query.from.id.0, "ignoring callback without data"),
    }
    respond(())
}
