// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram transport adapter for feedbot.
//!
//! Implements [`TransportAdapter`] for the Telegram Bot API via teloxide:
//! chat lookups and admin checks for the authorizer, reply delivery with
//! HTML formatting and keyboards, and long polling that feeds updates into
//! the [`Controller`].

pub mod handler;
pub mod markup;
pub mod media;
pub mod split;

use std::sync::Arc;

use async_trait::async_trait;
use feedbot_config::model::TelegramConfig;
use feedbot_control::Controller;
use feedbot_core::{
    AdapterType, Button, ChatId, ChatInfo, ChatLookup, FeedbotError, HealthStatus, Keyboard,
    PluginAdapter, Reply, TextFormat, TransportAdapter,
};
use teloxide::RequestError;
use teloxide::prelude::*;
use teloxide::types::{CallbackQueryId, MessageId, ParseMode, Recipient, UserId};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::handler::AllowedUsers;

/// Longest text Telegram accepts in a single message.
pub const MAX_MESSAGE_LENGTH: usize = 4096;

/// Wraps a teloxide request failure with context.
pub(crate) fn request_error(context: &str, e: RequestError) -> FeedbotError {
    FeedbotError::Transport {
        message: format!("{context}: {e}"),
        source: Some(Box::new(e)),
    }
}

fn parse_mode(format: TextFormat) -> Option<ParseMode> {
    match format {
        TextFormat::Html => Some(ParseMode::Html),
        TextFormat::Plain => None,
    }
}

fn telegram_chat(chat: ChatId) -> teloxide::types::ChatId {
    teloxide::types::ChatId(chat.0)
}

/// Telegram transport implementing [`TransportAdapter`].
pub struct TelegramTransport {
    bot: Bot,
    config: TelegramConfig,
}

impl TelegramTransport {
    /// Creates a new Telegram transport.
    ///
    /// Requires `config.bot_token` to be set.
    pub fn new(config: TelegramConfig) -> Result<Self, FeedbotError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            FeedbotError::Config("telegram.bot_token is required for the Telegram transport".into())
        })?;

        if token.trim().is_empty() {
            return Err(FeedbotError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        let bot = Bot::new(token);
        Ok(Self { bot, config })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    /// The bot's own `@username`, used to ignore commands addressed to other bots.
    pub async fn bot_username(&self) -> Result<String, FeedbotError> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| request_error("failed to fetch bot identity", e))?;
        me.user
            .username
            .clone()
            .ok_or_else(|| FeedbotError::transport("bot account has no username"))
    }

    /// Long-polls Telegram and feeds every update to `controller` until
    /// `cancel` fires.
    ///
    /// Updates from the same chat are handled one at a time; different
    /// chats run concurrently.
    pub async fn run(&self, controller: Arc<Controller>, cancel: CancellationToken) {
        let allowed = AllowedUsers::new(self.config.allowed_users.clone());

        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint(handler::on_message))
            .branch(Update::filter_callback_query().endpoint(handler::on_callback));

        let mut dispatcher = Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![controller, allowed])
            .default_handler(|_| async {})
            .build();

        let shutdown = dispatcher.shutdown_token();
        tokio::spawn(async move {
            cancel.cancelled().await;
            match shutdown.shutdown() {
                Ok(stopped) => stopped.await,
                Err(e) => debug!(error = %e, "dispatcher was not running"),
            }
        });

        info!("starting Telegram long polling");
        dispatcher.dispatch().await;
        info!("Telegram long polling stopped");
    }

    async fn send(
        &self,
        chat: ChatId,
        text: &str,
        format: TextFormat,
        keyboard: &Keyboard,
    ) -> Result<(), FeedbotError> {
        let chunks = split::split_message(text, MAX_MESSAGE_LENGTH);
        let last = chunks.len().saturating_sub(1);
        for (i, chunk) in chunks.into_iter().enumerate() {
            let mut request = self
                .bot
                .send_message(Recipient::Id(telegram_chat(chat)), chunk);
            if let Some(mode) = parse_mode(format) {
                request = request.parse_mode(mode);
            }
            // Keyboards ride on the final chunk so buttons sit under the full text.
            if i == last
                && let Some(markup) = markup::reply_markup(keyboard)
            {
                request = request.reply_markup(markup);
            }
            request
                .await
                .map_err(|e| request_error("failed to send message", e))?;
        }
        Ok(())
    }

    async fn edit(
        &self,
        chat: ChatId,
        message_id: i32,
        text: &str,
        format: TextFormat,
        buttons: &[Vec<Button>],
    ) -> Result<(), FeedbotError> {
        let mut request =
            self.bot
                .edit_message_text(telegram_chat(chat), MessageId(message_id), text);
        if let Some(mode) = parse_mode(format) {
            request = request.parse_mode(mode);
        }
        if !buttons.is_empty() {
            request = request.reply_markup(markup::inline_keyboard(buttons));
        }

        match request.await {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("message is not modified") => {
                debug!(chat_id = %chat, message_id, "edit left message unchanged");
                Ok(())
            }
            Err(e) => Err(request_error("failed to edit message", e)),
        }
    }

    async fn answer_callback(&self, callback_id: String, text: Option<String>) -> Result<(), FeedbotError> {
        let mut request = self.bot.answer_callback_query(CallbackQueryId(callback_id));
        if let Some(text) = text {
            request = request.text(text);
        }
        request
            .await
            .map_err(|e| request_error("failed to answer callback", e))?;
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for TelegramTransport {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, FeedbotError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), FeedbotError> {
        debug!("Telegram transport shutting down");
        Ok(())
    }
}

#[async_trait]
impl TransportAdapter for TelegramTransport {
    async fn resolve_chat(&self, lookup: &ChatLookup) -> Result<ChatInfo, FeedbotError> {
        let recipient = match lookup {
            ChatLookup::Id(id) => Recipient::Id(telegram_chat(*id)),
            ChatLookup::Mention(name) => {
                Recipient::ChannelUsername(format!("@{}", name.trim_start_matches('@')))
            }
        };
        let chat = self
            .bot
            .get_chat(recipient)
            .await
            .map_err(|e| request_error(&format!("failed to resolve chat {lookup}"), e))?;
        Ok(handler::full_chat_info(&chat))
    }

    async fn chat_administrators(&self, chat: ChatId) -> Result<Vec<ChatId>, FeedbotError> {
        let members = self
            .bot
            .get_chat_administrators(telegram_chat(chat))
            .await
            .map_err(|e| request_error(&format!("failed to list administrators of {chat}"), e))?;
        Ok(members
            .iter()
            .map(|m| handler::user_chat_id(m.user.id))
            .collect())
    }

    async fn is_chat_admin(&self, chat: ChatId, user: ChatId) -> Result<bool, FeedbotError> {
        let user = u64::try_from(user.0)
            .map(UserId)
            .map_err(|_| FeedbotError::InvalidInput(format!("{user} is not a user id")))?;
        let member = self
            .bot
            .get_chat_member(telegram_chat(chat), user)
            .await
            .map_err(|e| request_error(&format!("failed to look up member of {chat}"), e))?;
        Ok(member.is_privileged())
    }

    async fn deliver(&self, reply: Reply) -> Result<(), FeedbotError> {
        match reply {
            Reply::Send {
                chat,
                text,
                format,
                keyboard,
            } => self.send(chat, &text, format, &keyboard).await,
            Reply::Edit {
                chat,
                message_id,
                text,
                format,
                buttons,
            } => self.edit(chat, message_id, &text, format, &buttons).await,
            Reply::Delete { chat, message_id } => {
                if let Err(e) = self
                    .bot
                    .delete_message(telegram_chat(chat), MessageId(message_id))
                    .await
                {
                    // Messages older than 48h cannot be deleted; nothing to do.
                    warn!(chat_id = %chat, message_id, error = %e, "failed to delete message");
                }
                Ok(())
            }
            Reply::AnswerCallback { callback_id, text } => {
                self.answer_callback(callback_id, text).await
            }
            Reply::Document {
                chat,
                file_name,
                bytes,
                caption,
            } => {
                media::send_document(&self.bot, telegram_chat(chat), file_name, bytes, caption)
                    .await
            }
        }
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, FeedbotError> {
        media::download_file(&self.bot, file_id).await
    }
}
