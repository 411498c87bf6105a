// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the storage, transport, and control crates.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Most tags a subscription can carry. Extra tokens are dropped on write.
pub const MAX_TAGS: usize = 3;

/// Identifier of a chat, user, group, or channel on the messaging platform.
///
/// Users and chats share one id space: a user's private chat has the
/// same id as the user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of conversation a [`ChatId`] refers to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    /// Groups and supergroups share the same admin rules.
    pub fn is_group(self) -> bool {
        matches!(self, Self::Group | Self::Supergroup)
    }
}

/// A chat as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatInfo {
    pub id: ChatId,
    pub kind: ChatKind,
    pub title: Option<String>,
    pub username: Option<String>,
}

impl ChatInfo {
    pub fn private(id: ChatId) -> Self {
        Self {
            id,
            kind: ChatKind::Private,
            title: None,
            username: None,
        }
    }

    /// Best human-readable label: title, then `@username`, then the raw id.
    pub fn display_name(&self) -> String {
        if let Some(title) = self.title.as_deref().filter(|t| !t.is_empty()) {
            return title.to_string();
        }
        match self.username.as_deref() {
            Some(username) => format!("@{username}"),
            None => self.id.to_string(),
        }
    }
}

/// How a chat is addressed when asking the transport about it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChatLookup {
    Id(ChatId),
    /// A public `@username`, with or without the leading `@`.
    Mention(String),
}

impl fmt::Display for ChatLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Mention(name) => write!(f, "@{}", name.trim_start_matches('@')),
        }
    }
}

/// The identity issuing a request together with the chat it was issued in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: ChatId,
    pub chat: ChatInfo,
}

impl Actor {
    /// An actor talking to the bot in its own private chat.
    pub fn private(user_id: ChatId) -> Self {
        Self {
            user_id,
            chat: ChatInfo::private(user_id),
        }
    }
}

/// A subscriber record, created lazily on first interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub chat_id: ChatId,
    pub created_at: String,
}

/// A feed, shared by every subscriber of the same link.
///
/// `error_count` is owned by the fetcher. The control plane only moves
/// `error_baseline`, so the effective error count is the distance between
/// the two and fetching is enabled while it stays below the threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub id: i64,
    pub link: String,
    pub title: String,
    pub error_count: i64,
    pub error_baseline: i64,
}

impl Source {
    pub fn effective_errors(&self) -> i64 {
        (self.error_count - self.error_baseline).max(0)
    }

    pub fn is_enabled(&self, threshold: i64) -> bool {
        self.effective_errors() < threshold
    }

    /// Title if one has been fetched yet, otherwise the link.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.link
        } else {
            &self.title
        }
    }
}

/// A per-subscription switch that may defer to a configured default.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Toggle {
    #[default]
    Default,
    On,
    Off,
}

impl Toggle {
    pub fn from_bool(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }

    /// Resolves the switch against the configured default.
    pub fn is_on(self, default: bool) -> bool {
        match self {
            Self::Default => default,
            Self::On => true,
            Self::Off => false,
        }
    }

    /// The explicit state opposite to the current effective one.
    pub fn flipped(self, default: bool) -> Self {
        Self::from_bool(!self.is_on(default))
    }
}

/// One (user, source) pairing with its per-subscription preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub id: i64,
    pub owner: ChatId,
    pub source_id: i64,
    pub interval_minutes: u32,
    pub notification: Toggle,
    pub telegraph: Toggle,
    pub tags: Vec<String>,
}

impl Subscription {
    /// Normalizes free-form tag tokens: blank tokens and leading `#` are
    /// stripped, and only the first `limit` survive. `limit` is capped at
    /// [`MAX_TAGS`].
    pub fn normalize_tags<I, S>(tokens: I, limit: usize) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tokens
            .into_iter()
            .filter_map(|t| {
                let tag = t.as_ref().trim().trim_start_matches('#');
                (!tag.is_empty()).then(|| tag.to_string())
            })
            .take(limit.min(MAX_TAGS))
            .collect()
    }
}

/// Initial preferences applied when a subscription is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionDefaults {
    pub interval_minutes: u32,
    pub notification: Toggle,
    pub telegraph: Toggle,
}

/// A subscription joined with its source, as listed to the owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionEntry {
    pub subscription: Subscription,
    pub source: Source,
}

/// Result of registering a (user, source) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Created(Subscription),
    /// The pair was already subscribed; the stored row is returned untouched.
    Existing(Subscription),
}

impl Registration {
    pub fn subscription(&self) -> &Subscription {
        match self {
            Self::Created(s) | Self::Existing(s) => s,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Counts reported by bulk operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub succeeded: usize,
    pub failed: usize,
}

/// One feed reference extracted from an OPML document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub url: String,
    pub title: Option<String>,
}

impl FeedEntry {
    pub fn label(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.url)
    }
}

// --- Inbound events ---

/// Body of an inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    /// Plain text, including `/command` lines.
    Text(String),
    Document {
        file_id: String,
        file_name: Option<String>,
        caption: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub actor: Actor,
    pub message_id: i32,
    pub content: MessageContent,
}

/// A button press on an inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundCallback {
    pub actor: Actor,
    pub callback_id: String,
    /// The message carrying the keyboard, when the transport still has it.
    pub message_id: Option<i32>,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Message(InboundMessage),
    Callback(InboundCallback),
}

// --- Outbound replies ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextFormat {
    Plain,
    #[default]
    Html,
}

/// An inline keyboard button carrying opaque callback data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Keyboard {
    #[default]
    None,
    Inline(Vec<Vec<Button>>),
    /// A one-shot reply keyboard; each string is sent back verbatim as text.
    Reply(Vec<Vec<String>>),
    RemoveReply,
    ForceReply,
}

/// An action the transport should perform on behalf of the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Send {
        chat: ChatId,
        text: String,
        format: TextFormat,
        keyboard: Keyboard,
    },
    Edit {
        chat: ChatId,
        message_id: i32,
        text: String,
        format: TextFormat,
        buttons: Vec<Vec<Button>>,
    },
    Delete {
        chat: ChatId,
        message_id: i32,
    },
    AnswerCallback {
        callback_id: String,
        text: Option<String>,
    },
    Document {
        chat: ChatId,
        file_name: String,
        bytes: Vec<u8>,
        caption: Option<String>,
    },
}

impl Reply {
    /// An HTML message without a keyboard.
    pub fn html(chat: ChatId, text: impl Into<String>) -> Self {
        Self::Send {
            chat,
            text: text.into(),
            format: TextFormat::Html,
            keyboard: Keyboard::None,
        }
    }

    pub fn html_with(chat: ChatId, text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self::Send {
            chat,
            text: text.into(),
            format: TextFormat::Html,
            keyboard,
        }
    }

    /// A plain-text message without a keyboard.
    pub fn plain(chat: ChatId, text: impl Into<String>) -> Self {
        Self::Send {
            chat,
            text: text.into(),
            format: TextFormat::Plain,
            keyboard: Keyboard::None,
        }
    }

    /// Text carried by a send or edit, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Send { text, .. } | Self::Edit { text, .. } => Some(text),
            Self::AnswerCallback { text, .. } => text.as_deref(),
            Self::Document { caption, .. } => caption.as_deref(),
            Self::Delete { .. } => None,
        }
    }
}

// --- Adapter plumbing ---

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of collaborator behind a [`crate::PluginAdapter`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Transport,
    Storage,
    Opml,
}
