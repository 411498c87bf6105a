// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-chat conversation state.
//!
//! A command that needs a follow-up message parks the chat in one of the
//! awaiting states; the next free-text message for that chat consumes it.
//! Transitions out of a state go through [`PendingStore::compare_and_set`]
//! so that duplicate or concurrent deliveries consume a state at most once.
//!
//! State lives only in memory. A restart resets every chat to
//! [`PendingState::Idle`], which just means the follow-up is ignored.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use feedbot_core::ChatId;
use tracing::debug;

/// What the next free-text message in a chat is expected to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingState {
    /// No follow-up expected.
    #[default]
    Idle,
    /// A feed URL to subscribe `owner` to.
    AwaitingSubscribeUrl { owner: ChatId },
    /// A `[source id] title` line naming the feed to unsubscribe.
    AwaitingUnsubscribeChoice { owner: ChatId },
    /// A subscribed URL whose settings should be shown.
    AwaitingSettingsTarget { owner: ChatId },
    /// Tags are set through `/setfeedtag`; whatever arrives here is dropped.
    AwaitingTagInput { owner: ChatId, subscription_id: i64 },
}

impl PendingState {
    /// The chat whose subscriptions the pending action targets.
    pub fn owner(&self) -> Option<ChatId> {
        match self {
            Self::Idle => None,
            Self::AwaitingSubscribeUrl { owner }
            | Self::AwaitingUnsubscribeChoice { owner }
            | Self::AwaitingSettingsTarget { owner }
            | Self::AwaitingTagInput { owner, .. } => Some(*owner),
        }
    }
}

impl fmt::Display for PendingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AwaitingSubscribeUrl { .. } => write!(f, "awaiting_subscribe_url"),
            Self::AwaitingUnsubscribeChoice { .. } => write!(f, "awaiting_unsubscribe_choice"),
            Self::AwaitingSettingsTarget { .. } => write!(f, "awaiting_settings_target"),
            Self::AwaitingTagInput { .. } => write!(f, "awaiting_tag_input"),
        }
    }
}

/// Process-wide map from chat id to its pending state.
///
/// Cloning shares the underlying map. `Idle` is never stored: an absent
/// key and an idle chat are the same thing.
#[derive(Debug, Clone, Default)]
pub struct PendingStore {
    states: Arc<DashMap<ChatId, PendingState>>,
}

impl PendingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, chat: ChatId) -> PendingState {
        self.states
            .get(&chat)
            .map(|state| *state)
            .unwrap_or_default()
    }

    /// Unconditionally replaces the chat's state. Last writer wins.
    pub fn set(&self, chat: ChatId, state: PendingState) {
        debug!(chat_id = %chat, state = %state, "pending state set");
        if state == PendingState::Idle {
            self.states.remove(&chat);
        } else {
            self.states.insert(chat, state);
        }
    }

    pub fn clear(&self, chat: ChatId) {
        self.set(chat, PendingState::Idle);
    }

    /// Moves the chat from `expected` to `next` atomically.
    ///
    /// Returns `false`, leaving the state untouched, when the current state
    /// differs from `expected`.
    pub fn compare_and_set(&self, chat: ChatId, expected: PendingState, next: PendingState) -> bool {
        let swapped = match self.states.entry(chat) {
            Entry::Occupied(mut entry) => {
                if *entry.get() != expected {
                    false
                } else {
                    if next == PendingState::Idle {
                        entry.remove();
                    } else {
                        entry.insert(next);
                    }
                    true
                }
            }
            Entry::Vacant(entry) => {
                if expected != PendingState::Idle {
                    false
                } else {
                    if next != PendingState::Idle {
                        entry.insert(next);
                    }
                    true
                }
            }
        };
        debug!(chat_id = %chat, expected = %expected, next = %next, swapped, "pending state compare-and-set");
        swapped
    }

    /// Number of chats with a non-idle state.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
