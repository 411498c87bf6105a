// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Settings toggle engine.
//!
//! Every operation authorizes the token's owner, applies at most one atomic
//! update through the store, then re-reads the subscription and its source
//! so the rendered view always reflects persisted state.
//!
//! Toggling fetching acts on the shared source: pausing a feed pauses it for
//! every subscriber.

use std::sync::Arc;

use feedbot_config::model::FeedConfig;
use feedbot_core::{Actor, Button, FeedbotError, Source, Subscription, SubscriptionStore};
use tracing::info;

use crate::auth::Authorizer;
use crate::render::{escape_html, source_link};
use crate::token::{ActionToken, Callback, CallbackAction};

/// One switch on the settings view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsToggle {
    Notification,
    Telegraph,
    Fetching,
}

impl SettingsToggle {
    pub fn from_action(action: CallbackAction) -> Option<Self> {
        match action {
            CallbackAction::ToggleNotice => Some(Self::Notification),
            CallbackAction::ToggleTelegraph => Some(Self::Telegraph),
            CallbackAction::ToggleUpdate => Some(Self::Fetching),
            _ => None,
        }
    }
}

/// Canonical settings view of one subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsView {
    pub subscription: Subscription,
    pub source: Source,
    pub fetching: bool,
    pub notification: bool,
    pub telegraph: bool,
}

impl SettingsView {
    pub fn token(&self) -> ActionToken {
        ActionToken::new(self.subscription.owner, self.source.id).with_subscription(self.subscription.id)
    }

    pub fn render_html(&self) -> String {
        let tags = if self.subscription.tags.is_empty() {
            "none".to_string()
        } else {
            self.subscription
                .tags
                .iter()
                .map(|t| format!("#{}", escape_html(t)))
                .collect::<Vec<_>>()
                .join(" ")
        };
        format!(
            "<b>Settings</b>\n\
             [{id}] {link}\n\
             Fetching: {fetching} ({errors} recent errors)\n\
             Notifications: {notification}\n\
             Telegraph: {telegraph}\n\
             Interval: {interval} min\n\
             Tags: {tags}",
            id = self.subscription.id,
            link = source_link(&self.source),
            fetching = if self.fetching { "active" } else { "paused" },
            errors = self.source.effective_errors(),
            notification = on_off(self.notification),
            telegraph = on_off(self.telegraph),
            interval = self.subscription.interval_minutes,
        )
    }

    /// Inline keyboard with one button per switch plus the tag prompt.
    pub fn buttons(&self) -> Vec<Vec<Button>> {
        let token = self.token();
        let data = |action| Callback::feed(action, token).encode();
        vec![
            vec![Button::new(
                if self.fetching { "Pause fetching" } else { "Resume fetching" },
                data(CallbackAction::ToggleUpdate),
            )],
            vec![
                Button::new(
                    if self.notification { "Mute" } else { "Unmute" },
                    data(CallbackAction::ToggleNotice),
                ),
                Button::new(
                    if self.telegraph { "Telegraph off" } else { "Telegraph on" },
                    data(CallbackAction::ToggleTelegraph),
                ),
            ],
            vec![Button::new("Set tags", data(CallbackAction::SetTag))],
        ]
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

#[derive(Clone)]
pub struct SettingsEngine {
    store: Arc<dyn SubscriptionStore>,
    authorizer: Authorizer,
    feed: FeedConfig,
}

impl SettingsEngine {
    pub fn new(store: Arc<dyn SubscriptionStore>, authorizer: Authorizer, feed: FeedConfig) -> Self {
        Self {
            store,
            authorizer,
            feed,
        }
    }

    /// Renders the settings of the subscription `token` refers to.
    pub async fn view(&self, actor: &Actor, token: &ActionToken) -> Result<SettingsView, FeedbotError> {
        self.authorizer.ensure(actor, token.owner).await?;
        self.load(token).await
    }

    /// Flips one switch and renders the result.
    pub async fn toggle(
        &self,
        actor: &Actor,
        token: &ActionToken,
        which: SettingsToggle,
    ) -> Result<SettingsView, FeedbotError> {
        self.authorizer.ensure(actor, token.owner).await?;
        let current = self.load(token).await?;

        let applied = match which {
            SettingsToggle::Notification => {
                self.store
                    .toggle_notification(current.subscription.id, self.feed.notify_by_default)
                    .await?
            }
            SettingsToggle::Telegraph => {
                self.store
                    .toggle_telegraph(current.subscription.id, self.feed.telegraph_by_default)
                    .await?
            }
            SettingsToggle::Fetching => {
                self.store
                    .toggle_source_enabled(current.source.id, self.feed.error_threshold)
                    .await?
            }
        };
        if !applied {
            return Err(FeedbotError::not_found("subscription"));
        }

        let view = self.load(token).await?;
        info!(
            owner = %token.owner,
            source_id = view.source.id,
            subscription_id = view.subscription.id,
            toggle = ?which,
            fetching = view.fetching,
            notification = view.notification,
            telegraph = view.telegraph,
            "subscription setting toggled"
        );
        Ok(view)
    }

    /// Resolves a token to the owner's subscription and its source.
    ///
    /// A token whose subscription id disagrees with its owner or source is
    /// stale and treated as not found.
    async fn load(&self, token: &ActionToken) -> Result<SettingsView, FeedbotError> {
        let subscription = match token.subscription_id {
            Some(id) => self.store.get_subscription(id).await?,
            None => self.store.find_subscription(token.owner, token.source_id).await?,
        }
        .filter(|s| s.owner == token.owner && s.source_id == token.source_id)
        .ok_or_else(|| FeedbotError::not_found("subscription"))?;

        let source = self
            .store
            .get_source(subscription.source_id)
            .await?
            .ok_or_else(|| FeedbotError::not_found("feed"))?;

        Ok(SettingsView {
            fetching: source.is_enabled(self.feed.error_threshold),
            notification: subscription.notification.is_on(self.feed.notify_by_default),
            telegraph: subscription.telegraph.is_on(self.feed.telegraph_by_default),
            subscription,
            source,
        })
    }
}
