// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command and callback router.
//!
//! [`Controller::handle`] turns one inbound event into the replies the
//! transport should perform. Errors never escape: each one becomes a
//! message for the chat that caused it.

use std::sync::Arc;

use feedbot_config::model::FeedConfig;
use feedbot_core::{
    Actor, Button, ChatId, ChatInfo, ChatKind, ChatLookup, FeedbotError, InboundCallback,
    InboundEvent, InboundMessage, Keyboard, MessageContent, OpmlCodec, Reply, Source,
    Subscription, SubscriptionEntry, SubscriptionStore, TextFormat, TransportAdapter,
};
use tracing::{debug, error, info, warn};

use crate::auth::Authorizer;
use crate::commands::{Command, CommandLine, find_mention, parse_command, parse_source_choice};
use crate::import::ImportPipeline;
use crate::links::{find_feed_url, parse_feed_url};
use crate::pending::{PendingState, PendingStore};
use crate::render::{
    error_source_list, escape_html, help_text, settings_choice_label, source_link,
    subscription_list, unsubscribe_choice_label,
};
use crate::settings::{SettingsEngine, SettingsToggle, SettingsView};
use crate::token::{ActionToken, Callback, CallbackAction};

const SUBSCRIBE_PROMPT: &str = "Reply with the URL of the feed to subscribe to.";
const NO_SUBSCRIPTIONS: &str = "No subscriptions yet.";

/// Callback answer text plus the replies a button press produces.
type CallbackOutcome = (Option<String>, Vec<Reply>);

pub struct Controller {
    store: Arc<dyn SubscriptionStore>,
    transport: Arc<dyn TransportAdapter>,
    opml: Arc<dyn OpmlCodec>,
    feed: FeedConfig,
    bot_username: Option<String>,
    authorizer: Authorizer,
    pending: PendingStore,
    settings: SettingsEngine,
    import: ImportPipeline,
}

impl Controller {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        transport: Arc<dyn TransportAdapter>,
        opml: Arc<dyn OpmlCodec>,
        feed: FeedConfig,
    ) -> Self {
        let authorizer = Authorizer::new(transport.clone());
        let settings = SettingsEngine::new(store.clone(), authorizer.clone(), feed.clone());
        let import = ImportPipeline::new(store.clone(), feed.subscription_defaults());
        Self {
            store,
            transport,
            opml,
            feed,
            bot_username: None,
            authorizer,
            pending: PendingStore::new(),
            settings,
            import,
        }
    }

    /// Ignore `/cmd@other_bot` commands meant for a different bot.
    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }

    pub fn pending(&self) -> &PendingStore {
        &self.pending
    }

    /// Handles one event and returns the replies to perform, in order.
    pub async fn handle(&self, event: InboundEvent) -> Vec<Reply> {
        match event {
            InboundEvent::Message(message) => self.handle_message(message).await,
            InboundEvent::Callback(callback) => self.handle_callback(callback).await,
        }
    }

    /// Handles one event and delivers its replies through the transport.
    pub async fn dispatch(&self, event: InboundEvent) {
        for reply in self.handle(event).await {
            if let Err(e) = self.transport.deliver(reply).await {
                warn!(error = %e, "failed to deliver reply");
            }
        }
    }

    async fn handle_message(&self, message: InboundMessage) -> Vec<Reply> {
        let InboundMessage { actor, content, .. } = message;
        let result = match &content {
            MessageContent::Text(text) => match parse_command(text, self.bot_username.as_deref()) {
                Some(line) => self.handle_command(&actor, line).await,
                None => self.handle_followup(&actor, text).await,
            },
            MessageContent::Document {
                file_id,
                file_name,
                caption,
            } => {
                self.handle_document(&actor, file_id, file_name.as_deref(), caption.as_deref())
                    .await
            }
        };
        result.unwrap_or_else(|e| vec![failure_reply(&actor, &e)])
    }

    // --- commands ---

    async fn handle_command(
        &self,
        actor: &Actor,
        line: CommandLine,
    ) -> Result<Vec<Reply>, FeedbotError> {
        let chat = actor.chat.id;
        debug!(chat_id = %chat, user_id = %actor.user_id, command = %line.command, "command received");
        // Any command abandons a half-finished conversation.
        self.pending.clear(chat);

        let mention = line.mention.as_deref();
        let args = line.args.as_slice();
        match line.command {
            Command::Start => self.start(actor).await,
            Command::Help => Ok(vec![Reply::html(chat, help_text())]),
            Command::Ping => Ok(vec![Reply::plain(chat, "pong")]),
            Command::Version => Ok(vec![Reply::plain(
                chat,
                format!("feedbot {}", env!("CARGO_PKG_VERSION")),
            )]),
            Command::Sub => self.sub_command(actor, mention, args).await,
            Command::Unsub => self.unsub_command(actor, mention, args).await,
            Command::List => self.list_command(actor, mention).await,
            Command::Check => self.check_command(actor, mention).await,
            Command::Set => self.set_command(actor, mention).await,
            Command::SetFeedTag => self.set_feed_tag_command(actor, mention, args).await,
            Command::SetInterval => self.set_interval_command(actor, args).await,
            Command::PauseAll => self.pause_all_command(actor, mention, true).await,
            Command::ActiveAll => self.pause_all_command(actor, mention, false).await,
            Command::UnsubAll => self.unsub_all_command(actor, mention).await,
            Command::Import => self.import_command(actor, mention).await,
            Command::Export => {
                let subject = self.authorizer.resolve_subject(actor, mention).await?;
                self.export(chat, &subject).await
            }
        }
    }

    async fn start(&self, actor: &Actor) -> Result<Vec<Reply>, FeedbotError> {
        let user = self.store.find_or_create_user(actor.chat.id).await?;
        info!(chat_id = %user.chat_id, user_id = user.id, "chat registered");
        Ok(vec![Reply::html(
            actor.chat.id,
            "Hello! I deliver RSS updates to this chat.\n\
             Send <code>/sub &lt;url&gt;</code> to subscribe, or /help to see everything I can do.",
        )])
    }

    async fn sub_command(
        &self,
        actor: &Actor,
        mention: Option<&str>,
        args: &[String],
    ) -> Result<Vec<Reply>, FeedbotError> {
        let chat = actor.chat.id;
        let subject = self.authorizer.resolve_subject(actor, mention).await?;
        match args.first() {
            Some(raw) => {
                let text = self.subscribe(subject.id, raw).await?;
                Ok(vec![Reply::html(chat, text)])
            }
            None => {
                self.pending
                    .set(chat, PendingState::AwaitingSubscribeUrl { owner: subject.id });
                Ok(vec![Reply::html_with(chat, SUBSCRIBE_PROMPT, Keyboard::ForceReply)])
            }
        }
    }

    async fn unsub_command(
        &self,
        actor: &Actor,
        mention: Option<&str>,
        args: &[String],
    ) -> Result<Vec<Reply>, FeedbotError> {
        let chat = actor.chat.id;
        let subject = self.authorizer.resolve_subject(actor, mention).await?;

        if let Some(raw) = args.first() {
            let url = parse_feed_url(raw)?;
            let source = self
                .store
                .get_source_by_link(&url)
                .await?
                .ok_or_else(|| FeedbotError::not_found("subscription"))?;
            let text = self.unsubscribe(subject.id, &source).await?;
            return Ok(vec![Reply::html(chat, text)]);
        }

        let entries = self.store.list_subscriptions(subject.id).await?;
        if entries.is_empty() {
            return Ok(vec![Reply::plain(chat, NO_SUBSCRIPTIONS)]);
        }
        self.pending
            .set(chat, PendingState::AwaitingUnsubscribeChoice { owner: subject.id });

        let buttons = feed_buttons(subject.id, &entries, CallbackAction::UnsubItem);
        let choices = entries
            .iter()
            .map(|e| vec![unsubscribe_choice_label(&e.source)])
            .collect();
        Ok(vec![
            Reply::html_with(chat, "Choose the feed to unsubscribe from:", Keyboard::Inline(buttons)),
            Reply::html_with(chat, "Or pick it from the keyboard below.", Keyboard::Reply(choices)),
        ])
    }

    async fn list_command(
        &self,
        actor: &Actor,
        mention: Option<&str>,
    ) -> Result<Vec<Reply>, FeedbotError> {
        let chat = actor.chat.id;
        let subject = self.authorizer.resolve_subject(actor, mention).await?;
        let entries = self.store.list_subscriptions(subject.id).await?;
        if entries.is_empty() {
            return Ok(vec![Reply::plain(chat, NO_SUBSCRIPTIONS)]);
        }
        let text = subscription_list(&subject, &entries, self.feed.error_threshold);
        let export = vec![vec![Button::new(
            "Export OPML",
            Callback::owner(CallbackAction::Export, subject.id).encode(),
        )]];
        Ok(vec![Reply::html_with(chat, text, Keyboard::Inline(export))])
    }

    async fn check_command(
        &self,
        actor: &Actor,
        mention: Option<&str>,
    ) -> Result<Vec<Reply>, FeedbotError> {
        let chat = actor.chat.id;
        let subject = self.authorizer.resolve_subject(actor, mention).await?;
        let sources = self
            .store
            .list_error_sources(subject.id, self.feed.error_threshold)
            .await?;
        if sources.is_empty() {
            return Ok(vec![Reply::plain(chat, "All feeds are fetching normally.")]);
        }
        Ok(vec![Reply::html(chat, error_source_list(&subject, &sources))])
    }

    async fn set_command(
        &self,
        actor: &Actor,
        mention: Option<&str>,
    ) -> Result<Vec<Reply>, FeedbotError> {
        let chat = actor.chat.id;
        let subject = self.authorizer.resolve_subject(actor, mention).await?;
        let entries = self.store.list_subscriptions(subject.id).await?;
        if entries.is_empty() {
            return Ok(vec![Reply::plain(chat, NO_SUBSCRIPTIONS)]);
        }
        self.pending
            .set(chat, PendingState::AwaitingSettingsTarget { owner: subject.id });

        let buttons = feed_buttons(subject.id, &entries, CallbackAction::SetItem);
        let choices = entries
            .iter()
            .map(|e| vec![settings_choice_label(&e.source)])
            .collect();
        Ok(vec![
            Reply::html_with(chat, "Choose the feed to configure:", Keyboard::Inline(buttons)),
            Reply::html_with(chat, "Or pick it from the keyboard below.", Keyboard::Reply(choices)),
        ])
    }

    async fn set_feed_tag_command(
        &self,
        actor: &Actor,
        mention: Option<&str>,
        args: &[String],
    ) -> Result<Vec<Reply>, FeedbotError> {
        let chat = actor.chat.id;
        let (id, tokens) = args.split_first().ok_or_else(|| {
            FeedbotError::InvalidInput(
                "Usage: /setfeedtag [@channel] <sub id> <tag1> [tag2] [tag3]".to_string(),
            )
        })?;
        let id = parse_subscription_id(id)?;

        // A named channel must be one the actor manages and must own the
        // subscription. Without one, the subscription's owner is checked.
        let expected_owner = match mention {
            Some(_) => Some(self.authorizer.resolve_subject(actor, mention).await?.id),
            None => None,
        };
        let subscription = self
            .store
            .get_subscription(id)
            .await?
            .filter(|s| expected_owner.is_none_or(|owner| s.owner == owner))
            .ok_or_else(|| FeedbotError::not_found("subscription"))?;
        self.authorizer.ensure(actor, subscription.owner).await?;

        let tags = Subscription::normalize_tags(tokens, self.feed.max_tags);
        if !self.store.set_tags(subscription.id, &tags).await? {
            return Err(FeedbotError::not_found("subscription"));
        }
        info!(owner = %subscription.owner, subscription_id = subscription.id, ?tags, "subscription tags set");

        let text = if tags.is_empty() {
            format!("Tags cleared for subscription {}.", subscription.id)
        } else {
            let tags: Vec<String> = tags.iter().map(|t| format!("#{}", escape_html(t))).collect();
            format!("Tags of subscription {}: {}", subscription.id, tags.join(" "))
        };
        Ok(vec![Reply::html(chat, text)])
    }

    async fn set_interval_command(
        &self,
        actor: &Actor,
        args: &[String],
    ) -> Result<Vec<Reply>, FeedbotError> {
        let chat = actor.chat.id;
        let usage = || {
            FeedbotError::InvalidInput("Usage: /setinterval <minutes> <sub id> [sub id...]".to_string())
        };
        let (minutes, ids) = args.split_first().ok_or_else(usage)?;
        if ids.is_empty() {
            return Err(usage());
        }
        let minutes = parse_interval(minutes)?;

        let mut updated = Vec::new();
        let mut failed = Vec::new();
        for raw in ids {
            match self.set_interval_one(actor, raw, minutes).await {
                Ok(id) => updated.push(id),
                Err(e) => {
                    if e.is_collaborator_failure() {
                        warn!(chat_id = %chat, subscription = %raw, error = %e, "failed to set interval");
                    }
                    failed.push(format!("{}: {}", escape_html(raw), escape_html(&e.user_message())));
                }
            }
        }

        let mut text = format!(
            "Interval set to {minutes} min for {} subscription(s).",
            updated.len()
        );
        if !failed.is_empty() {
            text.push_str("\nNot changed:\n");
            text.push_str(&failed.join("\n"));
        }
        Ok(vec![Reply::html(chat, text)])
    }

    async fn set_interval_one(
        &self,
        actor: &Actor,
        raw_id: &str,
        minutes: u32,
    ) -> Result<i64, FeedbotError> {
        let id = parse_subscription_id(raw_id)?;
        let subscription = self
            .store
            .get_subscription(id)
            .await?
            .ok_or_else(|| FeedbotError::not_found("subscription"))?;
        self.authorizer.ensure(actor, subscription.owner).await?;
        if !self.store.set_interval(id, minutes).await? {
            return Err(FeedbotError::not_found("subscription"));
        }
        info!(owner = %subscription.owner, subscription_id = id, minutes, "interval set");
        Ok(id)
    }

    async fn pause_all_command(
        &self,
        actor: &Actor,
        mention: Option<&str>,
        pause: bool,
    ) -> Result<Vec<Reply>, FeedbotError> {
        let chat = actor.chat.id;
        let subject = self.authorizer.resolve_subject(actor, mention).await?;
        let threshold = self.feed.error_threshold;
        let text = if pause {
            let changed = self.store.pause_all(subject.id, threshold).await?;
            info!(owner = %subject.id, changed, "all feeds paused");
            format!("Paused {changed} feed(s).")
        } else {
            let changed = self.store.resume_all(subject.id, threshold).await?;
            info!(owner = %subject.id, changed, "all feeds resumed");
            format!("Resumed {changed} feed(s).")
        };
        Ok(vec![Reply::plain(chat, text)])
    }

    async fn unsub_all_command(
        &self,
        actor: &Actor,
        mention: Option<&str>,
    ) -> Result<Vec<Reply>, FeedbotError> {
        let chat = actor.chat.id;
        let subject = self.authorizer.resolve_subject(actor, mention).await?;
        let entries = self.store.list_subscriptions(subject.id).await?;
        if entries.is_empty() {
            return Ok(vec![Reply::plain(chat, NO_SUBSCRIPTIONS)]);
        }
        let buttons = vec![vec![
            Button::new(
                "Unsubscribe all",
                Callback::owner(CallbackAction::UnsubAllConfirm, subject.id).encode(),
            ),
            Button::new(
                "Cancel",
                Callback::owner(CallbackAction::UnsubAllCancel, subject.id).encode(),
            ),
        ]];
        Ok(vec![Reply::html_with(
            chat,
            format!(
                "Remove all {} subscriptions of {}?",
                entries.len(),
                escape_html(&subject.display_name())
            ),
            Keyboard::Inline(buttons),
        )])
    }

    async fn import_command(
        &self,
        actor: &Actor,
        mention: Option<&str>,
    ) -> Result<Vec<Reply>, FeedbotError> {
        self.authorizer.resolve_subject(actor, mention).await?;
        Ok(vec![Reply::html(
            actor.chat.id,
            "Send an <code>.opml</code> file to import its feeds.\n\
             To import into a channel, put <code>@channel</code> in the file caption.",
        )])
    }

    async fn export(&self, chat: ChatId, subject: &ChatInfo) -> Result<Vec<Reply>, FeedbotError> {
        let entries = self.store.list_subscriptions(subject.id).await?;
        if entries.is_empty() {
            return Ok(vec![Reply::plain(chat, NO_SUBSCRIPTIONS)]);
        }
        let sources: Vec<Source> = entries.into_iter().map(|e| e.source).collect();
        let title = format!("feedbot subscriptions of {}", subject.display_name());
        let document = self.opml.render(&title, &sources)?;
        info!(owner = %subject.id, count = sources.len(), "subscriptions exported");
        Ok(vec![Reply::Document {
            chat,
            file_name: format!("subscriptions_{}.opml", chrono::Utc::now().timestamp()),
            bytes: document.into_bytes(),
            caption: Some(format!("{} subscription(s)", sources.len())),
        }])
    }

    // --- documents ---

    async fn handle_document(
        &self,
        actor: &Actor,
        file_id: &str,
        file_name: Option<&str>,
        caption: Option<&str>,
    ) -> Result<Vec<Reply>, FeedbotError> {
        let chat = actor.chat.id;
        let is_opml = file_name.is_some_and(|n| n.to_ascii_lowercase().ends_with(".opml"));
        if !is_opml {
            // Groups share files for all sorts of reasons; only nag in private.
            return Ok(match actor.chat.kind {
                ChatKind::Private => vec![Reply::plain(chat, "Only .opml files can be imported.")],
                _ => Vec::new(),
            });
        }
        self.pending.clear(chat);

        let mention = caption.and_then(find_mention);
        let subject = self
            .authorizer
            .resolve_subject(actor, mention.as_deref())
            .await?;

        let bytes = self.transport.download_file(file_id).await?;
        let entries = self.opml.parse(&bytes)?;
        if entries.is_empty() {
            return Err(FeedbotError::InvalidInput(
                "The file does not list any feeds.".to_string(),
            ));
        }
        if entries.len() > self.feed.max_import_entries {
            return Err(FeedbotError::InvalidInput(format!(
                "The file lists {} feeds; at most {} can be imported at once.",
                entries.len(),
                self.feed.max_import_entries
            )));
        }

        let report = self.import.run(subject.id, entries).await;
        Ok(vec![Reply::html(chat, report.render_html())])
    }

    // --- free-text follow-ups ---

    async fn handle_followup(&self, actor: &Actor, text: &str) -> Result<Vec<Reply>, FeedbotError> {
        let chat = actor.chat.id;
        let state = self.pending.get(chat);
        match state {
            PendingState::Idle => Ok(Vec::new()),

            PendingState::AwaitingSubscribeUrl { owner } => {
                let url = match parse_feed_url(text) {
                    Ok(url) => url,
                    Err(e) => {
                        let prompt = format!("{} {SUBSCRIBE_PROMPT}", e.user_message());
                        return Ok(vec![Reply::Send {
                            chat,
                            text: prompt,
                            format: TextFormat::Plain,
                            keyboard: Keyboard::ForceReply,
                        }]);
                    }
                };
                self.authorizer.ensure(actor, owner).await?;
                if !self.claim(chat, state) {
                    return Ok(Vec::new());
                }
                let text = self.subscribe(owner, &url).await?;
                Ok(vec![Reply::html(chat, text)])
            }

            PendingState::AwaitingUnsubscribeChoice { owner } => {
                let Some(source_id) = parse_source_choice(text) else {
                    return Ok(vec![Reply::plain(
                        chat,
                        "Please pick a feed from the keyboard, like \"[12] Feed title\".",
                    )]);
                };
                self.authorizer.ensure(actor, owner).await?;
                if !self.claim(chat, state) {
                    return Ok(Vec::new());
                }
                match self.unsubscribe_source(owner, source_id).await {
                    Ok(text) => Ok(vec![Reply::html_with(chat, text, Keyboard::RemoveReply)]),
                    Err(e) => Err(self.restore_on_not_found(chat, state, e)),
                }
            }

            PendingState::AwaitingSettingsTarget { owner } => {
                let Some(url) = find_feed_url(text) else {
                    return Ok(vec![Reply::plain(
                        chat,
                        "Please pick a feed from the keyboard or send its URL.",
                    )]);
                };
                self.authorizer.ensure(actor, owner).await?;
                if !self.claim(chat, state) {
                    return Ok(Vec::new());
                }
                match self.settings_for_link(actor, owner, &url).await {
                    Ok(view) => Ok(vec![settings_reply(chat, None, &view)]),
                    Err(e) => Err(self.restore_on_not_found(chat, state, e)),
                }
            }

            PendingState::AwaitingTagInput { subscription_id, .. } => {
                self.claim(chat, state);
                debug!(chat_id = %chat, subscription_id, "dropping free text while awaiting tags");
                Ok(Vec::new())
            }
        }
    }

    /// Consumes `state` for `chat`. `false` means another event got there first.
    fn claim(&self, chat: ChatId, state: PendingState) -> bool {
        let claimed = self
            .pending
            .compare_and_set(chat, state, PendingState::Idle);
        if !claimed {
            debug!(chat_id = %chat, state = %state, "pending state already consumed");
        }
        claimed
    }

    /// Puts a consumed state back when its target turned out not to exist,
    /// so the user can pick again.
    fn restore_on_not_found(&self, chat: ChatId, state: PendingState, e: FeedbotError) -> FeedbotError {
        if matches!(e, FeedbotError::NotFound { .. }) {
            self.pending
                .compare_and_set(chat, PendingState::Idle, state);
        }
        e
    }

    async fn settings_for_link(
        &self,
        actor: &Actor,
        owner: ChatId,
        url: &str,
    ) -> Result<SettingsView, FeedbotError> {
        let source = self
            .store
            .get_source_by_link(url)
            .await?
            .ok_or_else(|| FeedbotError::not_found("subscription"))?;
        self.settings
            .view(actor, &ActionToken::new(owner, source.id))
            .await
    }

    // --- callbacks ---

    async fn handle_callback(&self, callback: InboundCallback) -> Vec<Reply> {
        let InboundCallback {
            actor,
            callback_id,
            message_id,
            data,
        } = callback;

        let outcome = match data.parse::<Callback>() {
            Ok(parsed) => {
                debug!(chat_id = %actor.chat.id, user_id = %actor.user_id, action = %parsed.action(), "callback received");
                self.run_callback(&actor, message_id, parsed).await
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok((text, mut replies)) => {
                replies.insert(0, Reply::AnswerCallback { callback_id, text });
                replies
            }
            Err(e) => {
                log_failure(&actor, &e);
                vec![Reply::AnswerCallback {
                    callback_id,
                    text: Some(e.user_message()),
                }]
            }
        }
    }

    async fn run_callback(
        &self,
        actor: &Actor,
        message_id: Option<i32>,
        callback: Callback,
    ) -> Result<CallbackOutcome, FeedbotError> {
        let chat = actor.chat.id;
        match callback {
            Callback::Feed { action, token } => match action {
                CallbackAction::SetItem => {
                    let view = self.settings.view(actor, &token).await?;
                    self.pending.compare_and_set(
                        chat,
                        PendingState::AwaitingSettingsTarget { owner: token.owner },
                        PendingState::Idle,
                    );
                    Ok((None, vec![settings_reply(chat, message_id, &view)]))
                }
                CallbackAction::ToggleNotice
                | CallbackAction::ToggleTelegraph
                | CallbackAction::ToggleUpdate => {
                    let which = SettingsToggle::from_action(action).ok_or_else(|| {
                        FeedbotError::Internal(format!("{action} is not a toggle"))
                    })?;
                    let view = self.settings.toggle(actor, &token, which).await?;
                    Ok((
                        Some("Updated".to_string()),
                        vec![settings_reply(chat, message_id, &view)],
                    ))
                }
                CallbackAction::SetTag => {
                    let view = self.settings.view(actor, &token).await?;
                    let subscription_id = view.subscription.id;
                    self.pending.set(
                        chat,
                        PendingState::AwaitingTagInput {
                            owner: token.owner,
                            subscription_id,
                        },
                    );
                    Ok((
                        None,
                        vec![Reply::html(
                            chat,
                            format!(
                                "Send <code>/setfeedtag {subscription_id} tag1 tag2 tag3</code> \
                                 to tag this subscription (up to {} tags).",
                                self.feed.max_tags
                            ),
                        )],
                    ))
                }
                CallbackAction::UnsubItem => {
                    self.authorizer.ensure(actor, token.owner).await?;
                    let text = self.unsubscribe_source(token.owner, token.source_id).await?;
                    self.pending.compare_and_set(
                        chat,
                        PendingState::AwaitingUnsubscribeChoice { owner: token.owner },
                        PendingState::Idle,
                    );
                    Ok((None, vec![edit_or_send(chat, message_id, text, Vec::new())]))
                }
                CallbackAction::UnsubAllConfirm
                | CallbackAction::UnsubAllCancel
                | CallbackAction::Export => Err(FeedbotError::Internal(format!(
                    "{action} does not take a feed token"
                ))),
            },

            Callback::Owner { action, owner } => match action {
                CallbackAction::UnsubAllConfirm => {
                    self.authorizer.ensure(actor, owner).await?;
                    let outcome = self.store.delete_all_subscriptions(owner).await?;
                    info!(owner = %owner, removed = outcome.succeeded, failed = outcome.failed, "all subscriptions removed");
                    let mut text = format!("Removed {} subscription(s).", outcome.succeeded);
                    if outcome.failed > 0 {
                        text.push_str(&format!(" {} could not be removed.", outcome.failed));
                    }
                    Ok((None, vec![edit_or_send(chat, message_id, text, Vec::new())]))
                }
                CallbackAction::UnsubAllCancel => Ok((
                    None,
                    vec![edit_or_send(
                        chat,
                        message_id,
                        "Cancelled, nothing was removed.".to_string(),
                        Vec::new(),
                    )],
                )),
                CallbackAction::Export => {
                    self.authorizer.ensure(actor, owner).await?;
                    let subject = self.describe_chat(actor, owner).await;
                    Ok((None, self.export(chat, &subject).await?))
                }
                _ => Err(FeedbotError::Internal(format!(
                    "{action} needs a feed token"
                ))),
            },
        }
    }

    /// Best-effort chat description for labels; falls back to the bare id.
    async fn describe_chat(&self, actor: &Actor, id: ChatId) -> ChatInfo {
        if actor.chat.id == id {
            return actor.chat.clone();
        }
        match self.transport.resolve_chat(&ChatLookup::Id(id)).await {
            Ok(chat) => chat,
            Err(e) => {
                debug!(chat_id = %id, error = %e, "could not describe chat");
                ChatInfo::private(id)
            }
        }
    }

    // --- shared operations ---

    /// Subscribes `owner` to the feed at `raw`. Re-subscribing reports the
    /// existing subscription instead of creating a second one.
    async fn subscribe(&self, owner: ChatId, raw: &str) -> Result<String, FeedbotError> {
        let url = parse_feed_url(raw)?;
        let source = self.store.find_or_create_source(&url, None).await?;
        let registration = self
            .store
            .register_subscription(owner, source.id, &self.feed.subscription_defaults())
            .await?;
        let subscription = registration.subscription();
        if registration.is_new() {
            info!(owner = %owner, source_id = source.id, subscription_id = subscription.id, "subscribed");
            Ok(format!(
                "Subscribed to {} (sub id {}).",
                source_link(&source),
                subscription.id
            ))
        } else {
            Ok(format!(
                "Already subscribed to {} (sub id {}).",
                source_link(&source),
                subscription.id
            ))
        }
    }

    async fn unsubscribe_source(&self, owner: ChatId, source_id: i64) -> Result<String, FeedbotError> {
        let source = self
            .store
            .get_source(source_id)
            .await?
            .ok_or_else(|| FeedbotError::not_found("subscription"))?;
        self.unsubscribe(owner, &source).await
    }

    async fn unsubscribe(&self, owner: ChatId, source: &Source) -> Result<String, FeedbotError> {
        if !self
            .store
            .delete_subscription_for_source(owner, source.id)
            .await?
        {
            return Err(FeedbotError::not_found("subscription"));
        }
        info!(owner = %owner, source_id = source.id, "unsubscribed");
        Ok(format!("Unsubscribed from {}.", source_link(source)))
    }
}

fn parse_subscription_id(raw: &str) -> Result<i64, FeedbotError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| FeedbotError::InvalidInput(format!("`{raw}` is not a subscription id.")))
}

fn parse_interval(raw: &str) -> Result<u32, FeedbotError> {
    let minutes: i64 = raw
        .trim()
        .parse()
        .map_err(|_| FeedbotError::InvalidInput(format!("`{raw}` is not a number of minutes.")))?;
    if minutes <= 0 {
        return Err(FeedbotError::InvalidInput(
            "The interval must be a positive number of minutes.".to_string(),
        ));
    }
    u32::try_from(minutes)
        .map_err(|_| FeedbotError::InvalidInput(format!("{minutes} minutes is too long.")))
}

fn feed_buttons(
    owner: ChatId,
    entries: &[SubscriptionEntry],
    action: CallbackAction,
) -> Vec<Vec<Button>> {
    entries
        .iter()
        .map(|e| {
            let token = ActionToken::new(owner, e.source.id).with_subscription(e.subscription.id);
            vec![Button::new(
                e.source.display_title(),
                Callback::feed(action, token).encode(),
            )]
        })
        .collect()
}

fn edit_or_send(chat: ChatId, message_id: Option<i32>, text: String, buttons: Vec<Vec<Button>>) -> Reply {
    match message_id {
        Some(message_id) => Reply::Edit {
            chat,
            message_id,
            text,
            format: TextFormat::Html,
            buttons,
        },
        None if buttons.is_empty() => Reply::html(chat, text),
        None => Reply::html_with(chat, text, Keyboard::Inline(buttons)),
    }
}

fn settings_reply(chat: ChatId, message_id: Option<i32>, view: &SettingsView) -> Reply {
    edit_or_send(chat, message_id, view.render_html(), view.buttons())
}

fn log_failure(actor: &Actor, e: &FeedbotError) {
    match e {
        FeedbotError::Transport { .. } | FeedbotError::Storage { .. } => {
            warn!(chat_id = %actor.chat.id, user_id = %actor.user_id, error = %e, "collaborator unavailable");
        }
        FeedbotError::Config(_) | FeedbotError::Internal(_) => {
            error!(chat_id = %actor.chat.id, user_id = %actor.user_id, error = %e, "request failed");
        }
        FeedbotError::Unauthorized | FeedbotError::NotFound { .. } | FeedbotError::InvalidInput(_) => {
            debug!(chat_id = %actor.chat.id, user_id = %actor.user_id, error = %e, "request rejected");
        }
    }
}

fn failure_reply(actor: &Actor, e: &FeedbotError) -> Reply {
    log_failure(actor, e);
    Reply::plain(actor.chat.id, e.user_message())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_must_be_positive() {
        assert_eq!(parse_interval("15").unwrap(), 15);
        assert!(matches!(parse_interval("0"), Err(FeedbotError::InvalidInput(_))));
        assert!(matches!(parse_interval("-5"), Err(FeedbotError::InvalidInput(_))));
        assert!(matches!(parse_interval("ten"), Err(FeedbotError::InvalidInput(_))));
        assert!(parse_interval("99999999999").is_err());
    }

    #[test]
    fn subscription_ids_are_positive_integers() {
        assert_eq!(parse_subscription_id(" 12 ").unwrap(), 12);
        assert!(parse_subscription_id("0").is_err());
        assert!(parse_subscription_id("abc").is_err());
    }

    #[test]
    fn edit_replaces_message_when_known() {
        let reply = edit_or_send(ChatId(1), Some(5), "x".into(), Vec::new());
        assert!(matches!(reply, Reply::Edit { message_id: 5, .. }));
        let reply = edit_or_send(ChatId(1), None, "x".into(), vec![vec![Button::new("a", "b")]]);
        assert!(matches!(reply, Reply::Send { keyboard: Keyboard::Inline(_), .. }));
    }

    #[test]
    fn failure_reply_uses_user_message() {
        let actor = Actor::private(ChatId(3));
        let reply = failure_reply(&actor, &FeedbotError::Unauthorized);
        assert_eq!(reply.text(), Some(FeedbotError::Unauthorized.user_message().as_str()));
    }
}
