// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authorization resolver.
//!
//! Decides whether an acting user may mutate subscriptions owned by a
//! subject: the user's own private chat, a group, or a channel the user
//! administers. Admin facts are fetched from the transport on every call;
//! nothing is cached because admin lists change at any time.
//!
//! Every transport failure is a denial.

use std::sync::Arc;

use feedbot_core::{Actor, ChatId, ChatInfo, ChatKind, ChatLookup, FeedbotError, TransportAdapter};
use tracing::{debug, warn};

/// Gatekeeper consulted before every mutating operation.
#[derive(Clone)]
pub struct Authorizer {
    transport: Arc<dyn TransportAdapter>,
}

impl Authorizer {
    pub fn new(transport: Arc<dyn TransportAdapter>) -> Self {
        Self { transport }
    }

    /// Whether `actor` may act on behalf of the chat `subject`.
    pub async fn can_act(&self, actor: &Actor, subject: ChatId) -> bool {
        if actor.user_id == subject {
            return true;
        }
        if actor.chat.id == subject {
            return self.can_act_on(actor, &actor.chat).await;
        }
        match self.transport.resolve_chat(&ChatLookup::Id(subject)).await {
            Ok(chat) => self.can_act_on(actor, &chat).await,
            Err(e) => {
                warn!(user_id = %actor.user_id, subject = %subject, error = %e, "failed to resolve subject chat, denying");
                false
            }
        }
    }

    /// Same as [`Self::can_act`] for an already-resolved subject chat.
    pub async fn can_act_on(&self, actor: &Actor, subject: &ChatInfo) -> bool {
        if actor.user_id == subject.id {
            return true;
        }

        let permitted = match subject.kind {
            ChatKind::Private => false,
            ChatKind::Group | ChatKind::Supergroup => {
                match self.transport.is_chat_admin(subject.id, actor.user_id).await {
                    Ok(admin) => admin,
                    Err(e) => {
                        warn!(chat_id = %subject.id, user_id = %actor.user_id, error = %e, "admin lookup failed, denying");
                        false
                    }
                }
            }
            ChatKind::Channel => match self.transport.chat_administrators(subject.id).await {
                Ok(admins) => admins.contains(&actor.user_id),
                Err(e) => {
                    warn!(chat_id = %subject.id, user_id = %actor.user_id, error = %e, "administrator list unavailable, denying");
                    false
                }
            },
        };

        if !permitted {
            debug!(chat_id = %subject.id, user_id = %actor.user_id, kind = %subject.kind, "authorization denied");
        }
        permitted
    }

    /// Fails with [`FeedbotError::Unauthorized`] unless `actor` may act on `subject`.
    pub async fn ensure(&self, actor: &Actor, subject: ChatId) -> Result<(), FeedbotError> {
        if self.can_act(actor, subject).await {
            Ok(())
        } else {
            Err(FeedbotError::Unauthorized)
        }
    }

    /// Resolves the chat a command targets and checks the actor may act on it.
    ///
    /// Without a mention the subject is the chat the command was sent in.
    /// With one, the mentioned chat is looked up through the transport; a
    /// chat the transport cannot find is reported as invalid input.
    pub async fn resolve_subject(
        &self,
        actor: &Actor,
        mention: Option<&str>,
    ) -> Result<ChatInfo, FeedbotError> {
        let subject = match mention {
            None => actor.chat.clone(),
            Some(name) => {
                let lookup = ChatLookup::Mention(name.to_string());
                match self.transport.resolve_chat(&lookup).await {
                    Ok(chat) => chat,
                    Err(e) => {
                        warn!(lookup = %lookup, error = %e, "failed to resolve mentioned chat");
                        return Err(FeedbotError::InvalidInput(format!(
                            "Cannot find {lookup}. Make sure the bot has been added to it."
                        )));
                    }
                }
            }
        };

        if self.can_act_on(actor, &subject).await {
            Ok(subject)
        } else {
            Err(FeedbotError::Unauthorized)
        }
    }
}
