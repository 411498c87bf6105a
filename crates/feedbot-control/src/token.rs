// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Callback payloads carried by inline buttons.
//!
//! Wire form is `<action>|<owner>:<source>[:<subscription>]` for actions on
//! one feed and `<action>|<owner>` for actions on a whole owner. Payloads
//! are parsed once, before any authorization check, and anything that does
//! not match exactly is rejected.

use std::fmt;
use std::str::FromStr;

use feedbot_core::{ChatId, FeedbotError};
use strum::{Display, EnumString};

/// Telegram caps callback data at 64 bytes.
pub const MAX_CALLBACK_DATA: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum CallbackAction {
    SetItem,
    ToggleNotice,
    ToggleTelegraph,
    ToggleUpdate,
    SetTag,
    UnsubItem,
    #[strum(serialize = "unsuball_confirm")]
    UnsubAllConfirm,
    #[strum(serialize = "unsuball_cancel")]
    UnsubAllCancel,
    Export,
}

impl CallbackAction {
    /// Actions addressing one (owner, source) pair rather than a whole owner.
    pub fn targets_feed(self) -> bool {
        !matches!(
            self,
            Self::UnsubAllConfirm | Self::UnsubAllCancel | Self::Export
        )
    }
}

/// Reference to one subscription as seen by the chat that rendered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionToken {
    pub owner: ChatId,
    pub source_id: i64,
    pub subscription_id: Option<i64>,
}

impl ActionToken {
    pub fn new(owner: ChatId, source_id: i64) -> Self {
        Self {
            owner,
            source_id,
            subscription_id: None,
        }
    }

    pub fn with_subscription(mut self, subscription_id: i64) -> Self {
        self.subscription_id = Some(subscription_id);
        self
    }
}

impl fmt::Display for ActionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.owner, self.source_id)?;
        if let Some(id) = self.subscription_id {
            write!(f, ":{id}")?;
        }
        Ok(())
    }
}

impl FromStr for ActionToken {
    type Err = FeedbotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let owner = parse_id(parts.next(), "owner")?;
        let source_id = parse_id(parts.next(), "source")?;
        let subscription_id = parts.next().map(|p| parse_id(Some(p), "subscription")).transpose()?;
        if parts.next().is_some() {
            return Err(malformed("too many token fields"));
        }
        Ok(Self {
            owner: ChatId(owner),
            source_id,
            subscription_id,
        })
    }
}

/// A validated callback payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Callback {
    Feed {
        action: CallbackAction,
        token: ActionToken,
    },
    Owner {
        action: CallbackAction,
        owner: ChatId,
    },
}

impl Callback {
    pub fn feed(action: CallbackAction, token: ActionToken) -> Self {
        Self::Feed { action, token }
    }

    pub fn owner(action: CallbackAction, owner: ChatId) -> Self {
        Self::Owner { action, owner }
    }

    pub fn action(&self) -> CallbackAction {
        match self {
            Self::Feed { action, .. } | Self::Owner { action, .. } => *action,
        }
    }

    /// The chat whose subscriptions the button acts on.
    pub fn subject(&self) -> ChatId {
        match self {
            Self::Feed { token, .. } => token.owner,
            Self::Owner { owner, .. } => *owner,
        }
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Feed { action, token } => write!(f, "{action}|{token}"),
            Self::Owner { action, owner } => write!(f, "{action}|{owner}"),
        }
    }
}

impl FromStr for Callback {
    type Err = FeedbotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() > MAX_CALLBACK_DATA {
            return Err(malformed("payload too long"));
        }
        let (action, rest) = s.split_once('|').ok_or_else(|| malformed("missing separator"))?;
        let action = CallbackAction::from_str(action).map_err(|_| malformed("unknown action"))?;

        if action.targets_feed() {
            Ok(Self::Feed {
                action,
                token: rest.parse()?,
            })
        } else {
            let owner = parse_id(Some(rest), "owner")?;
            Ok(Self::Owner {
                action,
                owner: ChatId(owner),
            })
        }
    }
}

fn parse_id(part: Option<&str>, field: &str) -> Result<i64, FeedbotError> {
    part.filter(|p| !p.is_empty())
        .and_then(|p| p.parse::<i64>().ok())
        .ok_or_else(|| malformed(&format!("bad {field} id")))
}

fn malformed(reason: &str) -> FeedbotError {
    FeedbotError::InvalidInput(format!("This button is no longer valid ({reason})."))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn feed_callback_wire_form() {
        let token = ActionToken::new(ChatId(-1001234567890), 42).with_subscription(7);
        let callback = Callback::feed(CallbackAction::ToggleNotice, token);
        assert_eq!(callback.encode(), "toggle_notice|-1001234567890:42:7");
        assert_eq!(callback.encode().parse::<Callback>().unwrap(), callback);
    }

    #[test]
    fn owner_callback_wire_form() {
        let callback = Callback::owner(CallbackAction::UnsubAllConfirm, ChatId(99));
        assert_eq!(callback.encode(), "unsuball_confirm|99");
        assert_eq!(callback.subject(), ChatId(99));
    }

    #[test]
    fn token_without_subscription() {
        let token: ActionToken = "5:9".parse().unwrap();
        assert_eq!(token, ActionToken::new(ChatId(5), 9));
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        for bad in [
            "",
            "toggle_notice",
            "toggle_notice|",
            "toggle_notice|abc:1",
            "toggle_notice|1",
            "toggle_notice|1:2:3:4",
            "toggle_notice|1::3",
            "explode|1:2",
            "unsuball_confirm|1:2",
            "set_item|1:2|3",
        ] {
            let err = bad.parse::<Callback>().unwrap_err();
            assert!(matches!(err, FeedbotError::InvalidInput(_)), "{bad:?} was accepted");
        }
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let long = format!("set_item|{}:1", "1".repeat(70));
        assert!(long.parse::<Callback>().is_err());
    }

    #[test]
    fn owner_actions_do_not_target_a_feed() {
        assert!(CallbackAction::SetTag.targets_feed());
        assert!(!CallbackAction::Export.targets_feed());
        assert!(!CallbackAction::UnsubAllCancel.targets_feed());
    }

    proptest! {
        #[test]
        fn any_feed_token_survives_the_wire(
            owner in -10_000_000_000_000i64..10_000_000_000_000,
            source in 0i64..1_000_000_000,
            sub in proptest::option::of(0i64..1_000_000_000),
        ) {
            let token = ActionToken { owner: ChatId(owner), source_id: source, subscription_id: sub };
            let callback = Callback::feed(CallbackAction::ToggleTelegraph, token);
            let encoded = callback.encode();
            prop_assert!(encoded.len() <= MAX_CALLBACK_DATA);
            prop_assert_eq!(encoded.parse::<Callback>().unwrap(), callback);
        }

        #[test]
        fn arbitrary_text_never_panics(data in ".{0,80}") {
            let _ = data.parse::<Callback>();
        }
    }
}
