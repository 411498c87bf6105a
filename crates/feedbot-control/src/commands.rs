// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slash-command parsing.

use std::str::FromStr;

use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Commands understood by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Command {
    Start,
    Help,
    Ping,
    Version,
    Sub,
    Unsub,
    List,
    Check,
    Set,
    SetFeedTag,
    SetInterval,
    PauseAll,
    ActiveAll,
    UnsubAll,
    Import,
    Export,
}

impl Command {
    /// Argument synopsis and one-line description for `/help`.
    pub fn usage(self) -> (&'static str, &'static str) {
        match self {
            Self::Start => ("", "start using the bot"),
            Self::Help => ("", "show this help"),
            Self::Ping => ("", "check the bot is alive"),
            Self::Version => ("", "show the bot version"),
            Self::Sub => ("[@channel] [url]", "subscribe to a feed"),
            Self::Unsub => ("[@channel] [url]", "unsubscribe from a feed"),
            Self::List => ("[@channel]", "list subscriptions"),
            Self::Check => ("[@channel]", "list feeds that keep failing"),
            Self::Set => ("[@channel]", "configure a subscription"),
            Self::SetFeedTag => ("[@channel] <sub id> <tags...>", "tag a subscription (up to 3 tags)"),
            Self::SetInterval => ("<minutes> <sub id>...", "set the polling interval"),
            Self::PauseAll => ("[@channel]", "pause fetching every subscribed feed"),
            Self::ActiveAll => ("[@channel]", "resume fetching every subscribed feed"),
            Self::UnsubAll => ("[@channel]", "remove every subscription"),
            Self::Import => ("", "import subscriptions from an OPML file"),
            Self::Export => ("[@channel]", "export subscriptions as OPML"),
        }
    }

    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }
}

/// A command line split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub command: Command,
    /// A leading `@name` argument selecting a channel, without the `@`.
    pub mention: Option<String>,
    pub args: Vec<String>,
}

/// Parses `/cmd[@botname] [@channel] args...`.
///
/// Returns `None` for text that is not a command, for unknown commands, and
/// for commands addressed to a different bot.
pub fn parse_command(text: &str, bot_username: Option<&str>) -> Option<CommandLine> {
    let mut tokens = text.split_whitespace();
    let head = tokens.next()?.strip_prefix('/')?;

    let name = match head.split_once('@') {
        Some((name, target)) => {
            if let Some(me) = bot_username
                && !target.eq_ignore_ascii_case(me.trim_start_matches('@'))
            {
                return None;
            }
            name
        }
        None => head,
    };
    let command = Command::from_str(&name.to_ascii_lowercase()).ok()?;

    let mut args: Vec<String> = tokens.map(str::to_string).collect();
    let mention = match args.first() {
        Some(first) if first.len() > 1 && first.starts_with('@') => {
            Some(args.remove(0).trim_start_matches('@').to_string())
        }
        _ => None,
    };

    Some(CommandLine {
        command,
        mention,
        args,
    })
}

/// First `@name` token of free text such as a document caption.
pub fn find_mention(text: &str) -> Option<String> {
    text.split_whitespace()
        .find(|t| t.len() > 1 && t.starts_with('@'))
        .map(|t| t.trim_start_matches('@').to_string())
}

/// Source id from an unsubscribe choice of the form `[12] Feed title`.
pub fn parse_source_choice(text: &str) -> Option<i64> {
    let rest = text.trim().strip_prefix('[')?;
    let (id, _) = rest.split_once(']')?;
    id.trim().parse().ok()
}
