// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for feedbot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use feedbot_core::{SubscriptionDefaults, Toggle};
use serde::{Deserialize, Serialize};

/// Top-level feedbot configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FeedbotConfig {
    /// Bot identity and logging.
    #[serde(default)]
    pub bot: BotConfig,

    /// Telegram bot integration settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Subscription defaults and limits.
    #[serde(default)]
    pub feed: FeedConfig,
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Display name used in greetings and exported documents.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_bot_name() -> String {
    "feedbot".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram bot integration configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. Required by `feedbot serve`.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Telegram user ids or usernames allowed to talk to the bot.
    /// Empty admits everyone.
    #[serde(default)]
    pub allowed_users: Vec<String>,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("feedbot").join("feedbot.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("feedbot.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Subscription defaults and limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FeedConfig {
    /// Effective fetch failures at which a source stops being fetched.
    #[serde(default = "default_error_threshold")]
    pub error_threshold: i64,

    /// Fetch interval given to new subscriptions, in minutes.
    #[serde(default = "default_interval_minutes")]
    pub default_interval_minutes: u32,

    /// Tags kept per subscription (1 to 3).
    #[serde(default = "default_max_tags")]
    pub max_tags: usize,

    /// Whether new subscriptions notify on new items.
    #[serde(default = "default_true")]
    pub notify_by_default: bool,

    /// Whether new subscriptions publish items through Telegraph.
    #[serde(default = "default_true")]
    pub telegraph_by_default: bool,

    /// Largest OPML document, in outlines, accepted by an import.
    #[serde(default = "default_max_import_entries")]
    pub max_import_entries: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            error_threshold: default_error_threshold(),
            default_interval_minutes: default_interval_minutes(),
            max_tags: default_max_tags(),
            notify_by_default: default_true(),
            telegraph_by_default: default_true(),
            max_import_entries: default_max_import_entries(),
        }
    }
}

impl FeedConfig {
    /// Preferences stamped on new subscriptions. Switches are stored
    /// explicitly so later toggles never depend on the config in force.
    pub fn subscription_defaults(&self) -> SubscriptionDefaults {
        SubscriptionDefaults {
            interval_minutes: self.default_interval_minutes,
            notification: Toggle::from_bool(self.notify_by_default),
            telegraph: Toggle::from_bool(self.telegraph_by_default),
        }
    }
}

fn default_error_threshold() -> i64 {
    100
}

fn default_interval_minutes() -> u32 {
    10
}

fn default_max_tags() -> usize {
    3
}

fn default_true() -> bool {
    true
}

fn default_max_import_entries() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_defaults() {
        let feed = FeedConfig::default();
        assert_eq!(feed.error_threshold, 100);
        assert_eq!(feed.default_interval_minutes, 10);
        assert_eq!(feed.max_tags, 3);
        assert!(feed.notify_by_default);
        assert!(feed.telegraph_by_default);
    }

    #[test]
    fn subscription_defaults_are_explicit() {
        let feed = FeedConfig {
            notify_by_default: false,
            ..FeedConfig::default()
        };
        let defaults = feed.subscription_defaults();
        assert_eq!(defaults.notification, Toggle::Off);
        assert_eq!(defaults.telegraph, Toggle::On);
        assert_eq!(defaults.interval_minutes, 10);
    }

    #[test]
    fn database_path_ends_with_feedbot_db() {
        assert!(StorageConfig::default().database_path.ends_with("feedbot.db"));
    }
}
