// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./feedbot.toml` > `~/.config/feedbot/feedbot.toml` > `/etc/feedbot/feedbot.toml`
//! with environment variable overrides via `FEEDBOT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::FeedbotConfig;

/// Top-level sections, used to turn `FEEDBOT_<SECTION>_<KEY>` into `<section>.<key>`.
const SECTIONS: &[&str] = &["bot", "telegram", "storage", "feed"];

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/feedbot/feedbot.toml";
pub(crate) const LOCAL_CONFIG_PATH: &str = "feedbot.toml";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/feedbot/feedbot.toml` (system-wide)
/// 3. `~/.config/feedbot/feedbot.toml` (user XDG config)
/// 4. `./feedbot.toml` (local directory)
/// 5. `FEEDBOT_*` environment variables
pub fn load_config() -> Result<FeedbotConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<FeedbotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FeedbotConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<FeedbotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FeedbotConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(FeedbotConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

pub(crate) fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("feedbot/feedbot.toml"))
}

/// Environment provider mapping the first underscore after a known section to a dot.
///
/// `FEEDBOT_TELEGRAM_BOT_TOKEN` must map to `telegram.bot_token`, never
/// `telegram.bot.token`, so only the section prefix is rewritten.
fn env_provider() -> Env {
    Env::prefixed("FEEDBOT_").map(|key| map_env_key(key.as_str()).into())
}

/// `telegram_bot_token` -> `telegram.bot_token`. Unknown sections pass through.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
