// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as positive thresholds and non-empty paths.

use feedbot_core::MAX_TAGS;

use crate::diagnostic::ConfigError;
use crate::model::FeedbotConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &FeedbotConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.bot.name.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "bot.name must not be empty".to_string(),
        });
    }

    if !LOG_LEVELS.contains(&config.bot.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "bot.log_level `{}` is not one of {}",
                config.bot.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if let Some(token) = &config.telegram.bot_token
        && token.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "telegram.bot_token must not be empty when set".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    let feed = &config.feed;
    if feed.error_threshold <= 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "feed.error_threshold must be positive, got {}",
                feed.error_threshold
            ),
        });
    }

    if feed.default_interval_minutes == 0 {
        errors.push(ConfigError::Validation {
            message: "feed.default_interval_minutes must be positive, got 0".to_string(),
        });
    }

    if !(1..=MAX_TAGS).contains(&feed.max_tags) {
        errors.push(ConfigError::Validation {
            message: format!(
                "feed.max_tags must be between 1 and {MAX_TAGS}, got {}",
                feed.max_tags
            ),
        });
    }

    if feed.max_import_entries == 0 {
        errors.push(ConfigError::Validation {
            message: "feed.max_import_entries must be positive, got 0".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Checks the settings `feedbot serve` cannot run without.
pub fn validate_for_serve(config: &FeedbotConfig) -> Result<(), Vec<ConfigError>> {
    match config.telegram.bot_token.as_deref() {
        Some(token) if !token.trim().is_empty() => Ok(()),
        _ => Err(vec![ConfigError::MissingKey {
            key: "telegram.bot_token".to_string(),
        }]),
    }
}
