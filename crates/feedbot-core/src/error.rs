// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the feedbot control plane.

use thiserror::Error;

/// The primary error type used across all feedbot adapter traits and control operations.
#[derive(Debug, Error)]
pub enum FeedbotError {
    /// The acting identity may not operate on the requested subject.
    #[error("not permitted to act on this subject")]
    Unauthorized,

    /// A referenced entity (subscription, source, chat) does not exist.
    #[error("{what} not found")]
    NotFound { what: String },

    /// User-supplied input could not be parsed or failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Messaging transport errors (network failure, unknown chat, API rejection).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Storage backend errors (database connection, query failure, constraint violation).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FeedbotError {
    /// Shorthand for [`FeedbotError::NotFound`].
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Shorthand for a [`FeedbotError::Transport`] without an underlying cause.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// True when the failure came from a collaborator (transport or storage)
    /// rather than from the request itself.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Storage { .. })
    }

    /// Text suitable for showing to the chat that triggered the failure.
    ///
    /// Collaborator and internal failures are reported generically so that
    /// database or API details never leak into a conversation.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized => {
                "Only administrators of this chat or channel can do that.".to_string()
            }
            Self::NotFound { what } => {
                let mut chars = what.chars();
                match chars.next() {
                    Some(first) => format!("{}{} not found.", first.to_uppercase(), chars.as_str()),
                    None => "Not found.".to_string(),
                }
            }
            Self::InvalidInput(message) => message.clone(),
            Self::Transport { .. } | Self::Storage { .. } | Self::Config(_) | Self::Internal(_) => {
                "Something went wrong, please try again later.".to_string()
            }
        }
    }
}
