// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subscription control plane for feedbot.
//!
//! The [`Controller`] is the entry point: it receives inbound events from a
//! transport and produces replies. Underneath it sit
//! - [`Authorizer`], which gates every mutation on the actor's rights over
//!   the owning chat,
//! - [`PendingStore`], the per-chat conversation state for multi-step
//!   commands,
//! - [`SettingsEngine`], which flips per-subscription and per-feed switches,
//! - [`ImportPipeline`], which registers OPML imports entry by entry.

pub mod auth;
pub mod commands;
pub mod controller;
pub mod import;
pub mod links;
pub mod pending;
pub mod render;
pub mod settings;
pub mod shutdown;
pub mod token;

pub use auth::Authorizer;
pub use commands::{Command, CommandLine, parse_command};
pub use controller::Controller;
pub use import::{ImportFailure, ImportPipeline, ImportReport};
pub use pending::{PendingState, PendingStore};
pub use settings::{SettingsEngine, SettingsToggle, SettingsView};
pub use shutdown::install_signal_handler;
pub use token::{ActionToken, Callback, CallbackAction, MAX_CALLBACK_DATA};
