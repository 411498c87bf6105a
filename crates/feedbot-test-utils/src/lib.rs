// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for feedbot integration tests.
//!
//! Provides a scriptable transport and a harness wiring the real controller
//! over a temporary SQLite database, so control-plane scenarios run without
//! any network access.
//!
//! # Components
//!
//! - [`MockTransport`] - chats, admin lists, and files set up by the test;
//!   every delivered reply is captured
//! - [`TestHarness`] - controller + storage + OPML codec + mock transport

pub mod harness;
pub mod mock_transport;

pub use harness::{TestHarness, reply_texts};
pub use mock_transport::MockTransport;
