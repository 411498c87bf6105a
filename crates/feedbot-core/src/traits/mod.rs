// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! Adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod opml;
pub mod storage;
pub mod transport;

pub use adapter::PluginAdapter;
pub use opml::OpmlCodec;
pub use storage::SubscriptionStore;
pub use transport::TransportAdapter;
