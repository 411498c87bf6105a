// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OPML import/export codec trait.

use crate::error::FeedbotError;
use crate::types::{FeedEntry, Source};

/// Converts between OPML documents and feed references.
pub trait OpmlCodec: Send + Sync + 'static {
    /// Extracts every feed outline, flattening nested folders.
    ///
    /// A malformed document is an [`FeedbotError::InvalidInput`].
    fn parse(&self, document: &[u8]) -> Result<Vec<FeedEntry>, FeedbotError>;

    /// Renders `sources` as a flat OPML document.
    fn render(&self, title: &str, sources: &[Source]) -> Result<String, FeedbotError>;
}
