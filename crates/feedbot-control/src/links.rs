// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feed URL validation.

use feedbot_core::FeedbotError;

/// Validates a feed URL and returns its normalized form.
///
/// Only absolute `http`/`https` URLs with a host are accepted.
pub fn parse_feed_url(raw: &str) -> Result<String, FeedbotError> {
    let raw = raw.trim();
    let parsed = url::Url::parse(raw)
        .map_err(|_| FeedbotError::InvalidInput(format!("`{raw}` is not a valid feed URL.")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FeedbotError::InvalidInput(format!(
            "Only http and https feeds are supported, got `{}`.",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(FeedbotError::InvalidInput(format!(
            "`{raw}` has no host."
        )));
    }

    Ok(parsed.to_string())
}

/// The first whitespace-separated token of `text` that is a valid feed URL.
pub fn find_feed_url(text: &str) -> Option<String> {
    text.split_whitespace()
        .find_map(|token| parse_feed_url(token).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert_eq!(
            parse_feed_url(" https://example.com/feed.xml ").unwrap(),
            "https://example.com/feed.xml"
        );
        assert_eq!(
            parse_feed_url("http://example.com/rss?page=1").unwrap(),
            "http://example.com/rss?page=1"
        );
    }

    #[test]
    fn normalizes_bare_host() {
        assert_eq!(parse_feed_url("https://Example.COM").unwrap(), "https://example.com/");
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        for bad in ["ftp://example.com/feed", "file:///etc/passwd", "example.com/feed", "hello", ""] {
            assert!(
                matches!(parse_feed_url(bad), Err(FeedbotError::InvalidInput(_))),
                "{bad:?} was accepted"
            );
        }
    }

    #[test]
    fn finds_url_among_words() {
        assert_eq!(
            find_feed_url("Rust Blog https://blog.rust-lang.org/feed.xml").as_deref(),
            Some("https://blog.rust-lang.org/feed.xml")
        );
        assert_eq!(find_feed_url("no links here"), None);
    }
}
