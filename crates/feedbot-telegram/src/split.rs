// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Splitting of long replies into Telegram-sized messages.
//!
//! Subscription lists are line oriented, so splits land on line
//! boundaries whenever possible and HTML tags stay within one message.

/// Largest index `<= max` that lies on a char boundary of `text`.
fn floor_boundary(text: &str, max: usize) -> usize {
    let mut index = max.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Splits text at a paragraph boundary at or before `max_len` bytes.
///
/// Priority: double newline > single newline > space > hard split.
pub fn split_at_paragraph_boundary(text: &str, max_len: usize) -> (&str, &str) {
    if text.len() <= max_len {
        return (text, "");
    }

    let cut = floor_boundary(text, max_len);
    let search_region = &text[..cut];

    if let Some(pos) = search_region.rfind("\n\n") {
        return (&text[..pos], text[pos + 2..].trim_start());
    }
    if let Some(pos) = search_region.rfind('\n') {
        return (&text[..pos], text[pos + 1..].trim_start());
    }
    if let Some(pos) = search_region.rfind(' ') {
        return (&text[..pos], &text[pos + 1..]);
    }

    (&text[..cut], &text[cut..])
}

/// Breaks `text` into chunks of at most `max_len` bytes. Always returns at
/// least one chunk.
pub fn split_message(text: &str, max_len: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;
    loop {
        let (head, tail) = split_at_paragraph_boundary(rest, max_len);
        // A boundary at position 0 would never make progress.
        let (head, tail) = if head.is_empty() && !tail.is_empty() {
            let cut = floor_boundary(rest, max_len).max(rest.chars().next().map_or(1, char::len_utf8));
            (&rest[..cut], &rest[cut..])
        } else {
            (head, tail)
        };
        chunks.push(head);
        if tail.is_empty() {
            return chunks;
        }
        rest = tail;
    }
}
