// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTML text shown in chats.

use feedbot_core::{ChatInfo, Source, SubscriptionEntry};

use crate::commands::Command;

/// Escapes text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// `<a href="link">title</a>` for a source.
pub fn source_link(source: &Source) -> String {
    format!(
        "<a href=\"{}\">{}</a>",
        escape_html(&source.link),
        escape_html(source.display_title())
    )
}

pub fn help_text() -> String {
    let mut text = String::from("<b>Commands</b>\n");
    for command in Command::all() {
        let (args, description) = command.usage();
        if args.is_empty() {
            text.push_str(&format!("/{command} - {description}\n"));
        } else {
            text.push_str(&format!(
                "/{command} {} - {description}\n",
                escape_html(args)
            ));
        }
    }
    text.push_str("\nSend an <code>.opml</code> file to import subscriptions.");
    text
}

/// Heading naming whose subscriptions are shown.
fn owner_heading(owner: &ChatInfo, heading: &str) -> String {
    match owner.kind {
        feedbot_core::ChatKind::Private => format!("<b>{heading}</b>\n"),
        _ => format!("<b>{heading} of {}</b>\n", escape_html(&owner.display_name())),
    }
}

/// `[sub id] title` lines, one per subscription.
pub fn subscription_list(owner: &ChatInfo, entries: &[SubscriptionEntry], threshold: i64) -> String {
    let mut text = owner_heading(owner, "Subscriptions");
    for entry in entries {
        let paused = if entry.source.is_enabled(threshold) {
            ""
        } else {
            " (paused)"
        };
        text.push_str(&format!(
            "[{}] {}{paused}",
            entry.subscription.id,
            source_link(&entry.source)
        ));
        if !entry.subscription.tags.is_empty() {
            let tags: Vec<String> = entry
                .subscription
                .tags
                .iter()
                .map(|t| format!("#{}", escape_html(t)))
                .collect();
            text.push(' ');
            text.push_str(&tags.join(" "));
        }
        text.push('\n');
    }
    text
}

pub fn error_source_list(owner: &ChatInfo, sources: &[Source]) -> String {
    let mut text = owner_heading(owner, "Failing feeds");
    for source in sources {
        text.push_str(&format!(
            "[{}] {} ({} errors)\n",
            source.id,
            source_link(source),
            source.effective_errors()
        ));
    }
    text
}

/// Reply-keyboard label for picking a source to unsubscribe.
pub fn unsubscribe_choice_label(source: &Source) -> String {
    format!("[{}] {}", source.id, source.display_title())
}

/// Reply-keyboard label for picking a source to configure.
pub fn settings_choice_label(source: &Source) -> String {
    format!("{} {}", source.display_title(), source.link)
}
