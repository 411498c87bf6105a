// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch import pipeline.
//!
//! Registers a list of feed entries for one owner, strictly in order, one
//! entry at a time. A failing entry is recorded and the pipeline moves on;
//! the batch as a whole never fails. Authorization of the owner happens once,
//! before [`ImportPipeline::run`] is called.

use std::sync::Arc;

use feedbot_core::{ChatId, FeedEntry, FeedbotError, Registration, SubscriptionDefaults, SubscriptionStore};
use futures::StreamExt;
use futures::stream;
use tracing::{info, warn};

use crate::links::parse_feed_url;
use crate::render::escape_html;

/// An entry that could not be imported, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFailure {
    pub entry: FeedEntry,
    pub reason: String,
}

/// Outcome of one import, partitioned in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub success: Vec<FeedEntry>,
    pub failure: Vec<ImportFailure>,
    /// Successful entries that were already subscribed.
    pub existing: usize,
}

impl ImportReport {
    pub fn total(&self) -> usize {
        self.success.len() + self.failure.len()
    }

    pub fn render_html(&self) -> String {
        let mut text = format!(
            "<b>Import finished</b>\nsuccess: {}, failure: {}\n",
            self.success.len(),
            self.failure.len()
        );
        if !self.success.is_empty() {
            text.push_str("\n<b>Imported</b>\n");
            for (i, entry) in self.success.iter().enumerate() {
                text.push_str(&format!("{}. {}\n", i + 1, escape_html(entry.label())));
            }
        }
        if !self.failure.is_empty() {
            text.push_str("\n<b>Failed</b>\n");
            for (i, failed) in self.failure.iter().enumerate() {
                text.push_str(&format!("{}. {}\n", i + 1, escape_html(failed.entry.label())));
            }
        }
        text
    }
}

#[derive(Clone)]
pub struct ImportPipeline {
    store: Arc<dyn SubscriptionStore>,
    defaults: SubscriptionDefaults,
}

impl ImportPipeline {
    pub fn new(store: Arc<dyn SubscriptionStore>, defaults: SubscriptionDefaults) -> Self {
        Self { store, defaults }
    }

    /// Imports every entry for `owner`, draining the whole input.
    pub async fn run(&self, owner: ChatId, entries: Vec<FeedEntry>) -> ImportReport {
        let total = entries.len();
        let report = stream::iter(entries)
            .fold(ImportReport::default(), |mut report, entry| async move {
                match self.import_one(owner, &entry).await {
                    Ok(registration) => {
                        if !registration.is_new() {
                            report.existing += 1;
                        }
                        report.success.push(entry);
                    }
                    Err(e) => {
                        warn!(owner = %owner, url = %entry.url, error = %e, "import entry failed");
                        report.failure.push(ImportFailure {
                            reason: e.user_message(),
                            entry,
                        });
                    }
                }
                report
            })
            .await;

        info!(
            owner = %owner,
            total,
            success = report.success.len(),
            failure = report.failure.len(),
            existing = report.existing,
            "import finished"
        );
        report
    }

    async fn import_one(&self, owner: ChatId, entry: &FeedEntry) -> Result<Registration, FeedbotError> {
        let url = parse_feed_url(&entry.url)?;
        let title = entry.title.as_deref().filter(|t| !t.trim().is_empty());
        let source = self.store.find_or_create_source(&url, title).await?;
        self.store
            .register_subscription(owner, source.id, &self.defaults)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(url: &str, title: Option<&str>) -> FeedEntry {
        FeedEntry {
            url: url.to_string(),
            title: title.map(str::to_string),
        }
    }

    #[test]
    fn report_lists_both_partitions_in_order() {
        let report = ImportReport {
            success: vec![entry("https://a.example/rss", Some("A")), entry("https://c.example/rss", None)],
            failure: vec![ImportFailure {
                entry: entry("not a url", Some("B <broken>")),
                reason: "bad".into(),
            }],
            existing: 0,
        };
        let text = report.render_html();
        assert!(text.contains("success: 2, failure: 1"));
        assert!(text.contains("1. A\n2. https://c.example/rss\n"));
        assert!(text.contains("<b>Failed</b>\n1. B &lt;broken&gt;"));
        assert_eq!(report.total(), 3);
    }

    #[test]
    fn empty_report_has_only_counts() {
        let text = ImportReport::default().render_html();
        assert!(text.contains("success: 0, failure: 0"));
        assert!(!text.contains("Imported"));
    }
}
