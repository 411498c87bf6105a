// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the feedbot control plane.
//!
//! This crate provides the collaborator traits, error type, and domain
//! types shared across the feedbot workspace. Storage and transport
//! adapters implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

pub use error::FeedbotError;
pub use types::{
    Actor, AdapterType, BulkOutcome, Button, ChatId, ChatInfo, ChatKind, ChatLookup, FeedEntry,
    HealthStatus, InboundCallback, InboundEvent, InboundMessage, Keyboard, MAX_TAGS,
    MessageContent, Registration, Reply, Source, Subscription, SubscriptionDefaults,
    SubscriptionEntry, TextFormat, Toggle, User,
};

pub use traits::{OpmlCodec, PluginAdapter, SubscriptionStore, TransportAdapter};

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use proptest::prelude::*;

    use super::*;

    fn source(error_count: i64, error_baseline: i64) -> Source {
        Source {
            id: 1,
            link: "https://example.com/feed.xml".into(),
            title: String::new(),
            error_count,
            error_baseline,
        }
    }

    #[test]
    fn toggle_stored_form() {
        assert_eq!(Toggle::Default.to_string(), "default");
        assert_eq!(Toggle::from_str("on").unwrap(), Toggle::On);
        assert_eq!(Toggle::from_str("off").unwrap(), Toggle::Off);
        assert!(Toggle::from_str("maybe").is_err());
    }

    #[test]
    fn toggle_default_resolves_against_config() {
        assert!(Toggle::Default.is_on(true));
        assert!(!Toggle::Default.is_on(false));
        assert_eq!(Toggle::Default.flipped(true), Toggle::Off);
        assert_eq!(Toggle::Default.flipped(false), Toggle::On);
    }

    #[test]
    fn source_enabled_tracks_threshold() {
        assert!(source(4, 0).is_enabled(5));
        assert!(!source(5, 0).is_enabled(5));
        assert!(source(5, 5).is_enabled(5));
        assert_eq!(source(2, 7).effective_errors(), 0);
    }

    #[test]
    fn source_title_falls_back_to_link() {
        let mut s = source(0, 0);
        assert_eq!(s.display_title(), "https://example.com/feed.xml");
        s.title = "Example".into();
        assert_eq!(s.display_title(), "Example");
    }

    #[test]
    fn tags_are_truncated_and_stripped() {
        let tags = Subscription::normalize_tags(["#rust", "", "news", "#", "tech", "extra"], 3);
        assert_eq!(tags, vec!["rust", "news", "tech"]);
        assert_eq!(Subscription::normalize_tags(["a", "b"], 1), vec!["a"]);
        assert_eq!(Subscription::normalize_tags(["a", "b", "c", "d"], 10).len(), MAX_TAGS);
    }

    #[test]
    fn chat_display_name_prefers_title() {
        let mut chat = ChatInfo::private(ChatId(42));
        assert_eq!(chat.display_name(), "42");
        chat.username = Some("news".into());
        assert_eq!(chat.display_name(), "@news");
        chat.title = Some("News".into());
        assert_eq!(chat.display_name(), "News");
    }

    #[test]
    fn chat_kind_group_rules() {
        assert!(ChatKind::Group.is_group());
        assert!(ChatKind::Supergroup.is_group());
        assert!(!ChatKind::Channel.is_group());
        assert_eq!(ChatKind::from_str("supergroup").unwrap(), ChatKind::Supergroup);
    }

    #[test]
    fn mention_lookup_display_normalizes_at() {
        assert_eq!(ChatLookup::Mention("news".into()).to_string(), "@news");
        assert_eq!(ChatLookup::Mention("@news".into()).to_string(), "@news");
    }

    #[test]
    fn registration_accessors() {
        let sub = Subscription {
            id: 3,
            owner: ChatId(1),
            source_id: 9,
            interval_minutes: 10,
            notification: Toggle::On,
            telegraph: Toggle::Off,
            tags: vec![],
        };
        assert!(Registration::Created(sub.clone()).is_new());
        assert!(!Registration::Existing(sub.clone()).is_new());
        assert_eq!(Registration::Existing(sub).subscription().id, 3);
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_transport<T: TransportAdapter>() {}
        fn _assert_store<T: SubscriptionStore>() {}
        fn _assert_codec<T: OpmlCodec>() {}
    }

    proptest! {
        #[test]
        fn flipping_twice_restores_effective_state(default in any::<bool>(), start in 0u8..3) {
            let toggle = match start {
                0 => Toggle::Default,
                1 => Toggle::On,
                _ => Toggle::Off,
            };
            let twice = toggle.flipped(default).flipped(default);
            prop_assert_eq!(twice.is_on(default), toggle.is_on(default));
        }

        #[test]
        fn normalized_tags_never_exceed_limit(tokens in proptest::collection::vec("[#a-z]{0,6}", 0..10)) {
            let tags = Subscription::normalize_tags(&tokens, MAX_TAGS);
            prop_assert!(tags.len() <= MAX_TAGS);
            prop_assert!(tags.iter().all(|t| !t.is_empty() && !t.starts_with('#')));
        }
    }
}
