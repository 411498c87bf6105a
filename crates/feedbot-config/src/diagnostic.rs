// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns Figment errors into miette diagnostics pointing into feedbot.toml.
//!
//! Unknown keys get a "did you mean" hint (Jaro-Winkler via `strsim`) scoped
//! to the section they appeared in, so a typo under `[feed]` is only ever
//! matched against `[feed]` keys.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler score before a key is offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Environment variable prefix understood by the loader.
const ENV_PREFIX: &str = "FEEDBOT_";

/// A configuration problem, rendered by miette.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}`{}", section_suffix(section.as_deref()))]
    #[diagnostic(
        code(feedbot::config::unknown_key),
        help("{}", unknown_key_help(section.as_deref(), suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        /// Section the key appeared in; `None` at the top level.
        section: Option<String>,
        key: String,
        suggestion: Option<String>,
        /// Comma-separated keys accepted in that section.
        valid_keys: String,
        #[label("not a feedbot setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: {detail}")]
    #[diagnostic(code(feedbot::config::invalid_type), help("use a {expected} here"))]
    InvalidType {
        /// Dotted path, e.g. `feed.error_threshold`.
        key: String,
        detail: String,
        expected: String,
        #[label("expected {expected}")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(code(feedbot::config::missing_key), help("{}", missing_key_help(key)))]
    MissingKey { key: String },

    #[error("invalid setting: {message}")]
    #[diagnostic(code(feedbot::config::validation))]
    Validation { message: String },

    #[error("could not load configuration: {0}")]
    #[diagnostic(code(feedbot::config::other))]
    Other(String),
}

fn section_suffix(section: Option<&str>) -> String {
    section.map(|s| format!(" in [{s}]")).unwrap_or_default()
}

fn unknown_key_help(section: Option<&str>, suggestion: Option<&str>, valid_keys: &str) -> String {
    let scope = match section {
        Some(s) => format!("keys accepted in [{s}]"),
        None => "top-level sections".to_string(),
    };
    match suggestion {
        Some(s) => format!("did you mean `{s}`? {scope}: {valid_keys}"),
        None => format!("{scope}: {valid_keys}"),
    }
}

/// `telegram.bot_token` can come from the file or `FEEDBOT_TELEGRAM_BOT_TOKEN`.
fn missing_key_help(key: &str) -> String {
    let (section, field) = key.split_once('.').unwrap_or(("", key));
    let env = format!("{ENV_PREFIX}{}", key.replace('.', "_").to_uppercase());
    if section.is_empty() {
        format!("set `{field}` in feedbot.toml or export {env}")
    } else {
        format!("set `{field}` under [{section}] in feedbot.toml or export {env}")
    }
}

/// TOML files that fed the Figment, as `(path, content)` pairs.
struct SourceMap<'a> {
    files: &'a [(String, String)],
}

impl SourceMap<'_> {
    /// Locates `key` inside `section` of the file the error came from.
    fn locate(
        &self,
        error: &figment::Error,
        section: Option<&str>,
        key: &str,
    ) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
        let origin = error
            .metadata
            .as_ref()
            .and_then(|m| m.source.as_ref())
            .and_then(|s| match s {
                figment::Source::File(path) => Some(path.display().to_string()),
                _ => None,
            });
        let Some(origin) = origin else {
            return (None, None);
        };

        self.files
            .iter()
            .find(|(path, _)| *path == origin)
            .and_then(|(path, content)| {
                let offset = find_key_offset(content, section, key)?;
                Some((
                    Some(SourceSpan::new(offset.into(), key.len())),
                    Some(NamedSource::new(path, content.clone())),
                ))
            })
            .unwrap_or((None, None))
    }
}

/// Converts every error carried by a `figment::Error` into a [`ConfigError`].
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    let sources = SourceMap {
        files: toml_sources,
    };

    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(field, expected) => {
                let section = error.path.first().cloned();
                let (span, src) = sources.locate(&error, section.as_deref(), field);
                ConfigError::UnknownKey {
                    suggestion: suggest_key(field, expected),
                    valid_keys: expected.join(", "),
                    section,
                    key: field.clone(),
                    span,
                    src,
                }
            }
            Kind::MissingField(field) => {
                let mut path = error.path.clone();
                path.push(field.to_string());
                ConfigError::MissingKey {
                    key: path.join("."),
                }
            }
            Kind::InvalidType(actual, expected) => {
                let (section, field) = match error.path.split_last() {
                    Some((field, [section, ..])) => (Some(section.as_str()), field.as_str()),
                    Some((field, [])) => (None, field.as_str()),
                    None => (None, ""),
                };
                let (span, src) = sources.locate(&error, section, field);
                ConfigError::InvalidType {
                    key: error.path.join("."),
                    detail: format!("found {actual}"),
                    expected: expected.to_string(),
                    span,
                    src,
                }
            }
            _ => ConfigError::Other(error.to_string()),
        })
        .collect()
}

/// Byte offset of `key` as an assignment inside `[section]` (or before the
/// first header when `section` is `None`). Later sections are not searched.
pub fn find_key_offset(content: &str, section: Option<&str>, key: &str) -> Option<usize> {
    let mut current: Option<&str> = None;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        let trimmed = line.trim_start();

        if let Some(header) = trimmed.strip_prefix('[') {
            current = header.split(']').next().map(str::trim);
            continue;
        }
        if current != section {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix(key)
            && rest.trim_start().starts_with('=')
        {
            return Some(start + (line.len() - trimmed.len()));
        }
    }

    None
}

/// Closest accepted key to `unknown`, if any is similar enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Prints each error to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    eprintln!(
        "feedbot: {} configuration error{}",
        errors.len(),
        if errors.len() == 1 { "" } else { "s" }
    );
    for error in errors {
        let mut buf = String::new();
        if handler.render_report(&mut buf, error).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED_KEYS: &[&str] = &[
        "error_threshold",
        "default_interval_minutes",
        "max_tags",
        "notify_by_default",
        "telegraph_by_default",
        "max_import_entries",
    ];

    #[test]
    fn suggests_feed_keys_for_typos() {
        assert_eq!(
            suggest_key("eror_threshold", FEED_KEYS),
            Some("error_threshold".to_string())
        );
        assert_eq!(suggest_key("max_tag", FEED_KEYS), Some("max_tags".to_string()));
    }

    #[test]
    fn no_suggestion_for_unrelated_key() {
        assert_eq!(suggest_key("zzzzzz", FEED_KEYS), None);
    }

    #[test]
    fn key_offset_is_scoped_to_its_section() {
        let content = "[bot]\nname = \"x\"\n\n[feed]\n  max_tag = 2\n";
        let o = find_key_offset(content, Some("feed"), "max_tag").unwrap();
        assert_eq!(&content[o..o + 7], "max_tag");

        assert_eq!(find_key_offset(content, Some("feed"), "name"), None);
        assert_eq!(find_key_offset(content, Some("storage"), "max_tag"), None);
    }

    #[test]
    fn key_offset_requires_an_assignment() {
        let content = "[feed]\nmax_tags_extra = 1\nmax_tags = 2\n";
        let o = find_key_offset(content, Some("feed"), "max_tags").unwrap();
        assert_eq!(&content[o..o + 12], "max_tags = 2");
    }

    #[test]
    fn missing_key_help_names_env_var() {
        let help = missing_key_help("telegram.bot_token");
        assert!(help.contains("[telegram]"));
        assert!(help.contains("FEEDBOT_TELEGRAM_BOT_TOKEN"));
    }
}
