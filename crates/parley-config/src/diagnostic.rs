// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge with "did you mean" suggestions.

#![allow(unused_assignments)] // miette's Diagnostic derive triggers this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity for a key suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error with enough context for miette to render it.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key that no config struct declares.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(parley::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not a recognized key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value of the wrong type.
    #[error("invalid type for `{key}`: {detail}")]
    #[diagnostic(code(parley::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    /// A required key is absent.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(parley::config::missing_key),
        help("add `{key} = <value>` to parley.toml")
    )]
    MissingKey { key: String },

    /// A value that parsed but is semantically invalid.
    #[error("validation error: {message}")]
    #[diagnostic(code(parley::config::validation))]
    Validation { message: String },

    /// Anything else figment reports.
    #[error("configuration error: {0}")]
    #[diagnostic(code(parley::config::other))]
    Other(String),
}

impl ConfigError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        ConfigError::Validation {
            message: message.into(),
        }
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Converts every error inside a `figment::Error` into a [`ConfigError`].
///
/// `toml_sources` holds `(path, content)` pairs used to attach source spans
/// to unknown-key errors.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(field, expected) => {
                let suggestion = suggest_key(field, expected);
                let (span, src) = locate_key(&error, field, toml_sources);
                ConfigError::UnknownKey {
                    key: field.clone(),
                    suggestion,
                    valid_keys: expected.join(", "),
                    span,
                    src,
                }
            }
            Kind::MissingField(field) => ConfigError::MissingKey {
                key: field.to_string(),
            },
            Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                key: error.path.join("."),
                detail: format!("found {actual}, expected {expected}"),
                expected: expected.clone(),
            },
            _ => ConfigError::Other(error.to_string()),
        })
        .collect()
}

fn locate_key(
    error: &figment::error::Error,
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    let found = toml_sources.iter().find(|(path, _)| match origin {
        Some(ref o) => o == path,
        // Inline strings carry no file metadata.
        None => toml_sources.len() == 1,
    });

    match found {
        Some((path, content)) => match find_key_offset(content, &error.path, field) {
            Some(offset) => (
                Some(SourceSpan::new(offset.into(), field.len())),
                Some(NamedSource::new(path, content.clone())),
            ),
            None => (None, None),
        },
        None => (None, None),
    }
}

/// Byte offset of `field` inside the `[section]` named by `path[0]`.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let start = match path.first() {
        Some(section) => {
            let header = format!("[{section}]");
            content.find(&header)? + header.len()
        }
        None => 0,
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') && offset != start {
            // Next section reached.
            return None;
        }
        if let Some(after) = trimmed.strip_prefix(field) {
            let after = after.trim_start();
            if after.starts_with('=') {
                return Some(offset + (line.len() - trimmed.len()));
            }
        }
        offset += line.len();
    }
    None
}

/// Closest valid key by Jaro-Winkler similarity, if any is close enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (*key, strsim::jaro_winkler(unknown, key)))
        .filter(|(_, score)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(key, _)| key.to_string())
}

/// Renders errors to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        if handler.render_report(&mut out, error).is_ok() {
            eprint!("{out}");
        } else {
            eprintln!("error: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_close_key() {
        let valid = &["brave_api_key", "tavily_api_key", "result_count"];
        assert_eq!(
            suggest_key("brave_apikey", valid),
            Some("brave_api_key".to_string())
        );
    }

    #[test]
    fn no_suggestion_for_distant_key() {
        let valid = &["name", "log_level", "locale"];
        assert_eq!(suggest_key("zzzzzz", valid), None);
    }

    #[test]
    fn finds_key_inside_its_section() {
        let content = "[agent]\nname = \"x\"\n\n[search]\nreslt_count = 3\n";
        let path = vec!["search".to_string()];
        let offset = find_key_offset(content, &path, "reslt_count").unwrap();
        assert_eq!(&content[offset..offset + 11], "reslt_count");
    }

    #[test]
    fn key_in_other_section_is_not_matched() {
        let content = "[search]\nenabled = true\n[agent]\nname = \"x\"\n";
        let path = vec!["search".to_string()];
        assert_eq!(find_key_offset(content, &path, "name"), None);
    }
}
