// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Miette diagnostics for configuration failures.
//!
//! Figment errors are flattened into `ConfigError`s; unknown keys get a
//! source span into the offending TOML file and a fuzzy-matched
//! suggestion so a typo like `prot = 9000` points straight at the fix.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity to offer a "did you mean" correction.
/// 0.75 catches `prot` -> `port` and `databse_path` -> `database_path`
/// without suggesting unrelated keys.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error with rich diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(waflow::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        /// Comma-joined valid keys for the section, for the help text.
        valid_keys: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(waflow::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(waflow::config::missing_key),
        help("add `{key} = <value>` to your waflow.toml")
    )]
    MissingKey { key: String },

    #[error("validation error: {message}")]
    #[diagnostic(code(waflow::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(waflow::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Flatten a `figment::Error` (which may carry several failures) into one
/// `ConfigError` per failure. `toml_sources` maps file paths to their
/// contents so unknown-key errors can carry a span.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(field, expected) => {
                let valid_keys: Vec<&str> = expected.to_vec();
                let suggestion = suggest_key(field, &valid_keys);
                let located = locate_key(&error, field, toml_sources);
                ConfigError::UnknownKey {
                    key: field.clone(),
                    suggestion,
                    valid_keys: valid_keys.join(", "),
                    span: located.as_ref().map(|(span, _)| *span),
                    src: located.map(|(_, src)| src),
                }
            }
            Kind::MissingField(field) => ConfigError::MissingKey {
                key: field.clone().into_owned(),
            },
            Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                key: error
                    .path
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
                    .join("."),
                detail: format!("found {actual}, expected {expected}"),
                expected: expected.to_string(),
            },
            _ => ConfigError::Other(format!("{error}")),
        })
        .collect()
}

/// Locate an unknown key inside the TOML file the error came from.
fn locate_key(
    error: &figment::error::Error,
    field: &str,
    toml_sources: &[(String, String)],
) -> Option<(SourceSpan, NamedSource<String>)> {
    let path = error.metadata.as_ref()?.source.as_ref().and_then(|s| match s {
        figment::Source::File(path) => Some(path.display().to_string()),
        _ => None,
    })?;
    let (path, content) = toml_sources.iter().find(|(p, _)| *p == path)?;

    let section: Vec<String> = error.path.iter().map(|s| s.to_string()).collect();
    let offset = find_key_offset(content, &section, field)?;
    Some((
        SourceSpan::new(offset.into(), field.len()),
        NamedSource::new(path, content.clone()),
    ))
}

/// Byte offset of `field` in `content`, scoped to the `[section]` named by
/// `path` (or the whole document for top-level keys).
fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let search_start = if path.is_empty() {
        0
    } else {
        let header = format!("[{}]", path[0]);
        content.find(&header).map(|pos| pos + header.len())?
    };

    let mut byte_offset = search_start;
    for line in content[search_start..].lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix(field) {
            if rest.starts_with(' ') || rest.starts_with('=') || rest.starts_with('\t') {
                return Some(byte_offset + (line.len() - trimmed.len()));
            }
        }
        byte_offset += line.len() + 1;
    }
    None
}

/// Best fuzzy match for an unknown key, or `None` when nothing is close.
fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|&key| (strsim::jaro_winkler(unknown, key), key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, key)| key.to_string())
}

/// Render errors to stderr through miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        let diagnostic: &dyn Diagnostic = error;
        if handler.render_report(&mut buf, diagnostic).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggest_prot_for_port() {
        let valid = &["host", "port", "rate_limit_per_minute"];
        assert_eq!(suggest_key("prot", valid), Some("port".to_string()));
    }

    #[test]
    fn suggest_databse_path_for_database_path() {
        let valid = &["database_path", "wal_mode"];
        assert_eq!(
            suggest_key("databse_path", valid),
            Some("database_path".to_string())
        );
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        let valid = &["host", "port", "rate_limit_per_minute"];
        assert_eq!(suggest_key("zzzzzz", valid), None);
    }

    #[test]
    fn find_key_offset_in_section() {
        let content = "[server]\nprot = 9000\n";
        let path = vec!["server".to_string()];
        let offset = find_key_offset(content, &path, "prot").unwrap();
        assert_eq!(&content[offset..offset + 4], "prot");
    }

    #[test]
    fn find_key_offset_ignores_other_sections() {
        let content = "[service]\nname = \"waflow\"\n\n[server]\nport = 8085\n";
        let path = vec!["server".to_string()];
        let offset = find_key_offset(content, &path, "port").unwrap();
        assert!(offset > content.find("[server]").unwrap());
    }

    #[test]
    fn unknown_key_error_carries_suggestion() {
        let toml = "[server]\nprot = 9000\n";
        let err = crate::load_and_validate_str(toml).unwrap_err();
        assert!(err.iter().any(|e| matches!(
            e,
            ConfigError::UnknownKey { key, suggestion: Some(s), .. }
                if key == "prot" && s == "port"
        )));
    }
}
