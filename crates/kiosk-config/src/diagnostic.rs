// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! Figment errors are turned into miette reports. Unknown keys get a
//! Jaro-Winkler "did you mean" and, when the offending file is known, a label
//! pointing at the key inside its `[table]`, nested tables such as
//! `[cart.expiration_timeout]` included.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use std::path::Path;

use figment::error::Kind;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity score to suggest a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error with rich diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// An unknown key was found in the configuration.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(kiosk::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A configuration value has the wrong type.
    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(kiosk::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    /// A value parsed but is not one of the accepted variants (e.g. a time unit).
    #[error("invalid value for key `{key}`: {detail}")]
    #[diagnostic(code(kiosk::config::invalid_value))]
    InvalidValue { key: String, detail: String },

    /// A required configuration key is missing.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(kiosk::config::missing_key),
        help("add `{key} = <value>` to your kiosk.toml")
    )]
    MissingKey { key: String },

    /// A validation error for a config value.
    #[error("validation error: {message}")]
    #[diagnostic(code(kiosk::config::validation))]
    Validation { message: String },

    /// A persisted global-config override could not be applied.
    #[error("invalid override `{key}`: {detail}")]
    #[diagnostic(
        code(kiosk::config::bad_override),
        help("remove it with `kiosk config unset {key}` or correct its value")
    )]
    Override { key: String, detail: String },

    /// Catch-all for other configuration errors.
    #[error("configuration error: {0}")]
    #[diagnostic(code(kiosk::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// A TOML document that took part in loading, kept for error labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TomlSource {
    /// Display name; for files, the path figment reports in its metadata.
    pub name: String,
    pub content: String,
}

impl TomlSource {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Read a config file, or `None` when it does not exist or is unreadable.
    pub fn read(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        Some(Self::new(path.display().to_string(), content))
    }
}

/// Convert a `figment::Error` (which may carry several errors) into
/// diagnostics, one per underlying error.
pub fn figment_to_config_errors(err: figment::Error, sources: &[TomlSource]) -> Vec<ConfigError> {
    err.into_iter().map(|e| convert(&e, sources)).collect()
}

fn convert(error: &figment::Error, sources: &[TomlSource]) -> ConfigError {
    let table: Vec<String> = error.path.iter().map(ToString::to_string).collect();
    let key = table.join(".");

    match &error.kind {
        Kind::UnknownField(field, expected) => {
            let label = source_for(error, sources).and_then(|source| {
                locate_key(&source.content, &table, field).map(|offset| {
                    (
                        SourceSpan::new(offset.into(), field.len()),
                        NamedSource::new(&source.name, source.content.clone()),
                    )
                })
            });
            let (span, src) = label.unzip();
            ConfigError::UnknownKey {
                key: qualified(&table, field),
                suggestion: suggest_key(field, expected),
                valid_keys: expected.join(", "),
                span,
                src,
            }
        }
        Kind::MissingField(field) => ConfigError::MissingKey {
            key: qualified(&table, field),
        },
        Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
            key,
            detail: format!("found {actual}, expected {expected}"),
            expected: expected.clone(),
        },
        Kind::UnknownVariant(found, expected) => ConfigError::InvalidValue {
            key,
            detail: format!("`{found}` is not one of {}", expected.join(", ")),
        },
        _ => ConfigError::Other(error.to_string()),
    }
}

fn qualified(table: &[String], field: &str) -> String {
    if table.is_empty() {
        field.to_string()
    } else {
        format!("{}.{field}", table.join("."))
    }
}

/// The loaded document the error came from, matched on figment's file path
/// or, for string providers, on the single inline source.
fn source_for<'a>(error: &figment::Error, sources: &'a [TomlSource]) -> Option<&'a TomlSource> {
    let origin = error.metadata.as_ref().and_then(|m| m.source.as_ref());
    match origin {
        Some(figment::Source::File(path)) => {
            let name = path.display().to_string();
            sources.iter().find(|s| s.name == name)
        }
        _ => match sources {
            [only] => Some(only),
            _ => None,
        },
    }
}

/// Byte offset of `field` declared directly inside the `[table]` whose
/// dotted header equals `table` (the root table when `table` is empty).
pub fn locate_key(content: &str, table: &[String], field: &str) -> Option<usize> {
    let mut current: Vec<&str> = Vec::new();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        let trimmed = line.trim_start();

        if let Some(header) = trimmed
            .trim_end()
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
        {
            current = header.split('.').map(str::trim).collect();
            continue;
        }

        if current.len() != table.len() || current.iter().zip(table).any(|(a, b)| *a != b) {
            continue;
        }
        let Some(rest) = trimmed.strip_prefix(field) else {
            continue;
        };
        if rest.trim_start().starts_with('=') {
            return Some(start + (line.len() - trimmed.len()));
        }
    }
    None
}

/// Closest valid key by Jaro-Winkler similarity, if any is close enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Render a list of `ConfigError`s to stderr using miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        match handler.render_report(&mut buf, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{buf}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}
