//! Error types for rule loading and name rendering.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading the rules file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The rules file does not exist.
    #[error("Rules file not found: {path}")]
    NotFound { path: PathBuf },

    /// The rules file could not be read.
    #[error("Failed to read rules file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The rules file is not valid JSON.
    #[error("Invalid JSON in rules file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The rules file contains no rules at all.
    #[error("No rules defined in {path}")]
    Empty { path: PathBuf },

    /// Every rule was dropped during validation.
    #[error("No valid rules remain after validation ({dropped} dropped)")]
    NoValidRules { dropped: usize },
}

impl ConfigError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Errors produced when rendering a `rename_format` template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The template references a field other than `season`/`episode`.
    #[error("Unknown placeholder {{{name}}} in rename format")]
    UnknownField { name: String },

    /// A `{` was opened but never closed.
    #[error("Unclosed '{{' in rename format")]
    UnclosedBrace,

    /// A `}` appeared without a matching `{`.
    #[error("Single '}}' encountered in rename format")]
    UnmatchedBrace,

    /// The format spec after `:` is not plain or `0Nd` zero-padding.
    #[error("Unsupported format spec '{spec}' (only zero-padded integers like ':02d' are supported)")]
    BadSpec { spec: String },
}

/// Kind of rule validation warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// `source` is missing, empty, or not an existing directory.
    InvalidSource,
    /// `destination` is missing or empty.
    InvalidDestination,
    /// `rename_format` failed validation.
    BadRenameFormat,
}

/// Non-fatal diagnostic for a rule dropped during load.
///
/// Dropped rules never match anything; the remaining rules keep working.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleWarning {
    /// Zero-based index of the rule in the rules file.
    pub index: usize,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl RuleWarning {
    /// Create a new rule warning.
    pub fn new(index: usize, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            index,
            message: message.into(),
            kind,
        }
    }

    /// Create an invalid source warning.
    pub fn invalid_source(index: usize, source: &std::path::Path) -> Self {
        Self::new(
            index,
            format!(
                "Source folder does not exist or is invalid: {}",
                source.display()
            ),
            WarningKind::InvalidSource,
        )
    }

    /// Create an invalid destination warning.
    pub fn invalid_destination(index: usize) -> Self {
        Self::new(
            index,
            "Missing 'destination' in rule".to_string(),
            WarningKind::InvalidDestination,
        )
    }

    /// Create a bad rename format warning.
    pub fn bad_rename_format(index: usize, error: &FormatError) -> Self {
        Self::new(
            index,
            format!("Invalid rename format: {error}"),
            WarningKind::BadRenameFormat,
        )
    }
}

impl std::fmt::Display for RuleWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rule #{}: {}", self.index, self.message)
    }
}
