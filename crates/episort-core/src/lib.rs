//! Core types for episort.
//!
//! This crate provides the rule model loaded from `rules.json`, the
//! keyword matcher that maps filenames to rules, and the naming logic
//! that turns a matched file into its renamed destination filename.

mod error;
mod matcher;
mod namer;
mod rules;

pub use error::{ConfigError, FormatError, RuleWarning, WarningKind};
pub use matcher::find_match;
pub use namer::{next_episode_number, next_name, validate_format};
pub use rules::{write_example_rules, Rule, RuleSet};
