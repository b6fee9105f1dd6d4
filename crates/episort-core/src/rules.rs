//! Rule model and `rules.json` loading.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, RuleWarning};
use crate::namer;

/// A single sorting rule mapping keyword-matched filenames to a
/// destination and naming scheme.
///
/// Immutable once loaded; `match_keywords` are stored lowercased so
/// matching never re-lowercases them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Directory watched for arriving files.
    pub source: PathBuf,

    /// Keywords that must all appear in the lowercased filename.
    pub match_keywords: Vec<String>,

    /// Directory the renamed copy is written to.
    pub destination: PathBuf,

    /// Template for the destination filename, with `{season}` and
    /// `{episode}` placeholders (`:02d`-style zero-padding supported).
    pub rename_format: String,

    /// Season number bound into the rename format.
    #[serde(default = "default_season")]
    pub season: u32,
}

fn default_season() -> u32 {
    1
}

/// On-disk shape of the rules file.
#[derive(Debug, Serialize, Deserialize)]
struct RulesFile {
    #[serde(default)]
    rules: Vec<Rule>,
}

/// Validated, immutable rule collection grouped by source directory.
///
/// Groups and the rules within them keep the declaration order of the
/// rules file, so first-match-wins semantics survive the grouping.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    by_source: IndexMap<PathBuf, Vec<Rule>>,
}

impl RuleSet {
    /// Load and validate rules from a JSON file.
    ///
    /// Invalid rules are dropped with a [`RuleWarning`]; an empty file
    /// or a file where every rule is invalid is a fatal [`ConfigError`].
    pub fn load(path: &Path) -> Result<(Self, Vec<RuleWarning>), ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let file: RulesFile = serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        if file.rules.is_empty() {
            return Err(ConfigError::Empty {
                path: path.to_path_buf(),
            });
        }

        let total = file.rules.len();
        let (set, warnings) = Self::from_rules(file.rules);
        if set.is_empty() {
            return Err(ConfigError::NoValidRules { dropped: total });
        }
        Ok((set, warnings))
    }

    /// Build a rule set from already-parsed rules, validating each one.
    ///
    /// A rule survives when its `source` canonicalizes to an existing
    /// directory, its `destination` is non-empty, and its
    /// `rename_format` renders. Keywords are lowercased here.
    pub fn from_rules(rules: Vec<Rule>) -> (Self, Vec<RuleWarning>) {
        let mut by_source: IndexMap<PathBuf, Vec<Rule>> = IndexMap::new();
        let mut warnings = Vec::new();

        for (index, mut rule) in rules.into_iter().enumerate() {
            if rule.source.as_os_str().is_empty() {
                warnings.push(RuleWarning::invalid_source(index, &rule.source));
                continue;
            }
            let source = match fs::canonicalize(&rule.source) {
                Ok(p) if p.is_dir() => p,
                _ => {
                    warnings.push(RuleWarning::invalid_source(index, &rule.source));
                    continue;
                }
            };

            if rule.destination.as_os_str().is_empty() {
                warnings.push(RuleWarning::invalid_destination(index));
                continue;
            }

            if let Err(e) = namer::validate_format(&rule.rename_format) {
                warnings.push(RuleWarning::bad_rename_format(index, &e));
                continue;
            }

            rule.source = source.clone();
            for keyword in &mut rule.match_keywords {
                *keyword = keyword.to_lowercase();
            }

            by_source.entry(source).or_default().push(rule);
        }

        for warning in &warnings {
            warn!("{warning}");
        }

        (Self { by_source }, warnings)
    }

    /// Iterate over `(source directory, rules)` groups in declaration order.
    pub fn groups(&self) -> impl Iterator<Item = (&Path, &[Rule])> {
        self.by_source
            .iter()
            .map(|(source, rules)| (source.as_path(), rules.as_slice()))
    }

    /// All distinct watched source directories.
    pub fn sources(&self) -> impl Iterator<Item = &Path> {
        self.by_source.keys().map(PathBuf::as_path)
    }

    /// Rules declared for a specific source directory.
    pub fn rules_for(&self, source: &Path) -> &[Rule] {
        self.by_source
            .get(source)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Total number of surviving rules across all groups.
    pub fn len(&self) -> usize {
        self.by_source.values().map(Vec::len).sum()
    }

    /// True when no rules survived validation.
    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }
}

/// Write an example rules file for first-run setup.
pub fn write_example_rules(path: &Path) -> std::io::Result<()> {
    let example = RulesFile {
        rules: vec![
            Rule {
                source: PathBuf::from("D:/downloads"),
                match_keywords: vec!["succession".to_string()],
                destination: PathBuf::from("S:/media/TV/Succession"),
                rename_format: "Succession - S{season:02d}E{episode:02d}".to_string(),
                season: 1,
            },
            Rule {
                source: PathBuf::from("D:/downloads/Animated"),
                match_keywords: vec!["arcane".to_string(), "s2".to_string()],
                destination: PathBuf::from("S:/media/TV/Arcane"),
                rename_format: "Arcane - S{season:02d}E{episode:02d}".to_string(),
                season: 2,
            },
        ],
    };

    let json = serde_json::to_string_pretty(&example).map_err(std::io::Error::other)?;
    fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rule(source: &Path, keywords: &[&str], dest: &str) -> Rule {
        Rule {
            source: source.to_path_buf(),
            match_keywords: keywords.iter().map(|k| k.to_string()).collect(),
            destination: PathBuf::from(dest),
            rename_format: "Show - S{season:02d}E{episode:02d}".to_string(),
            season: 1,
        }
    }

    #[test]
    fn test_invalid_source_dropped() {
        let temp = TempDir::new().unwrap();
        let rules = vec![
            rule(&temp.path().join("missing"), &["a"], "/dest"),
            rule(temp.path(), &["b"], "/dest"),
        ];

        let (set, warnings) = RuleSet::from_rules(rules);
        assert_eq!(set.len(), 1);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, crate::WarningKind::InvalidSource);
    }

    #[test]
    fn test_empty_destination_dropped() {
        let temp = TempDir::new().unwrap();
        let rules = vec![rule(temp.path(), &["a"], "")];

        let (set, warnings) = RuleSet::from_rules(rules);
        assert!(set.is_empty());
        assert_eq!(warnings[0].kind, crate::WarningKind::InvalidDestination);
    }

    #[test]
    fn test_bad_format_dropped() {
        let temp = TempDir::new().unwrap();
        let mut bad = rule(temp.path(), &["a"], "/dest");
        bad.rename_format = "Show - {title}".to_string();

        let (set, warnings) = RuleSet::from_rules(vec![bad]);
        assert!(set.is_empty());
        assert_eq!(warnings[0].kind, crate::WarningKind::BadRenameFormat);
    }

    #[test]
    fn test_keywords_lowercased_and_order_kept() {
        let temp = TempDir::new().unwrap();
        let rules = vec![
            rule(temp.path(), &["Arcane", "S2"], "/a"),
            rule(temp.path(), &["arcane"], "/b"),
        ];

        let (set, _) = RuleSet::from_rules(rules);
        let group = set.rules_for(&fs::canonicalize(temp.path()).unwrap());
        assert_eq!(group.len(), 2);
        assert_eq!(group[0].match_keywords, vec!["arcane", "s2"]);
        assert_eq!(group[0].destination, PathBuf::from("/a"));
    }

    #[test]
    fn test_season_default() {
        let json = r#"{
            "source": "/src",
            "match_keywords": ["x"],
            "destination": "/dest",
            "rename_format": "E{episode}"
        }"#;
        let parsed: Rule = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.season, 1);
    }
}
