//! Integration tests for rule loading, matching, and naming.

use std::fs;

use tempfile::TempDir;

use episort_core::{find_match, next_name, write_example_rules, ConfigError, RuleSet};

#[test]
fn load_groups_rules_by_source_in_order() {
    let temp = TempDir::new().unwrap();
    let downloads = temp.path().join("downloads");
    let animated = temp.path().join("downloads/Animated");
    fs::create_dir_all(&animated).unwrap();

    let rules_path = temp.path().join("rules.json");
    let json = format!(
        r#"{{
            "rules": [
                {{
                    "source": {downloads:?},
                    "match_keywords": ["Succession"],
                    "destination": "/media/TV/Succession",
                    "rename_format": "Succession - S{{season:02d}}E{{episode:02d}}"
                }},
                {{
                    "source": {animated:?},
                    "match_keywords": ["arcane", "s2"],
                    "destination": "/media/TV/Arcane",
                    "rename_format": "Arcane - S{{season:02d}}E{{episode:02d}}",
                    "season": 2
                }},
                {{
                    "source": {downloads:?},
                    "match_keywords": [],
                    "destination": "/media/misc",
                    "rename_format": "Misc E{{episode}}"
                }}
            ]
        }}"#,
        downloads = downloads.display().to_string(),
        animated = animated.display().to_string(),
    );
    fs::write(&rules_path, json).unwrap();

    let (set, warnings) = RuleSet::load(&rules_path).unwrap();
    assert!(warnings.is_empty());
    assert_eq!(set.len(), 3);
    assert_eq!(set.sources().count(), 2);

    let downloads = fs::canonicalize(&downloads).unwrap();
    let group = set.rules_for(&downloads);
    assert_eq!(group.len(), 2);
    // Keywords were lowercased at load.
    assert_eq!(group[0].match_keywords, vec!["succession"]);
    // Season default applied.
    assert_eq!(group[0].season, 1);

    // Matching against the group follows declaration order.
    let matched = find_match("Succession.S01E01.mkv", group).unwrap();
    let name = next_name("Succession.S01E01.mkv", matched, matched.season, 3).unwrap();
    assert_eq!(name, "Succession - S01E03.mkv");
}

#[test]
fn missing_file_is_not_found() {
    let temp = TempDir::new().unwrap();
    let err = RuleSet::load(&temp.path().join("rules.json")).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }));
}

#[test]
fn invalid_json_is_parse_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("rules.json");
    fs::write(&path, "{not json").unwrap();

    let err = RuleSet::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn empty_rules_list_is_fatal() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("rules.json");
    fs::write(&path, r#"{"rules": []}"#).unwrap();

    let err = RuleSet::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Empty { .. }));
}

#[test]
fn all_rules_invalid_is_fatal_with_drop_count() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("rules.json");
    fs::write(
        &path,
        r#"{
            "rules": [
                {
                    "source": "/does/not/exist",
                    "match_keywords": ["x"],
                    "destination": "/dest",
                    "rename_format": "E{episode}"
                }
            ]
        }"#,
    )
    .unwrap();

    let err = RuleSet::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::NoValidRules { dropped: 1 }));
}

#[test]
fn example_rules_file_round_trips_through_serde() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("rules.json");
    write_example_rules(&path).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    let rules = value["rules"].as_array().unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[1]["match_keywords"][1], "s2");
    assert_eq!(rules[1]["season"], 2);
}
