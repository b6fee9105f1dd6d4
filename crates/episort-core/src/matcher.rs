//! Keyword matching of filenames against rules.

use crate::rules::Rule;

/// Return the first rule whose every keyword appears in the filename.
///
/// The filename is lowercased once; keywords are stored lowercased at
/// load time, so matching is case-insensitive substring containment.
/// A rule with no keywords matches any filename, and rule order decides
/// ties: the first matching rule wins. No match is not an error.
pub fn find_match<'a>(filename: &str, rules: &'a [Rule]) -> Option<&'a Rule> {
    let lowered = filename.to_lowercase();
    rules.iter().find(|rule| {
        rule.match_keywords
            .iter()
            .all(|keyword| lowered.contains(keyword.as_str()))
    })
}
