//! Destination filename rendering and episode numbering.

use std::fs;
use std::path::Path;

use crate::error::FormatError;
use crate::rules::Rule;

/// Compute the renamed destination filename for a matched file.
///
/// Renders `rule.rename_format` with `season` and `episode` bound, then
/// re-appends the original extension verbatim (case included).
pub fn next_name(
    original_filename: &str,
    rule: &Rule,
    season: u32,
    episode: u32,
) -> Result<String, FormatError> {
    let (_, extension) = split_extension(original_filename);
    let rendered = render_format(&rule.rename_format, season, episode)?;
    Ok(format!("{rendered}{extension}"))
}

/// Validate a rename format without using its output.
///
/// Used at rule load time so malformed templates surface as a dropped
/// rule instead of a per-file failure at dispatch time.
pub fn validate_format(format: &str) -> Result<(), FormatError> {
    render_format(format, 1, 1).map(|_| ())
}

/// Next sequential episode number for a destination directory.
///
/// Derived, never stored: the count of existing regular files plus one.
pub fn next_episode_number(destination: &Path) -> std::io::Result<u32> {
    let mut count = 0u32;
    for entry in fs::read_dir(destination)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            count += 1;
        }
    }
    Ok(count + 1)
}

/// Split a filename into stem and extension, keeping the dot with the
/// extension. Dotfiles and extensionless names have an empty extension.
fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(i) if i > 0 => filename.split_at(i),
        _ => (filename, ""),
    }
}

/// Render a template containing `{season}` / `{episode}` placeholders.
///
/// Supports the subset of format specs the rules files use: a bare
/// placeholder, `:d`, and `:0Nd` zero-padding. `{{` and `}}` escape
/// literal braces; an unpaired brace or unknown field is an error, not
/// silently kept.
fn render_format(format: &str, season: u32, episode: u32) -> Result<String, FormatError> {
    let mut out = String::with_capacity(format.len());
    let mut chars = format.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        match c {
            '{' => {
                if matches!(chars.peek(), Some((_, '{'))) {
                    chars.next();
                    out.push('{');
                    continue;
                }
                let rest = &format[start + 1..];
                let Some(end) = rest.find('}') else {
                    return Err(FormatError::UnclosedBrace);
                };
                let placeholder = &rest[..end];
                // Advance past the placeholder body and closing brace.
                for _ in 0..=end {
                    chars.next();
                }

                let (name, spec) = match placeholder.split_once(':') {
                    Some((name, spec)) => (name, spec),
                    None => (placeholder, ""),
                };
                let value = match name {
                    "season" => season,
                    "episode" => episode,
                    _ => {
                        return Err(FormatError::UnknownField {
                            name: name.to_string(),
                        })
                    }
                };
                out.push_str(&render_value(value, spec)?);
            }
            '}' => {
                if !matches!(chars.peek(), Some((_, '}'))) {
                    return Err(FormatError::UnmatchedBrace);
                }
                chars.next();
                out.push('}');
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

/// Render an integer under a format spec (``, `d`, or `0Nd`).
fn render_value(value: u32, spec: &str) -> Result<String, FormatError> {
    if spec.is_empty() || spec == "d" {
        return Ok(value.to_string());
    }

    let padding = spec
        .strip_prefix('0')
        .and_then(|s| s.strip_suffix('d'))
        .and_then(|digits| digits.parse::<usize>().ok());
    match padding {
        Some(width) => Ok(format!("{value:0width$}")),
        None => Err(FormatError::BadSpec {
            spec: spec.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn rule_with_format(format: &str) -> Rule {
        Rule {
            source: PathBuf::from("/downloads"),
            match_keywords: vec![],
            destination: PathBuf::from("/dest"),
            rename_format: format.to_string(),
            season: 1,
        }
    }

    #[test]
    fn test_naming_round_trip() {
        let rule = rule_with_format("Arcane - S{season:02d}E{episode:02d}");
        let name = next_name("arcane.s2e05.mkv", &rule, 2, 5).unwrap();
        assert_eq!(name, "Arcane - S02E05.mkv");
    }

    #[test]
    fn test_extension_preserved_verbatim() {
        let rule = rule_with_format("Show E{episode}");
        let name = next_name("show.01.MKV", &rule, 1, 1).unwrap();
        assert_eq!(name, "Show E1.MKV");
    }

    #[test]
    fn test_no_extension() {
        let rule = rule_with_format("Show E{episode:03d}");
        let name = next_name("show-raw", &rule, 1, 12).unwrap();
        assert_eq!(name, "Show E012");
    }

    #[test]
    fn test_dotfile_keeps_whole_name_as_stem() {
        let (stem, ext) = split_extension(".hidden");
        assert_eq!(stem, ".hidden");
        assert_eq!(ext, "");
    }

    #[test]
    fn test_unknown_field_is_error() {
        let rule = rule_with_format("Show - {title}");
        let err = next_name("show.mkv", &rule, 1, 1).unwrap_err();
        assert_eq!(
            err,
            FormatError::UnknownField {
                name: "title".to_string()
            }
        );
    }

    #[test]
    fn test_unclosed_brace_is_error() {
        assert_eq!(
            validate_format("Show - {episode"),
            Err(FormatError::UnclosedBrace)
        );
    }

    #[test]
    fn test_lone_closing_brace_is_error() {
        assert_eq!(
            validate_format("Show }E{episode}"),
            Err(FormatError::UnmatchedBrace)
        );
        assert_eq!(
            validate_format("Show - E{episode}}"),
            Err(FormatError::UnmatchedBrace)
        );
    }

    #[test]
    fn test_bad_spec_is_error() {
        assert!(matches!(
            validate_format("{episode:>5}"),
            Err(FormatError::BadSpec { .. })
        ));
    }

    #[test]
    fn test_escaped_braces() {
        let rendered = render_format("{{literal}} E{episode}", 1, 7).unwrap();
        assert_eq!(rendered, "{literal} E7");
    }

    #[test]
    fn test_next_episode_number_counts_files_only() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("e1.mkv"), "a").unwrap();
        std::fs::write(temp.path().join("e2.mkv"), "b").unwrap();
        std::fs::create_dir(temp.path().join("extras")).unwrap();

        assert_eq!(next_episode_number(temp.path()).unwrap(), 3);
    }

    #[test]
    fn test_next_episode_number_empty_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        assert_eq!(next_episode_number(temp.path()).unwrap(), 1);
    }
}
