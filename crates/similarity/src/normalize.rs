//! Field-name and value normalization.
//!
//! Both cleaners are pure: lowercase, strip decoration that carries no
//! detection meaning (file extensions, path separators, Sigma block names,
//! modifiers, wildcards), and never turn a non-empty input into nothing
//! unless a field is explicitly discarded.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::SimilarityConfig;

/// Trailing block numbering such as `selection1` or `filter_2`.
static NUMERIC_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_?\d+$").expect("valid numeric suffix regex"));

/// Wildcard and regex metacharacters stripped from field names.
const FIELD_METACHARS: &[char] = &['*', '?', '[', ']', '{', '}', '(', ')', '^', '$', '|', '\\'];

/// Path separators and quotes stripped from values.
const VALUE_NOISE: &[char] = &['\\', '/', '\'', '"'];

/// A structural keyword pattern applied to field names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPattern {
    /// Strip this prefix and stop.
    Prefix(String),
    /// Strip this suffix and stop.
    Suffix(String),
    /// The whole field is structural; discard it.
    Exact(String),
}

impl FieldPattern {
    /// Classify a raw pattern: `foo_` is a prefix, `_foo` a suffix,
    /// anything else an exact match.
    pub fn classify(pattern: &str) -> Self {
        let pattern = pattern.to_lowercase();
        if pattern.ends_with('_') {
            FieldPattern::Prefix(pattern)
        } else if pattern.starts_with('_') {
            FieldPattern::Suffix(pattern)
        } else {
            FieldPattern::Exact(pattern)
        }
    }
}

/// Field and value cleaner built from a [`SimilarityConfig`].
#[derive(Debug, Clone)]
pub struct Normalizer {
    extensions: Vec<String>,
    patterns: Vec<FieldPattern>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(&SimilarityConfig::default())
    }
}

impl Normalizer {
    pub fn new(config: &SimilarityConfig) -> Self {
        Self {
            extensions: config.file_extensions.iter().map(|e| e.to_lowercase()).collect(),
            patterns: config
                .field_patterns
                .iter()
                .map(|p| FieldPattern::classify(p))
                .collect(),
        }
    }

    pub fn patterns(&self) -> &[FieldPattern] {
        &self.patterns
    }

    /// Normalize a matcher value into a value token.
    ///
    /// Strips at most one known file extension, then path separators and
    /// quotes, and collapses whitespace. Falls back to the lowercased,
    /// trimmed input if cleaning leaves nothing.
    pub fn clean_value(&self, raw: &str) -> String {
        let lowered = raw.to_lowercase().trim().to_string();

        let mut stem = lowered.as_str();
        if let Some(ext) = self.extensions.iter().find(|ext| stem.ends_with(ext.as_str())) {
            stem = &stem[..stem.len() - ext.len()];
        }

        let stripped: String = stem.chars().filter(|c| !VALUE_NOISE.contains(c)).collect();
        let cleaned = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

        if cleaned.is_empty() {
            lowered
        } else {
            cleaned
        }
    }

    /// Normalize a matcher key into a field token.
    ///
    /// Returns an empty string when the key is a purely structural block
    /// name (e.g. `selection`, `filter_2`), meaning "discard". Otherwise an
    /// empty cleaning result falls back to the raw key.
    pub fn clean_field(&self, raw: &str) -> String {
        let lowered = raw.to_lowercase();
        let mut field = NUMERIC_SUFFIX.replace(lowered.trim(), "").into_owned();

        for pattern in &self.patterns {
            match pattern {
                FieldPattern::Prefix(prefix) => {
                    if let Some(rest) = field.strip_prefix(prefix.as_str()) {
                        field = rest.to_string();
                        break;
                    }
                }
                FieldPattern::Suffix(suffix) => {
                    if let Some(rest) = field.strip_suffix(suffix.as_str()) {
                        field = rest.to_string();
                        break;
                    }
                }
                FieldPattern::Exact(exact) => {
                    if field == *exact {
                        return String::new();
                    }
                }
            }
        }

        // Modifiers: `image|endswith` -> `image`
        if let Some(idx) = field.find('|') {
            field.truncate(idx);
        }
        field.retain(|c| !FIELD_METACHARS.contains(&c));

        let collapsed = collapse_underscores(&field);
        let cleaned = collapsed.trim_matches('_');

        if cleaned.is_empty() {
            raw.to_string()
        } else {
            cleaned.to_string()
        }
    }
}

fn collapse_underscores(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_underscore = false;
    for c in s.chars() {
        if c == '_' {
            if !prev_underscore {
                out.push(c);
            }
            prev_underscore = true;
        } else {
            out.push(c);
            prev_underscore = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n() -> Normalizer {
        Normalizer::default()
    }

    #[test]
    fn value_extension_stripped() {
        assert_eq!(n().clean_value("cmd.exe"), "cmd");
        assert_eq!(n().clean_value("  PowerShell.EXE "), "powershell");
        assert_eq!(n().clean_value("payload.ps1"), "payload");
    }

    #[test]
    fn value_path_separators_removed() {
        assert_eq!(n().clean_value("C:\\Users\\test.EXE"), "c:userstest");
        assert_eq!(n().clean_value("/usr/bin/curl"), "usrbincurl");
        assert_eq!(n().clean_value("'quoted'  \"text\""), "quoted text");
    }

    #[test]
    fn value_only_one_extension_stripped() {
        assert_eq!(n().clean_value("backup.tar.gz"), "backup.tar");
        assert_eq!(n().clean_value("report.docx"), "report");
    }

    #[test]
    fn value_whitespace_collapsed() {
        assert_eq!(n().clean_value("net   user\t/add"), "net user add");
    }

    #[test]
    fn value_never_cleaned_to_nothing() {
        assert_eq!(n().clean_value("\\\\"), "\\\\");
        assert_eq!(n().clean_value(".EXE"), ".exe");
        assert_eq!(n().clean_value("\"\""), "\"\"");
    }

    #[test]
    fn field_numbered_block_is_discarded() {
        assert_eq!(n().clean_field("selection1"), "");
        assert_eq!(n().clean_field("filter_2"), "");
        assert_eq!(n().clean_field("condition"), "");
        assert_eq!(n().clean_field("Keywords"), "");
    }

    #[test]
    fn field_modifier_removed() {
        assert_eq!(n().clean_field("Image|endswith"), "image");
        assert_eq!(n().clean_field("CommandLine|contains|all"), "commandline");
    }

    #[test]
    fn field_prefix_and_suffix_patterns() {
        assert_eq!(n().clean_field("selection_img"), "img");
        assert_eq!(n().clean_field("filter_main_generic"), "main_generic");
        assert_eq!(n().clean_field("parent_selection"), "parent");
        assert_eq!(n().clean_field("sel_parent"), "parent");
    }

    #[test]
    fn field_first_matching_pattern_wins() {
        // `selection_` strips first; `_filter` is never consulted.
        assert_eq!(n().clean_field("selection_x_filter"), "x_filter");
    }

    #[test]
    fn field_metachars_and_underscores() {
        assert_eq!(n().clean_field("Target*Object"), "targetobject");
        assert_eq!(n().clean_field("__a___b__"), "a_b");
    }

    #[test]
    fn field_falls_back_to_raw_when_emptied() {
        assert_eq!(n().clean_field("*"), "*");
        assert_eq!(n().clean_field("__"), "__");
        assert_eq!(n().clean_field("42"), "42");
    }

    #[test]
    fn pattern_classification() {
        assert_eq!(FieldPattern::classify("sel_"), FieldPattern::Prefix("sel_".into()));
        assert_eq!(FieldPattern::classify("_rule"), FieldPattern::Suffix("_rule".into()));
        assert_eq!(FieldPattern::classify("keywords"), FieldPattern::Exact("keywords".into()));
    }
}
