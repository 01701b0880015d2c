//! Scoring policy for the similarity engine.
//!
//! Every constant the engine depends on lives here and is handed to
//! [`SimilarityEngine::new`](crate::SimilarityEngine::new) once. `Default`
//! reproduces the tuned policy; a TOML file may override any subset of keys.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimilarityError};

/// File-extension suffixes stripped from matcher values, in match order.
pub const DEFAULT_FILE_EXTENSIONS: &[&str] = &[
    // Executables
    ".exe", ".dll", ".sys", ".drv", ".ocx", ".cpl", ".scr", ".com", ".pif",
    // Scripts
    ".bat", ".cmd", ".ps1", ".psm1", ".psd1", ".vbs", ".vbe", ".js", ".jse",
    ".wsh", ".wsf", ".hta", ".py", ".pl", ".php", ".rb", ".sh",
    // Archives
    ".zip", ".rar", ".7z", ".tar", ".gz", ".bz2", ".xz", ".cab", ".msi",
    // Documents
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".rtf",
    // Logs and config
    ".txt", ".log", ".cfg", ".conf", ".ini", ".xml", ".json", ".yaml", ".yml",
    // Images
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".ico", ".svg",
    // Temp and backup
    ".tmp", ".temp", ".bak", ".old", ".orig",
];

/// Structural Sigma keywords removed from field names, tested in order.
///
/// A trailing `_` marks a prefix, a leading `_` a suffix, anything else must
/// match the whole field and discards it.
pub const DEFAULT_FIELD_PATTERNS: &[&str] = &[
    "selection", "filter", "condition", "timeframe",
    "selection_", "sel_", "select_",
    "filter_", "filt_", "exclude_",
    "keywords", "keyword_", "pattern_", "rule_",
    "detection_", "detect_", "match_", "search_",
    "_selection", "_filter", "_condition", "_rule",
];

/// Bonus, penalty and explanation constants for pairwise value scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    /// Substring bonus when the shorter string is at least
    /// `substring_ratio_high` of the longer one.
    pub substring_bonus_high: f64,
    pub substring_ratio_high: f64,
    /// Smaller bonus down to `substring_ratio_low`.
    pub substring_bonus_low: f64,
    pub substring_ratio_low: f64,
    /// Subtracted when non-substring values share a word or number token.
    pub token_penalty: f64,
    /// Candidates need more value similarity than this to get value-level
    /// explanations.
    pub explain_min_value_similarity: f64,
    /// Value pairs need more than this to be listed as an explanation.
    pub explain_min_pair_score: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            substring_bonus_high: 0.10,
            substring_ratio_high: 0.5,
            substring_bonus_low: 0.05,
            substring_ratio_low: 0.3,
            token_penalty: 0.30,
            explain_min_value_similarity: 0.4,
            explain_min_pair_score: 0.6,
        }
    }
}

/// Full engine policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    pub file_extensions: Vec<String>,
    pub field_patterns: Vec<String>,
    /// Share of value similarity in the weighted score.
    pub value_weight: f64,
    /// Share of field similarity in the weighted score.
    pub field_weight: f64,
    /// Minimum weighted similarity for a candidate to be returned.
    pub threshold: f64,
    /// Score corpus rules on the rayon pool.
    pub parallel: bool,
    pub scoring: ScoringPolicy,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            file_extensions: DEFAULT_FILE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            field_patterns: DEFAULT_FIELD_PATTERNS.iter().map(|s| s.to_string()).collect(),
            value_weight: 0.8,
            field_weight: 0.2,
            threshold: 0.5,
            parallel: true,
            scoring: ScoringPolicy::default(),
        }
    }
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(SimilarityError::InvalidConfig(format!(
            "{name} must be between 0.0 and 1.0 (got {value})"
        )));
    }
    Ok(())
}

impl SimilarityConfig {
    /// Parse a TOML policy. Omitted keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| SimilarityError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check weights, threshold and pattern lists.
    pub fn validate(&self) -> Result<()> {
        check_unit("value_weight", self.value_weight)?;
        check_unit("field_weight", self.field_weight)?;
        check_unit("threshold", self.threshold)?;
        if ((self.value_weight + self.field_weight) - 1.0).abs() > 1e-9 {
            return Err(SimilarityError::InvalidConfig(format!(
                "value_weight + field_weight must equal 1.0 (got {})",
                self.value_weight + self.field_weight
            )));
        }

        let s = &self.scoring;
        check_unit("scoring.substring_bonus_high", s.substring_bonus_high)?;
        check_unit("scoring.substring_ratio_high", s.substring_ratio_high)?;
        check_unit("scoring.substring_bonus_low", s.substring_bonus_low)?;
        check_unit("scoring.substring_ratio_low", s.substring_ratio_low)?;
        check_unit("scoring.token_penalty", s.token_penalty)?;
        check_unit("scoring.explain_min_value_similarity", s.explain_min_value_similarity)?;
        check_unit("scoring.explain_min_pair_score", s.explain_min_pair_score)?;
        if s.substring_ratio_low > s.substring_ratio_high {
            return Err(SimilarityError::InvalidConfig(
                "scoring.substring_ratio_low must not exceed substring_ratio_high".into(),
            ));
        }

        if self.file_extensions.iter().any(|e| e.is_empty()) {
            return Err(SimilarityError::InvalidConfig(
                "file_extensions must not contain empty entries".into(),
            ));
        }
        if self.field_patterns.iter().any(|p| p.trim_matches('_').is_empty()) {
            return Err(SimilarityError::InvalidConfig(
                "field_patterns must not contain empty entries".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_valid() {
        let cfg = SimilarityConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.file_extensions.len(), 64);
        assert_eq!(cfg.field_patterns.len(), 22);
        assert_eq!(cfg.file_extensions[0], ".exe");
        assert_eq!(cfg.field_patterns[0], "selection");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = SimilarityConfig::from_toml_str(
            "parallel = false\n[scoring]\ntoken_penalty = 0.25\n",
        )
        .unwrap();
        assert!(!cfg.parallel);
        assert_eq!(cfg.scoring.token_penalty, 0.25);
        assert_eq!(cfg.scoring.substring_bonus_high, 0.10);
        assert_eq!(cfg.threshold, 0.5);
        assert_eq!(cfg.file_extensions.len(), 64);
    }

    #[test]
    fn unbalanced_weights_rejected() {
        let err = SimilarityConfig::from_toml_str("value_weight = 0.9\n").unwrap_err();
        match err {
            SimilarityError::InvalidConfig(msg) => assert!(msg.contains("must equal 1.0")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn threshold_out_of_range_rejected() {
        let cfg = SimilarityConfig {
            threshold: 1.5,
            ..SimilarityConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, SimilarityError::InvalidConfig(msg) if msg.contains("threshold")));
    }

    #[test]
    fn malformed_toml_rejected() {
        assert!(matches!(
            SimilarityConfig::from_toml_str("threshold = \"high\""),
            Err(SimilarityError::InvalidConfig(_))
        ));
    }

    #[test]
    fn policy_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.toml");
        std::fs::write(&path, "threshold = 0.6\n").unwrap();
        let cfg = SimilarityConfig::from_path(&path).unwrap();
        assert_eq!(cfg.threshold, 0.6);
    }
}
