use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key).as_deref() {
        Some("1") | Some("true") | Some("yes") => true,
        Some("0") | Some("false") | Some("no") => false,
        _ => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub corpus: CorpusConfig,
    pub ranking: RankingConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// With a profile (e.g. `PROD`), every key is first looked up as
    /// `{PROFILE}_{KEY}`, falling back to `{KEY}`. Empty string = default.
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            corpus: CorpusConfig::from_env_profiled(p),
            ranking: RankingConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  corpus:   rules_dir={}", self.corpus.rules_dir.display());
        tracing::info!(
            "  ranking:  top_n={}, parallel={}, policy={}",
            self.ranking.top_n,
            self.ranking.parallel,
            self.ranking
                .policy_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(built-in)".to_string())
        );
    }
}

// ── Corpus ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Directory holding the stored rule corpus.
    pub rules_dir: PathBuf,
}

impl CorpusConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            rules_dir: PathBuf::from(profiled_env_or(p, "RULES_DIR", "data/rules")),
        }
    }
}

// ── Ranking ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    pub top_n: usize,
    /// Score corpus rules on the rayon pool.
    pub parallel: bool,
    /// Optional TOML file overriding the built-in scoring policy.
    pub policy_path: Option<PathBuf>,
}

impl RankingConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            top_n: profiled_env_usize(p, "RULEMATCH_TOP_N", 10),
            parallel: profiled_env_bool(p, "RULEMATCH_PARALLEL", true),
            policy_path: profiled_env_opt(p, "RULEMATCH_POLICY").map(PathBuf::from),
        }
    }
}
