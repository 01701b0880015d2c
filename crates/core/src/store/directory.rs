//! Filesystem-backed rule store.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{CoreError, Result};
use crate::rule::StoredRule;

use super::RuleStore;

/// Rule store over a directory tree of `*.yml` / `*.yaml` files.
///
/// Each file is one rule; its file name is the rule id. Files are read on
/// every [`enumerate`](RuleStore::enumerate) call, so the snapshot always
/// reflects the directory as it is now.
#[derive(Debug, Clone)]
pub struct DirectoryRuleStore {
    /// Root directory containing rule YAML files.
    rules_dir: PathBuf,
    name: String,
}

impl DirectoryRuleStore {
    pub fn new(rules_dir: impl Into<PathBuf>) -> Self {
        let rules_dir = rules_dir.into();
        let name = format!("dir:{}", rules_dir.display());
        Self { rules_dir, name }
    }

    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    /// Recursively collect YAML file paths below `dir`.
    ///
    /// Dotfiles, dot-directories and symlinked directories are skipped.
    /// Unreadable subdirectories are logged and skipped.
    fn collect_paths(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "failed to read directory");
                return Ok(());
            }
        };

        for entry in entries {
            let entry = entry?;
            let path = entry.path();

            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with('.') {
                    debug!(path = %path.display(), "skipping dotfile");
                    continue;
                }
            }

            // Symlinked directories can form cycles; only real ones are walked.
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                Self::collect_paths(&path, paths)?;
                continue;
            }
            if file_type.is_symlink() && path.is_dir() {
                debug!(path = %path.display(), "skipping symlinked directory");
                continue;
            }

            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e == "yml" || e == "yaml")
                .unwrap_or(false);

            if is_yaml {
                paths.push(path);
            } else {
                debug!(path = %path.display(), "skipping non-YAML file");
            }
        }

        Ok(())
    }

    fn load_file(path: &Path) -> Result<StoredRule> {
        let yaml = fs::read_to_string(path)?;
        let id = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(StoredRule::from_yaml_str(id, &yaml)?.with_source(path.display().to_string()))
    }
}

impl RuleStore for DirectoryRuleStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn enumerate(&self) -> Result<Vec<StoredRule>> {
        if !self.rules_dir.is_dir() {
            return Err(CoreError::RuleNotFound(self.rules_dir.clone()));
        }

        let mut paths = Vec::new();
        Self::collect_paths(&self.rules_dir, &mut paths)?;
        paths.sort();

        let mut rules = Vec::with_capacity(paths.len());
        for path in &paths {
            match Self::load_file(path) {
                Ok(rule) => rules.push(rule),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load rule file");
                }
            }
        }

        info!(
            dir = %self.rules_dir.display(),
            files = paths.len(),
            loaded = rules.len(),
            "enumerated rule directory"
        );
        Ok(rules)
    }
}
