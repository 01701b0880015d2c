use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Rule path not found: {}", .0.display())]
    RuleNotFound(PathBuf),

    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Store error: {0}")]
    Store(String),
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
