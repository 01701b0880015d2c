//! Error types for the similarity engine.

use rulematch_core::CoreError;

/// Errors surfaced by the engine. Scoring itself never fails; only corpus
/// retrieval and policy loading do.
#[derive(Debug, thiserror::Error)]
pub enum SimilarityError {
    /// The rule store could not be enumerated. Distinct from "no matches".
    #[error("rule retrieval failed: {0}")]
    Retrieval(#[source] CoreError),

    /// Scoring policy failed validation or could not be parsed.
    #[error("invalid similarity config: {0}")]
    InvalidConfig(String),

    /// Policy file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, SimilarityError>;
