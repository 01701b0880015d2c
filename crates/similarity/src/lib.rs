//! Detection-rule similarity engine.
//!
//! This crate provides:
//! - Field and value normalization for Sigma-style matcher keys and values
//! - Component extraction over a rule's detection tree
//! - Jaccard field similarity and gated fuzzy value similarity
//! - Weighted ranking of a rule corpus against a query rule

pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod scoring;
pub mod sequence;

pub use config::{ScoringPolicy, SimilarityConfig};
pub use engine::{MatchCandidate, RankingReport, RankingSummary, SimilarityEngine, ValueMatch};
pub use error::{Result, SimilarityError};
pub use extract::Extraction;
pub use normalize::{FieldPattern, Normalizer};
pub use scoring::{calculate_field_similarity, is_meaningful_match, Scorer};
pub use sequence::sequence_ratio;
