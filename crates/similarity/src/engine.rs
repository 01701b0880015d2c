//! Weighted ranking of a rule corpus against a query rule.

use rayon::prelude::*;
use rulematch_core::{DetectionNode, RuleStore, StoredRule};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SimilarityConfig;
use crate::error::{Result, SimilarityError};
use crate::extract::Extraction;
use crate::normalize::Normalizer;
use crate::scoring::{calculate_field_similarity, Scorer};

/// Title reported for corpus records that carry none.
pub const UNTITLED: &str = "Untitled";

/// Number of query values explained per candidate by default.
pub const DEFAULT_EXPLAIN_LIMIT: usize = 3;

/// One scored corpus rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    /// 1-based position in the enumerated corpus.
    pub index: usize,
    pub id: String,
    pub title: String,
    pub field_similarity: f64,
    pub value_similarity: f64,
    pub weighted_similarity: f64,
    /// The candidate's extracted field tokens.
    pub fields: Vec<String>,
    /// The candidate's extracted value tokens.
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// The full stored rule document, as enumerated.
    #[serde(default, skip_serializing_if = "serde_yaml::Value::is_null")]
    pub rule: serde_yaml::Value,
}

/// A query value paired with the candidate value that explains it best.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueMatch {
    pub query_value: String,
    pub matched_value: String,
    pub score: f64,
}

/// Highest, lowest and mean weighted similarity of a ranked list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingSummary {
    pub highest: f64,
    pub lowest: f64,
    pub average: f64,
}

impl RankingSummary {
    /// `None` for an empty list. Expects `matches` sorted descending.
    pub fn from_matches(matches: &[MatchCandidate]) -> Option<Self> {
        let first = matches.first()?;
        let last = matches.last()?;
        let total: f64 = matches.iter().map(|m| m.weighted_similarity).sum();
        Some(Self {
            highest: first.weighted_similarity,
            lowest: last.weighted_similarity,
            average: total / matches.len() as f64,
        })
    }
}

/// Outcome of comparing a query rule against a whole store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingReport {
    pub store: String,
    pub query_fields: Vec<String>,
    pub query_values: Vec<String>,
    /// Corpus rules enumerated from the store.
    pub scanned: usize,
    /// Corpus rules skipped as malformed.
    pub skipped: usize,
    pub matches: Vec<MatchCandidate>,
    pub summary: Option<RankingSummary>,
}

/// Similarity engine. Holds only immutable policy; every call works on
/// fresh extractions.
#[derive(Debug, Clone)]
pub struct SimilarityEngine {
    config: SimilarityConfig,
    normalizer: Normalizer,
    scorer: Scorer,
}

impl SimilarityEngine {
    pub fn new(config: SimilarityConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            normalizer: Normalizer::new(&config),
            scorer: Scorer::new(config.scoring.clone()),
            config,
        })
    }

    pub fn config(&self) -> &SimilarityConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    pub fn extract(&self, tree: &DetectionNode) -> Extraction {
        self.normalizer.extract(tree)
    }

    /// Rank `corpus` against `query`.
    ///
    /// Keeps candidates at or above the threshold, sorted by weighted
    /// similarity descending with ties in corpus order, at most `top_n`.
    /// Malformed corpus records are skipped.
    pub fn rank(
        &self,
        query: &DetectionNode,
        corpus: &[StoredRule],
        top_n: usize,
    ) -> Vec<MatchCandidate> {
        let query = self.extract(query);
        self.rank_extracted(&query, corpus, top_n).0
    }

    /// Enumerate `store` and rank its rules against `query`.
    pub fn compare_with_store(
        &self,
        query: &DetectionNode,
        store: &dyn RuleStore,
        top_n: usize,
    ) -> Result<RankingReport> {
        let extraction = self.extract(query);
        info!(
            store = store.name(),
            fields = extraction.fields.len(),
            values = extraction.values.len(),
            "extracted query rule components"
        );

        let corpus = store.enumerate().map_err(SimilarityError::Retrieval)?;
        let (matches, skipped) = self.rank_extracted(&extraction, &corpus, top_n);
        let summary = RankingSummary::from_matches(&matches);

        info!(
            store = store.name(),
            scanned = corpus.len(),
            skipped,
            matches = matches.len(),
            "ranked rule corpus"
        );

        Ok(RankingReport {
            store: store.name().to_string(),
            query_fields: extraction.fields.into_iter().collect(),
            query_values: extraction.values,
            scanned: corpus.len(),
            skipped,
            matches,
            summary,
        })
    }

    /// Explain a candidate's value similarity.
    ///
    /// For each of the first `limit` query values, the candidate value with
    /// the best gated pair score is reported if it clears the explanation
    /// bar. Candidates with low value similarity get no explanations.
    pub fn best_value_matches(
        &self,
        query_values: &[String],
        candidate: &MatchCandidate,
        limit: usize,
    ) -> Vec<ValueMatch> {
        let policy = self.scorer.policy();
        if candidate.value_similarity <= policy.explain_min_value_similarity {
            return Vec::new();
        }

        let mut shown: Vec<ValueMatch> = Vec::new();
        for query_value in query_values.iter().take(limit) {
            let mut best: Option<(&str, f64)> = None;
            for value in &candidate.values {
                let score = self.scorer.pair_score(query_value, value);
                if score > best.map_or(0.0, |(_, s)| s) {
                    best = Some((value.as_str(), score));
                }
            }

            let Some((matched, score)) = best else {
                continue;
            };
            if matched.is_empty() || score <= policy.explain_min_pair_score {
                continue;
            }
            let seen = shown
                .iter()
                .any(|m| m.query_value == *query_value && m.matched_value == matched);
            if !seen {
                shown.push(ValueMatch {
                    query_value: query_value.clone(),
                    matched_value: matched.to_string(),
                    score,
                });
            }
        }
        shown
    }

    /// Returns the ranked matches and the number of skipped records.
    fn rank_extracted(
        &self,
        query: &Extraction,
        corpus: &[StoredRule],
        top_n: usize,
    ) -> (Vec<MatchCandidate>, usize) {
        let scored: Vec<Option<MatchCandidate>> = if self.config.parallel {
            corpus
                .par_iter()
                .enumerate()
                .map(|(i, rule)| self.score_candidate(query, i + 1, rule))
                .collect()
        } else {
            corpus
                .iter()
                .enumerate()
                .map(|(i, rule)| self.score_candidate(query, i + 1, rule))
                .collect()
        };

        let skipped = scored.iter().filter(|c| c.is_none()).count();
        let mut matches: Vec<MatchCandidate> = scored
            .into_iter()
            .flatten()
            .filter(|c| c.weighted_similarity >= self.config.threshold)
            .collect();

        // Stable: equal scores keep corpus order.
        matches.sort_by(|a, b| b.weighted_similarity.total_cmp(&a.weighted_similarity));
        matches.truncate(top_n);
        (matches, skipped)
    }

    fn score_candidate(
        &self,
        query: &Extraction,
        index: usize,
        rule: &StoredRule,
    ) -> Option<MatchCandidate> {
        let detection = match rule.detection() {
            Ok(detection) => detection,
            Err(e) => {
                warn!(index, rule_id = %rule.id, error = %e, "skipping malformed corpus rule");
                return None;
            }
        };

        let candidate = self.extract(&detection);
        let field_similarity = calculate_field_similarity(&query.fields, &candidate.fields);
        let value_similarity = self.scorer.fuzzy_similarity(&query.values, &candidate.values);
        let weighted_similarity = value_similarity * self.config.value_weight
            + field_similarity * self.config.field_weight;

        debug!(
            index,
            rule_id = %rule.id,
            field_similarity,
            value_similarity,
            weighted_similarity,
            "scored corpus rule"
        );

        Some(MatchCandidate {
            index,
            id: rule.id.clone(),
            title: rule.title.clone().unwrap_or_else(|| UNTITLED.to_string()),
            field_similarity,
            value_similarity,
            weighted_similarity,
            fields: candidate.fields.into_iter().collect(),
            values: candidate.values,
            source: rule.source.clone(),
            rule: rule.document.clone(),
        })
    }
}
