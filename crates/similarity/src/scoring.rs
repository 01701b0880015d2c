//! Field and value similarity scoring.
//!
//! Field similarity is a plain Jaccard index. Value similarity averages, for
//! every query value, its best gated pair score against the candidate's
//! values. The gate ([`is_meaningful_match`]) zeroes pairs that score well
//! lexically but are implausible matches for their length.

use std::collections::HashSet;
use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;

use crate::config::ScoringPolicy;
use crate::sequence::sequence_ratio;

static WORD_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+").expect("valid word token regex"));

/// Jaccard index of two field-token sets. 0.0 when either side is empty.
pub fn calculate_field_similarity(fields1: &IndexSet<String>, fields2: &IndexSet<String>) -> f64 {
    if fields1.is_empty() || fields2.is_empty() {
        return 0.0;
    }
    let intersection = fields1.intersection(fields2).count();
    let union = fields1.union(fields2).count();
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// Decide whether a pair score reflects a plausible match.
///
/// Short strings only match exactly or as a strong prefix; strings of very
/// different lengths never match; the score bar drops as strings get longer.
pub fn is_meaningful_match(s1: &str, s2: &str, score: f64) -> bool {
    let a = s1.to_lowercase();
    let b = s2.to_lowercase();
    let (a, b) = (a.trim(), b.trim());

    if a.is_empty() || b.is_empty() {
        return false;
    }

    let len_a = a.chars().count();
    let len_b = b.chars().count();
    let min_len = len_a.min(len_b);
    let max_len = len_a.max(len_b);
    let is_prefix = a.starts_with(b) || b.starts_with(a);

    if min_len < 3 {
        return match min_len {
            1 => a == b,
            2 if is_prefix => score > 0.8,
            2 => a == b,
            _ if max_len > 5 => false,
            _ => a == b,
        };
    }

    let length_ratio = min_len as f64 / max_len as f64;
    if length_ratio < 0.4 {
        return false;
    }

    if min_len <= 5 {
        if is_prefix {
            return score > 0.6;
        }
        if score < 0.85 {
            return false;
        }
        if !(a.contains(b) || b.contains(a)) {
            return false;
        }
    } else if min_len <= 10 {
        if score < 0.6 {
            return false;
        }
    } else if score < 0.5 {
        return false;
    }

    // Mid-range scores from near-anagrams: same characters, different start.
    if score > 0.5 && score < 0.8 {
        let chars_a: HashSet<char> = a.chars().collect();
        let chars_b: HashSet<char> = b.chars().collect();
        let overlap =
            chars_a.intersection(&chars_b).count() as f64 / chars_a.len().max(chars_b.len()) as f64;
        if overlap > 0.7 && a.chars().next() != b.chars().next() {
            return false;
        }
    }

    true
}

/// Pairwise and list-level value scorer.
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    policy: ScoringPolicy,
}

impl Scorer {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Combined pair score before the meaningful-match gate:
    /// `clamp(ratio + substring_bonus - token_penalty, 0, 1)`.
    pub fn raw_pair_score(&self, a: &str, b: &str) -> f64 {
        let a = a.to_lowercase();
        let b = b.to_lowercase();
        let ratio = sequence_ratio(&a, &b);

        let mut bonus = 0.0;
        if a.contains(b.as_str()) || b.contains(a.as_str()) {
            let len_a = a.chars().count();
            let len_b = b.chars().count();
            let max_len = len_a.max(len_b);
            let length_ratio = if max_len > 0 {
                len_a.min(len_b) as f64 / max_len as f64
            } else {
                0.0
            };
            if length_ratio >= self.policy.substring_ratio_high {
                bonus = self.policy.substring_bonus_high;
            } else if length_ratio >= self.policy.substring_ratio_low {
                bonus = self.policy.substring_bonus_low;
            }
        }

        let mut penalty = 0.0;
        if bonus == 0.0 && shares_plain_token(&a, &b) {
            penalty = self.policy.token_penalty;
        }

        (ratio + bonus - penalty).clamp(0.0, 1.0)
    }

    /// Gated pair score: the combined score, or 0.0 when the pair is not a
    /// meaningful match.
    pub fn pair_score(&self, a: &str, b: &str) -> f64 {
        let score = self.raw_pair_score(a, b);
        if is_meaningful_match(a, b, score) {
            score
        } else {
            0.0
        }
    }

    /// Mean over `values1` of each value's best pair score in `values2`.
    ///
    /// Asymmetric. Returns 0.0 when either side is empty.
    pub fn fuzzy_similarity<A, B>(&self, values1: &[A], values2: &[B]) -> f64
    where
        A: AsRef<str>,
        B: AsRef<str>,
    {
        if values1.is_empty() || values2.is_empty() {
            return 0.0;
        }

        let total: f64 = values1
            .iter()
            .map(|v1| {
                values2
                    .iter()
                    .map(|v2| self.pair_score(v1.as_ref(), v2.as_ref()))
                    .fold(0.0, f64::max)
            })
            .sum();

        total / values1.len() as f64
    }
}

/// True when the two strings share a word token made only of digits or
/// only of letters.
fn shares_plain_token(a: &str, b: &str) -> bool {
    let tokens_a: HashSet<&str> = WORD_TOKEN.find_iter(a).map(|m| m.as_str()).collect();
    WORD_TOKEN
        .find_iter(b)
        .map(|m| m.as_str())
        .filter(|t| tokens_a.contains(t))
        .any(|t| t.chars().all(char::is_numeric) || t.chars().all(char::is_alphabetic))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn set(items: &[&str]) -> IndexSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn field_similarity_jaccard() {
        let a = set(&["image", "commandline"]);
        let b = set(&["image", "parentimage"]);
        assert!(approx(calculate_field_similarity(&a, &b), 1.0 / 3.0));
        assert_eq!(calculate_field_similarity(&a, &a), 1.0);
        assert_eq!(calculate_field_similarity(&a, &set(&["user"])), 0.0);
    }

    #[test]
    fn field_similarity_empty_is_zero() {
        assert_eq!(calculate_field_similarity(&set(&[]), &set(&["image"])), 0.0);
        assert_eq!(calculate_field_similarity(&set(&[]), &set(&[])), 0.0);
    }

    #[test]
    fn self_pairs_score_one() {
        let scorer = Scorer::default();
        for v in ["a", "ab", "cmd", "whoami", "c:windowssystem32net", "4688", "net user"] {
            assert_eq!(scorer.pair_score(v, v), 1.0, "value {v}");
            assert!(is_meaningful_match(v, v, 1.0));
        }
    }

    #[test]
    fn substring_bonus_tiers() {
        let scorer = Scorer::default();
        // ratio 0.6, length ratio 3/7 -> +0.05
        assert!(approx(scorer.raw_pair_score("cmd", "cmdline"), 0.65));
        // ratio 2*4/10 = 0.8, length ratio 4/6 -> +0.10
        assert!(approx(scorer.raw_pair_score("rund", "rundll"), 0.9));
        // length ratio 1/7 -> no bonus, no shared token
        assert!(approx(scorer.raw_pair_score("x", "xxxxxxx"), 0.25));
    }

    #[test]
    fn shared_token_penalty_only_without_bonus() {
        let scorer = Scorer::default();
        // ratio 2*9/22, shared "net" token, not substrings
        let raw = scorer.raw_pair_score("net user x", "net group y");
        let ratio = sequence_ratio("net user x", "net group y");
        assert!(approx(raw, (ratio - 0.3).max(0.0)));
        // substring: bonus applies and the shared token is not penalized
        assert!(approx(
            scorer.raw_pair_score("net user", "net user add"),
            sequence_ratio("net user", "net user add") + 0.1
        ));
    }

    #[test]
    fn mixed_tokens_are_not_penalized() {
        let scorer = Scorer::default();
        // only shared token is "v2_x", which is neither all-digit nor all-alpha
        let raw = scorer.raw_pair_score("v2_x abc", "v2_x def");
        assert!(approx(raw, sequence_ratio("v2_x abc", "v2_x def")));
    }

    #[test]
    fn gate_rejects_two_char_non_prefix() {
        assert!(!is_meaningful_match("ab", "cd", 0.9));
        assert!(!is_meaningful_match("ab", "ba", 0.9));
        assert!(is_meaningful_match("ab", "abc", 0.9));
        assert!(!is_meaningful_match("ab", "abc", 0.8));
    }

    #[test]
    fn gate_single_char_requires_equality() {
        assert!(is_meaningful_match("a", "A", 0.1));
        assert!(!is_meaningful_match("a", "ab", 1.0));
    }

    #[test]
    fn gate_rejects_empty_and_disproportionate() {
        assert!(!is_meaningful_match("", "abc", 1.0));
        assert!(!is_meaningful_match("  ", "abc", 1.0));
        assert!(!is_meaningful_match("abc", "abcdefgh", 1.0));
    }

    #[test]
    fn gate_short_strings() {
        assert!(is_meaningful_match("cmd", "cmdline", 0.65));
        assert!(!is_meaningful_match("cmd", "cmdline", 0.6));
        // not a prefix: needs >= 0.85 and containment
        assert!(is_meaningful_match("dll", "rundll", 0.9));
        assert!(!is_meaningful_match("dll", "rundll", 0.84));
        assert!(!is_meaningful_match("abc", "abd", 0.9));
    }

    #[test]
    fn gate_length_bands() {
        assert!(!is_meaningful_match("powershell", "powershall", 0.59));
        assert!(is_meaningful_match("powershell", "powershall", 0.9));
        assert!(!is_meaningful_match("abcdefghijkl", "abcdefghijkz", 0.49));
        assert!(is_meaningful_match("abcdefghijkl", "abcdefghijkz", 0.85));
    }

    #[test]
    fn gate_char_overlap_guard() {
        // same letters, different first character, mid-range score
        assert!(!is_meaningful_match("listen", "silent", 0.7));
        assert!(is_meaningful_match("listen", "silent", 0.8));
        assert!(is_meaningful_match("listen", "lisent", 0.7));
    }

    #[test]
    fn fuzzy_similarity_is_mean_of_best_scores() {
        let scorer = Scorer::default();
        let sim = scorer.fuzzy_similarity(&["cmd", "whoami"], &["cmd", "zzzzzz"]);
        assert!(approx(sim, 0.5));
        assert_eq!(scorer.fuzzy_similarity(&["cmd", "whoami"], &["whoami", "cmd"]), 1.0);
    }

    #[test]
    fn fuzzy_similarity_is_asymmetric() {
        let scorer = Scorer::default();
        let forward = scorer.fuzzy_similarity(&["cmd"], &["cmd", "whoami"]);
        let backward = scorer.fuzzy_similarity(&["cmd", "whoami"], &["cmd"]);
        assert_eq!(forward, 1.0);
        assert!(approx(backward, 0.5));
    }

    #[test]
    fn fuzzy_similarity_empty_is_zero() {
        let scorer = Scorer::default();
        let empty: [&str; 0] = [];
        assert_eq!(scorer.fuzzy_similarity(&empty, &["a"]), 0.0);
        assert_eq!(scorer.fuzzy_similarity(&["a"], &empty), 0.0);
    }

    #[test]
    fn scores_are_bounded() {
        let scorer = Scorer::default();
        let values = ["", "a", "ab", "cmd.exe", "net user", "11111", "x y z", "ççç", "rundll32"];
        for a in values {
            for b in values {
                let s = scorer.pair_score(a, b);
                assert!((0.0..=1.0).contains(&s), "{a} vs {b} -> {s}");
            }
        }
        let sim = scorer.fuzzy_similarity(&values, &values);
        assert!((0.0..=1.0).contains(&sim));
    }
}
