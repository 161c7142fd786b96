//! Intent matching.
//!
//! Every active rule is scored against the input:
//!
//! ```text
//! raw      = trigger_hits * 2 + synonym_hits + synonym_key_hits * 2
//! weighted = raw * 100 / priority
//! ```
//!
//! Hits are case-insensitive substring checks counted once per term. The
//! best weighted score wins if it reaches the threshold; on a tie the rule
//! earlier in the catalog wins.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::catalog::RuleCatalog;
use crate::rule::IntentRule;

/// Default minimum weighted score for a match.
pub const DEFAULT_MIN_SCORE: f64 = 2.0;

/// Score breakdown for one rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleScore {
    pub raw: u32,
    pub weighted: f64,
    pub matched_terms: Vec<String>,
}

/// The selected rule for a request.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub rule: Arc<IntentRule>,
    pub score: f64,
    pub matched_terms: Vec<String>,
}

/// Scores rules against free text.
#[derive(Debug, Clone)]
pub struct IntentMatcher {
    min_score: f64,
}

impl IntentMatcher {
    pub fn new(min_score: f64) -> Self {
        Self { min_score }
    }

    pub fn min_score(&self) -> f64 {
        self.min_score
    }

    /// Score one rule. `text` is matched case-insensitively.
    pub fn score(&self, rule: &IntentRule, text: &str) -> RuleScore {
        let haystack = text.to_lowercase();
        let contains = |term: &str| haystack.contains(term.to_lowercase().as_str());

        let mut raw = 0u32;
        let mut matched_terms = Vec::new();

        for word in &rule.trigger_words {
            if contains(word) {
                raw += 2;
                matched_terms.push(word.clone());
            }
        }

        for (key, alternates) in &rule.synonyms {
            if contains(key) {
                raw += 2;
                matched_terms.push(key.clone());
            }
            for alternate in alternates {
                if contains(alternate) {
                    raw += 1;
                    matched_terms.push(alternate.clone());
                }
            }
        }

        RuleScore {
            raw,
            weighted: rule.weighted_score(raw),
            matched_terms,
        }
    }

    /// Select the best active rule for `text`, if any clears the threshold.
    pub fn identify(&self, text: &str, catalog: &RuleCatalog) -> Option<MatchResult> {
        let mut best: Option<MatchResult> = None;

        for rule in catalog.active_rules() {
            let score = self.score(rule, text);
            if score.raw == 0 {
                continue;
            }
            trace!(rule = %rule.name, raw = score.raw, weighted = score.weighted, "Scored rule");

            let better = best.as_ref().map_or(true, |b| score.weighted > b.score);
            if better {
                best = Some(MatchResult {
                    rule: Arc::clone(rule),
                    score: score.weighted,
                    matched_terms: score.matched_terms,
                });
            }
        }

        match best {
            Some(m) if m.score >= self.min_score => {
                debug!(rule = %m.rule.name, score = m.score, terms = ?m.matched_terms, "Intent matched");
                Some(m)
            }
            Some(m) => {
                debug!(rule = %m.rule.name, score = m.score, min_score = self.min_score, "Best rule below threshold");
                None
            }
            None => {
                debug!("No rule had any hits");
                None
            }
        }
    }

    /// All rules with at least one hit, best first. Equal scores keep
    /// catalog order.
    pub fn candidates(&self, text: &str, catalog: &RuleCatalog) -> Vec<MatchResult> {
        let mut results: Vec<MatchResult> = catalog
            .active_rules()
            .filter_map(|rule| {
                let score = self.score(rule, text);
                (score.raw > 0).then(|| MatchResult {
                    rule: Arc::clone(rule),
                    score: score.weighted,
                    matched_terms: score.matched_terms,
                })
            })
            .collect();
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results
    }
}

impl Default for IntentMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SCORE)
    }
}
