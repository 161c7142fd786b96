//! Immutable rule catalog.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::builtin;
use crate::rule::{IntentRule, RuleRecord, RuleSummary};
use crate::store::RuleStore;

/// A record that did not make it into the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedRule {
    pub name: String,
    pub reason: String,
}

/// Process-wide snapshot of intent rules, in catalog order.
///
/// Built once and shared as `Arc<RuleCatalog>`; replacing rules means
/// building a new catalog.
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    rules: Vec<Arc<IntentRule>>,
    rejected: Vec<RejectedRule>,
    origin: String,
}

impl RuleCatalog {
    /// Build from typed records, skipping invalid or duplicate ones.
    pub fn from_records(records: Vec<RuleRecord>) -> Self {
        let mut catalog = Self::default();
        for record in records {
            let name = record.intent_name.clone();
            match IntentRule::from_record(record) {
                Ok(rule) => catalog.push(rule),
                Err(e) => catalog.reject(name, e.to_string()),
            }
        }
        catalog
    }

    /// Build from raw JSON records.
    pub fn from_values(values: Vec<Value>) -> Self {
        let mut catalog = Self::default();
        for value in values {
            let name = value
                .get("intent_name")
                .and_then(Value::as_str)
                .unwrap_or("<unnamed>")
                .to_string();
            match serde_json::from_value::<RuleRecord>(value) {
                Ok(record) => match IntentRule::from_record(record) {
                    Ok(rule) => catalog.push(rule),
                    Err(e) => catalog.reject(name, e.to_string()),
                },
                Err(e) => catalog.reject(name, format!("malformed record: {}", e)),
            }
        }
        catalog
    }

    /// The built-in rule set.
    pub fn builtin() -> Self {
        Self::from_values(builtin::records()).with_origin("builtin")
    }

    /// Load from a store, falling back to the built-in set when the store
    /// fails, is empty, or yields no usable active rule.
    pub async fn load(store: &dyn RuleStore) -> Self {
        let catalog = match store.load_records().await {
            Ok(values) if values.is_empty() => {
                warn!(store = store.name(), "Rule store is empty, using built-in rules");
                return Self::builtin();
            }
            Ok(values) => Self::from_values(values).with_origin(store.name()),
            Err(e) => {
                warn!(store = store.name(), error = %e, "Failed to load rules, using built-in rules");
                return Self::builtin();
            }
        };

        if catalog.active_rules().next().is_none() {
            warn!(
                store = store.name(),
                rejected = catalog.rejected.len(),
                "Rule store has no usable active rules, using built-in rules"
            );
            return Self::builtin();
        }

        info!(
            store = store.name(),
            rules = catalog.len(),
            rejected = catalog.rejected.len(),
            "Loaded rule catalog"
        );
        catalog
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    fn push(&mut self, rule: IntentRule) {
        if self.rules.iter().any(|r| r.name == rule.name) {
            let name = rule.name.clone();
            self.reject(name, "duplicate intent_name".to_string());
            return;
        }
        self.rules.push(Arc::new(rule));
    }

    fn reject(&mut self, name: String, reason: String) {
        warn!(rule = %name, reason = %reason, "Skipping rule");
        self.rejected.push(RejectedRule { name, reason });
    }

    /// Move rules failing `check` to the rejected list.
    pub fn exclude<F>(&mut self, mut check: F)
    where
        F: FnMut(&IntentRule) -> Option<String>,
    {
        let mut kept = Vec::with_capacity(self.rules.len());
        for rule in std::mem::take(&mut self.rules) {
            match check(&rule) {
                Some(reason) => self.reject(rule.name.clone(), reason),
                None => kept.push(rule),
            }
        }
        self.rules = kept;
    }

    /// Where the rules came from ("builtin", "file", "database", ...).
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn rules(&self) -> &[Arc<IntentRule>] {
        &self.rules
    }

    pub fn active_rules(&self) -> impl Iterator<Item = &Arc<IntentRule>> {
        self.rules.iter().filter(|r| r.is_active())
    }

    pub fn rejected(&self) -> &[RejectedRule] {
        &self.rejected
    }

    pub fn get(&self, name: &str) -> Option<&Arc<IntentRule>> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Up to `limit` distinct example queries of active rules, highest
    /// priority first.
    pub fn example_queries(&self, limit: usize) -> Vec<String> {
        let mut rules: Vec<&Arc<IntentRule>> = self.active_rules().collect();
        rules.sort_by_key(|r| r.priority);
        let mut seen = HashSet::new();
        rules
            .into_iter()
            .filter_map(|r| r.example_query.clone())
            .filter(|q| seen.insert(q.clone()))
            .take(limit)
            .collect()
    }

    pub fn summaries(&self) -> Vec<RuleSummary> {
        self.active_rules().map(|r| r.summary()).collect()
    }
}
