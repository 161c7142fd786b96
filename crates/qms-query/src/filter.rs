//! Row filtering by extracted parameters.

use qms_core::{ExtractedParameters, Row};

use crate::fields::{columns_for, value_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchMode {
    Equals,
    Contains,
}

/// Parameter keys that filter rows, with how they compare.
const FILTER_KEYS: &[(&str, MatchMode)] = &[
    ("factory", MatchMode::Equals),
    ("warehouse", MatchMode::Equals),
    ("supplier", MatchMode::Contains),
    ("material", MatchMode::Contains),
    ("status", MatchMode::Equals),
    ("batch_code", MatchMode::Equals),
    ("test_result", MatchMode::Equals),
];

#[derive(Debug, Clone, PartialEq, Eq)]
struct Predicate {
    key: &'static str,
    value: String,
    mode: MatchMode,
}

/// Conjunction of equality / contains checks.
///
/// A predicate only applies to rows that carry one of its columns, so a
/// `warehouse` filter does not empty a collection without warehouses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFilter {
    predicates: Vec<Predicate>,
}

impl RowFilter {
    pub fn from_params(params: &ExtractedParameters) -> Self {
        let predicates = FILTER_KEYS
            .iter()
            .filter_map(|&(key, mode)| {
                params.get(key).map(|value| Predicate {
                    key,
                    value: value.to_string(),
                    mode,
                })
            })
            .collect();
        Self { predicates }
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// `(key, value)` pairs this filter checks.
    pub fn conditions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.predicates.iter().map(|p| (p.key, p.value.as_str()))
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.predicates.iter().all(|p| predicate_matches(p, row))
    }

    pub fn apply(&self, rows: &[Row]) -> Vec<Row> {
        rows.iter().filter(|row| self.matches(row)).cloned().collect()
    }
}

fn predicate_matches(predicate: &Predicate, row: &Row) -> bool {
    let present: Vec<String> = columns_for(predicate.key)
        .into_iter()
        .filter_map(|column| row.get(column))
        .filter_map(value_text)
        .collect();

    if present.is_empty() {
        return true;
    }

    let wanted = predicate.value.to_lowercase();
    present.iter().any(|actual| {
        let actual = actual.to_lowercase();
        match predicate.mode {
            MatchMode::Equals => actual == wanted,
            MatchMode::Contains => actual.contains(&wanted),
        }
    })
}
