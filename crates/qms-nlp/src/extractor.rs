//! Parameter extraction.
//!
//! Each parameter category (factory, supplier, material, ...) is a list of
//! [`ValueExtractor`] strategies tried in order. Categories themselves run
//! in a declared precedence order and each contributes at most one value.

use once_cell::sync::Lazy;
use qms_core::ExtractedParameters;
use regex::Regex;
use std::fmt;
use tracing::{debug, trace};

use crate::error::{NlpError, Result};
use crate::rule::IntentRule;
use crate::vocab;

/// A strategy that finds one canonical value in free text.
pub trait ValueExtractor: Send + Sync + fmt::Debug {
    fn extract(&self, text: &str) -> Option<String>;
}

/// Whether `needle` occurs in `haystack` as a keyword.
///
/// Keywords made only of ASCII letters and digits must not touch another
/// ASCII letter or digit on either side ("BOE" is not found in "Oboe").
/// Any other keyword matches as a plain substring.
fn contains_keyword(haystack: &str, needle: &str) -> bool {
    if !needle.chars().all(|c| c.is_ascii_alphanumeric()) {
        return haystack.contains(needle);
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(|c| c.is_ascii_alphanumeric())
            && !after.is_some_and(|c| c.is_ascii_alphanumeric())
    })
}

/// Literal keyword table with optional canonicalization.
///
/// Keywords are tried longest-first so a short keyword never shadows a
/// longer one that contains it. Matching ignores ASCII case.
#[derive(Debug, Clone)]
pub struct LiteralLookup {
    entries: Vec<(String, String)>,
}

impl LiteralLookup {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut entries: Vec<(String, String)> = entries
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_lowercase(), v.into()))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        // stable: equal lengths keep declaration order
        entries.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
        Self { entries }
    }

    /// Table where every keyword is its own canonical value.
    pub fn from_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(keywords.into_iter().map(|k| {
            let value = k.as_ref().to_string();
            (value.clone(), value)
        }))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ValueExtractor for LiteralLookup {
    fn extract(&self, text: &str) -> Option<String> {
        let haystack = text.to_lowercase();
        self.entries
            .iter()
            .find(|(needle, _)| contains_keyword(&haystack, needle))
            .map(|(_, canonical)| canonical.clone())
    }
}

/// Groups of surface forms mapping to one canonical value.
///
/// Groups are tried in declaration order; the first group with any alias
/// present wins.
#[derive(Debug, Clone)]
pub struct AliasLookup {
    groups: Vec<(String, Vec<String>)>,
}

impl AliasLookup {
    pub fn new<I, C, A, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = (C, A)>,
        C: Into<String>,
        A: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let groups = groups
            .into_iter()
            .map(|(canonical, aliases)| {
                let aliases = aliases
                    .into_iter()
                    .map(|a| a.as_ref().to_lowercase())
                    .filter(|a| !a.is_empty())
                    .collect();
                (canonical.into(), aliases)
            })
            .collect();
        Self { groups }
    }
}

impl ValueExtractor for AliasLookup {
    fn extract(&self, text: &str) -> Option<String> {
        let haystack = text.to_lowercase();
        self.groups
            .iter()
            .find(|(_, aliases)| aliases.iter().any(|a| contains_keyword(&haystack, a)))
            .map(|(canonical, _)| canonical.clone())
    }
}

/// Regex detector for structured tokens such as batch numbers.
#[derive(Debug, Clone)]
pub struct RegexDetector {
    regex: Regex,
    require_digit: bool,
    require_letter: bool,
}

impl RegexDetector {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| NlpError::invalid_pattern(format!("{}: {}", pattern, e)))?;
        Ok(Self::from_regex(regex))
    }

    pub fn from_regex(regex: Regex) -> Self {
        Self {
            regex,
            require_digit: false,
            require_letter: false,
        }
    }

    /// Only accept matches containing both a digit and an ASCII letter.
    pub fn alphanumeric_only(mut self) -> Self {
        self.require_digit = true;
        self.require_letter = true;
        self
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}

impl ValueExtractor for RegexDetector {
    fn extract(&self, text: &str) -> Option<String> {
        self.regex
            .find_iter(text)
            .map(|m| m.as_str())
            .find(|candidate| {
                (!self.require_digit || candidate.chars().any(|c| c.is_ascii_digit()))
                    && (!self.require_letter || candidate.chars().any(|c| c.is_ascii_alphabetic()))
            })
            .map(str::to_string)
    }
}

/// Rule-level extractor as declared in a rule's parameter spec.
#[derive(Debug, Clone)]
pub enum RuleExtractor {
    Keywords(LiteralLookup),
    Pattern(RegexDetector),
}

impl ValueExtractor for RuleExtractor {
    fn extract(&self, text: &str) -> Option<String> {
        match self {
            Self::Keywords(lookup) => lookup.extract(text),
            Self::Pattern(detector) => detector.extract(text),
        }
    }
}

/// One parameter key and the strategies that can fill it.
#[derive(Debug)]
pub struct ParameterCategory {
    key: String,
    strategies: Vec<Box<dyn ValueExtractor>>,
}

impl ParameterCategory {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            strategies: Vec::new(),
        }
    }

    pub fn with_strategy(mut self, strategy: impl ValueExtractor + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn extract(&self, text: &str) -> Option<String> {
        self.strategies.iter().find_map(|s| s.extract(text))
    }
}

static BATCH_STRICT: Lazy<Regex> =
    Lazy::new(|| Regex::new(vocab::BATCH_STRICT_PATTERN).expect("strict batch regex"));

static BATCH_LOOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(vocab::BATCH_LOOSE_PATTERN).expect("loose batch regex"));

/// Extracts query parameters from free text.
#[derive(Debug)]
pub struct ParameterExtractor {
    categories: Vec<ParameterCategory>,
}

impl ParameterExtractor {
    /// Extractor with the quality-management categories, in precedence order:
    /// factory, warehouse, supplier, material, status, test_result, batch_code.
    pub fn new() -> Self {
        let categories = vec![
            ParameterCategory::new("factory")
                .with_strategy(LiteralLookup::new(vocab::FACTORIES.iter().copied())),
            ParameterCategory::new("warehouse")
                .with_strategy(LiteralLookup::new(vocab::WAREHOUSES.iter().copied())),
            ParameterCategory::new("supplier")
                .with_strategy(LiteralLookup::new(vocab::SUPPLIERS.iter().copied()))
                .with_strategy(AliasLookup::new(
                    vocab::SUPPLIER_ALIASES.iter().map(|(c, a)| (*c, a.iter())),
                )),
            ParameterCategory::new("material")
                .with_strategy(LiteralLookup::new(vocab::MATERIALS.iter().copied())),
            ParameterCategory::new("status")
                .with_strategy(LiteralLookup::new(vocab::STATUSES.iter().copied()))
                .with_strategy(AliasLookup::new(
                    vocab::STATUS_SYNONYMS.iter().map(|(c, a)| (*c, a.iter())),
                )),
            ParameterCategory::new("test_result")
                .with_strategy(LiteralLookup::new(vocab::TEST_RESULTS.iter().copied())),
            ParameterCategory::new("batch_code")
                .with_strategy(RegexDetector::from_regex(BATCH_STRICT.clone()))
                .with_strategy(RegexDetector::from_regex(BATCH_LOOSE.clone()).alphanumeric_only()),
        ];
        Self { categories }
    }

    /// Extractor with caller-defined categories, tried in the given order.
    pub fn with_categories(categories: Vec<ParameterCategory>) -> Self {
        Self { categories }
    }

    pub fn category_keys(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(ParameterCategory::key)
    }

    /// Run every category over the text.
    pub fn extract(&self, text: &str) -> ExtractedParameters {
        let mut params = ExtractedParameters::new();
        for category in &self.categories {
            if let Some(value) = category.extract(text) {
                trace!(key = category.key(), value = %value, "Category matched");
                params.insert_if_absent(category.key(), value);
            }
        }
        params
    }

    /// Run every category, then let the rule's own extractors fill declared
    /// parameters the categories did not produce.
    pub fn extract_for_rule(&self, text: &str, rule: &IntentRule) -> ExtractedParameters {
        let mut params = self.extract(text);
        for spec in &rule.parameters {
            if params.contains(&spec.name) {
                continue;
            }
            if let Some(value) = spec.extractors.iter().find_map(|e| e.extract(text)) {
                debug!(rule = %rule.name, parameter = %spec.name, value = %value, "Rule extractor matched");
                params.insert_if_absent(spec.name.clone(), value);
            }
        }
        params
    }

    /// Required parameters of `rule` absent from `params`, in declaration order.
    pub fn missing_required(rule: &IntentRule, params: &ExtractedParameters) -> Vec<String> {
        rule.required_parameters()
            .filter(|name| !params.contains(name))
            .map(String::from)
            .collect()
    }
}

impl Default for ParameterExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleRecord;
    use serde_json::json;

    #[test]
    fn test_factory_and_status() {
        let params = ParameterExtractor::new().extract("深圳工厂风险库存");
        assert_eq!(params.get("factory"), Some("深圳工厂"));
        assert_eq!(params.get("status"), Some("风险"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_factory_canonicalization() {
        let params = ParameterExtractor::new().extract("查询重庆的库存");
        assert_eq!(params.get("factory"), Some("重庆工厂"));
    }

    #[test]
    fn test_longest_match_precedence() {
        let extractor = ParameterExtractor::new();
        assert_eq!(extractor.extract("电池盖库存").get("material"), Some("电池盖"));
        assert_eq!(extractor.extract("电池库存").get("material"), Some("电池"));
        assert_eq!(extractor.extract("电池和电池盖").get("material"), Some("电池盖"));
        assert_eq!(extractor.extract("摄像头模组批次").get("material"), Some("摄像头模组"));
        assert_eq!(extractor.extract("不合格的测试").get("test_result"), Some("NG"));
        assert_eq!(extractor.extract("合格的测试").get("test_result"), Some("OK"));
    }

    #[test]
    fn test_supplier_case_and_alias() {
        let extractor = ParameterExtractor::new();
        assert_eq!(extractor.extract("boe供应商质量如何").get("supplier"), Some("BOE"));
        assert_eq!(extractor.extract("京东方的物料").get("supplier"), Some("BOE"));
        assert_eq!(extractor.extract("华星光电测试").get("supplier"), Some("华星"));
    }

    #[test]
    fn test_ascii_keywords_need_word_boundaries() {
        let extractor = ParameterExtractor::new();
        assert!(extractor.extract("查询Samsung的检验结果").is_empty());
        assert!(extractor.extract("testing批次的检验结果").is_empty());
        assert!(extractor.extract("查询Oboe的库存").is_empty());
        assert_eq!(extractor.extract("BOE供应商库存").get("supplier"), Some("BOE"));
        assert_eq!(extractor.extract("结果为NG的批次").get("test_result"), Some("NG"));
        assert_eq!(extractor.extract("AAC, 瑞声").get("supplier"), Some("瑞声"));
        assert_eq!(extractor.extract("AACX物料").get("supplier"), None);
    }

    #[test]
    fn test_contains_keyword() {
        assert!(contains_keyword("boe供应商", "boe"));
        assert!(contains_keyword("查询 boe", "boe"));
        assert!(!contains_keyword("oboe", "boe"));
        assert!(!contains_keyword("boe1", "boe"));
        assert!(contains_keyword("oboe和boe", "boe"));
        assert!(contains_keyword("tcl华星光电", "tcl华星"));
        assert!(contains_keyword("电池盖", "电池"));
    }

    #[test]
    fn test_status_synonym_fallback() {
        let extractor = ParameterExtractor::new();
        assert_eq!(extractor.extract("有哪些异常物料").get("status"), Some("风险"));
        assert_eq!(extractor.extract("被锁定的库存").get("status"), Some("冻结"));
        // literal beats synonym
        assert_eq!(extractor.extract("冻结和异常").get("status"), Some("冻结"));
    }

    #[test]
    fn test_batch_codes() {
        let extractor = ParameterExtractor::new();
        assert_eq!(extractor.extract("批次SK1234567的情况").get("batch_code"), Some("SK1234567"));
        assert_eq!(extractor.extract("批次B20240115A").get("batch_code"), Some("B20240115A"));
        assert_eq!(extractor.extract("OLEDLCD屏幕").get("batch_code"), None);
        assert_eq!(extractor.extract("数量大于100000").get("batch_code"), None);
    }

    #[test]
    fn test_no_parameters() {
        let params = ParameterExtractor::new().extract("随便说点什么");
        assert!(params.is_empty());
    }

    #[test]
    fn test_determinism() {
        let extractor = ParameterExtractor::new();
        let text = "BOE在深圳工厂的电池盖风险批次SK1234567";
        let first = extractor.extract(text);
        for _ in 0..10 {
            assert_eq!(extractor.extract(text), first);
        }
        assert_eq!(first.get("supplier"), Some("BOE"));
        assert_eq!(first.get("batch_code"), Some("SK1234567"));
    }

    #[test]
    fn test_rule_extractors_fill_gaps() {
        let record: RuleRecord = serde_json::from_value(json!({
            "intent_name": "项目查询",
            "action_type": "SQL_QUERY",
            "action_target": "SELECT * FROM online_tracking WHERE project = '{{ project }}'",
            "parameters": [
                {"name": "project", "required": true, "extractors": [
                    {"type": "regex", "pattern": "X\\d{4}"}
                ]},
                {"name": "line", "extractors": [
                    {"type": "keywords", "values": ["一线", "二线"]}
                ]}
            ],
            "trigger_words": ["项目"]
        }))
        .unwrap();
        let rule = IntentRule::from_record(record).unwrap();

        let params = ParameterExtractor::new().extract_for_rule("项目X6827二线的不良", &rule);
        assert_eq!(params.get("project"), Some("X6827"));
        assert_eq!(params.get("line"), Some("二线"));
    }

    #[test]
    fn test_missing_required() {
        let record: RuleRecord = serde_json::from_value(json!({
            "intent_name": "批次追溯",
            "action_type": "FUNCTION_CALL",
            "action_target": "batch_trace",
            "parameters": [
                {"name": "batch_code", "required": true},
                {"name": "factory"},
                {"name": "project", "required": true}
            ]
        }))
        .unwrap();
        let rule = IntentRule::from_record(record).unwrap();

        let params = ParameterExtractor::new().extract("深圳工厂的批次");
        assert_eq!(
            ParameterExtractor::missing_required(&rule, &params),
            vec!["batch_code", "project"]
        );

        let params = ParameterExtractor::new().extract("批次SK1234567");
        assert_eq!(
            ParameterExtractor::missing_required(&rule, &params),
            vec!["project"]
        );
    }

    #[test]
    fn test_custom_categories() {
        let extractor = ParameterExtractor::with_categories(vec![ParameterCategory::new("shift")
            .with_strategy(LiteralLookup::new([("夜班", "night"), ("白班", "day")]))]);
        assert_eq!(extractor.extract("夜班的检验").get("shift"), Some("night"));
        assert_eq!(extractor.category_keys().collect::<Vec<_>>(), vec!["shift"]);
    }
}
