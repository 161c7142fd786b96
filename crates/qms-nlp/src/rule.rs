//! Intent rule model.
//!
//! [`RuleRecord`] is the wire shape of a rule as stored in a file or the
//! `nlp_intent_rules` table. [`IntentRule`] is the validated, compiled form
//! the matcher and executor work with.

use qms_template::Template;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{NlpError, Result};
use crate::extractor::{LiteralLookup, RegexDetector, RuleExtractor};

const DEFAULT_PRIORITY: u32 = 5;

fn default_priority() -> u32 {
    DEFAULT_PRIORITY
}

/// Lifecycle status of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    #[default]
    #[serde(alias = "ACTIVE", alias = "Active", alias = "enabled")]
    Active,
    #[serde(alias = "INACTIVE", alias = "Inactive", alias = "disabled")]
    Inactive,
}

/// Extractor declared on a rule parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtractorSpec {
    Keywords { values: Vec<String> },
    Regex { pattern: String },
}

/// Declared parameter of a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extractors: Vec<ExtractorSpec>,
}

impl ParameterDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            description: None,
            extractors: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// A rule definition record.
///
/// `parameters`, `trigger_words` and `synonyms` accept native JSON values or
/// JSON-encoded strings, since database rows usually carry them as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub intent_name: String,
    #[serde(default)]
    pub description: String,
    pub action_type: String,
    pub action_target: String,
    #[serde(default, deserialize_with = "de::parameters")]
    pub parameters: Vec<ParameterDefinition>,
    #[serde(default, deserialize_with = "de::string_list")]
    pub trigger_words: Vec<String>,
    #[serde(default, deserialize_with = "de::synonyms")]
    pub synonyms: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_query: Option<String>,
    #[serde(default = "default_priority", deserialize_with = "de::priority")]
    pub priority: u32,
    #[serde(default)]
    pub status: RuleStatus,
}

/// What a rule does once it is selected.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleAction {
    /// Render the template and run it through the executor.
    SqlQuery { template: Template },
    /// Invoke a registered function.
    FunctionCall { name: String },
    /// Read a named dataset collection.
    DataQuery { name: String },
}

impl RuleAction {
    pub const SQL_QUERY: &'static str = "SQL_QUERY";
    pub const FUNCTION_CALL: &'static str = "FUNCTION_CALL";
    pub const DATA_QUERY: &'static str = "DATA_QUERY";

    /// Build an action from the record's `action_type` and `action_target`.
    pub fn from_parts(action_type: &str, target: &str) -> Result<Self> {
        let target = target.trim();
        match action_type.trim().to_ascii_uppercase().as_str() {
            Self::SQL_QUERY => Ok(Self::SqlQuery {
                template: Template::parse(target)?,
            }),
            Self::FUNCTION_CALL | Self::DATA_QUERY if target.is_empty() => Err(
                NlpError::validation(format!("{} requires a non-empty target", action_type)),
            ),
            Self::FUNCTION_CALL => Ok(Self::FunctionCall {
                name: target.to_string(),
            }),
            Self::DATA_QUERY => Ok(Self::DataQuery {
                name: target.to_string(),
            }),
            other => Err(NlpError::unsupported_action(other.to_string())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::SqlQuery { .. } => Self::SQL_QUERY,
            Self::FunctionCall { .. } => Self::FUNCTION_CALL,
            Self::DataQuery { .. } => Self::DATA_QUERY,
        }
    }

    pub fn target(&self) -> &str {
        match self {
            Self::SqlQuery { template } => template.source(),
            Self::FunctionCall { name } | Self::DataQuery { name } => name,
        }
    }
}

/// A compiled rule parameter.
#[derive(Debug, Clone)]
pub struct ParameterSpec {
    pub name: String,
    pub required: bool,
    pub extractors: Vec<RuleExtractor>,
}

/// A validated intent rule.
#[derive(Debug, Clone)]
pub struct IntentRule {
    pub name: String,
    pub description: String,
    pub action: RuleAction,
    pub parameters: Vec<ParameterSpec>,
    pub trigger_words: Vec<String>,
    pub synonyms: BTreeMap<String, Vec<String>>,
    pub example_query: Option<String>,
    pub priority: u32,
    pub status: RuleStatus,
}

impl IntentRule {
    /// Validate a record and compile its template and extractors.
    pub fn from_record(record: RuleRecord) -> Result<Self> {
        let name = record.intent_name.trim().to_string();
        if name.is_empty() {
            return Err(NlpError::validation("intent_name cannot be empty"));
        }
        if record.priority == 0 {
            return Err(NlpError::validation(format!(
                "rule '{}' has priority 0; priority must be positive",
                name
            )));
        }

        let action = RuleAction::from_parts(&record.action_type, &record.action_target)
            .map_err(|e| match e {
                NlpError::Template(err) => NlpError::rule_load(format!(
                    "rule '{}' has an invalid template: {}",
                    name, err
                )),
                other => other,
            })?;

        let parameters = record
            .parameters
            .into_iter()
            .map(compile_parameter)
            .collect::<Result<Vec<_>>>()?;

        let mut trigger_words: Vec<String> = Vec::new();
        for word in record.trigger_words {
            let word = word.trim().to_string();
            if !word.is_empty() && !trigger_words.contains(&word) {
                trigger_words.push(word);
            }
        }

        let synonyms = record
            .synonyms
            .into_iter()
            .filter(|(key, _)| !key.trim().is_empty())
            .map(|(key, alternates)| {
                let alternates = alternates
                    .into_iter()
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty())
                    .collect();
                (key.trim().to_string(), alternates)
            })
            .collect();

        Ok(Self {
            name,
            description: record.description,
            action,
            parameters,
            trigger_words,
            synonyms,
            example_query: record.example_query.filter(|q| !q.trim().is_empty()),
            priority: record.priority,
            status: record.status,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == RuleStatus::Active
    }

    /// Scale a raw hit score by priority; lower priority numbers weigh more.
    pub fn weighted_score(&self, raw: u32) -> f64 {
        f64::from(raw) * 100.0 / f64::from(self.priority)
    }

    /// Declared parameter names, in declaration order.
    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
    }

    pub fn summary(&self) -> RuleSummary {
        RuleSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            action_type: self.action.kind().to_string(),
            action_target: match &self.action {
                RuleAction::SqlQuery { .. } => None,
                other => Some(other.target().to_string()),
            },
            parameters: self.parameter_names().into_iter().map(String::from).collect(),
            example_query: self.example_query.clone(),
            priority: self.priority,
        }
    }
}

impl fmt::Display for IntentRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, priority {})", self.name, self.action.kind(), self.priority)
    }
}

fn compile_parameter(definition: ParameterDefinition) -> Result<ParameterSpec> {
    let name = definition.name.trim().to_string();
    if name.is_empty() {
        return Err(NlpError::validation("parameter name cannot be empty"));
    }
    let extractors = definition
        .extractors
        .into_iter()
        .map(|spec| match spec {
            ExtractorSpec::Keywords { values } => {
                Ok(RuleExtractor::Keywords(LiteralLookup::from_keywords(values)))
            }
            ExtractorSpec::Regex { pattern } => {
                RegexDetector::new(&pattern).map(RuleExtractor::Pattern)
            }
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(ParameterSpec {
        name,
        required: definition.required,
        extractors,
    })
}

/// Listing entry for an active rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleSummary {
    pub name: String,
    pub description: String,
    pub action_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_target: Option<String>,
    pub parameters: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example_query: Option<String>,
    pub priority: u32,
}

/// Lenient deserializers for record fields that may arrive as text.
mod de {
    use super::*;
    use serde::de::Error;

    /// Decode a value that may be a JSON document wrapped in a string.
    fn unwrap_json_string<E: Error>(value: Value) -> std::result::Result<Option<Value>, E> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.starts_with('[') || trimmed.starts_with('{') {
                    serde_json::from_str(trimmed).map(Some).map_err(E::custom)
                } else {
                    Ok(Some(Value::String(s)))
                }
            }
            other => Ok(Some(other)),
        }
    }

    fn split_list(s: &str) -> Vec<String> {
        s.split([',', '，'])
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(String::from)
            .collect()
    }

    fn value_to_list<E: Error>(value: Value) -> std::result::Result<Vec<String>, E> {
        match value {
            Value::String(s) => Ok(split_list(&s)),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(E::custom(format!("expected a string, got {}", other))),
                })
                .collect(),
            other => Err(E::custom(format!("expected a list of strings, got {}", other))),
        }
    }

    pub fn string_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match unwrap_json_string::<D::Error>(Value::deserialize(deserializer)?)? {
            None => Ok(Vec::new()),
            Some(value) => value_to_list::<D::Error>(value),
        }
    }

    pub fn synonyms<'de, D>(
        deserializer: D,
    ) -> std::result::Result<BTreeMap<String, Vec<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match unwrap_json_string::<D::Error>(Value::deserialize(deserializer)?)? {
            None => Ok(BTreeMap::new()),
            Some(Value::Object(map)) => map
                .into_iter()
                .map(|(key, alternates)| {
                    value_to_list::<D::Error>(alternates).map(|list| (key, list))
                })
                .collect(),
            Some(other) => Err(D::Error::custom(format!(
                "expected a synonym map, got {}",
                other
            ))),
        }
    }

    pub fn parameters<'de, D>(
        deserializer: D,
    ) -> std::result::Result<Vec<ParameterDefinition>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match unwrap_json_string::<D::Error>(Value::deserialize(deserializer)?)? {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(name) => Ok(ParameterDefinition::new(name)),
                    other => serde_json::from_value(other).map_err(D::Error::custom),
                })
                .collect(),
            Some(other) => Err(D::Error::custom(format!(
                "expected a parameter list, got {}",
                other
            ))),
        }
    }

    pub fn priority<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(DEFAULT_PRIORITY),
            Value::Number(n) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| D::Error::custom(format!("invalid priority {}", n))),
            Value::String(s) => s
                .trim()
                .parse()
                .map_err(|_| D::Error::custom(format!("invalid priority '{}'", s))),
            other => Err(D::Error::custom(format!("invalid priority {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RuleRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_native_record() {
        let rec = record(json!({
            "intent_name": "工厂库存查询",
            "description": "按工厂查询库存",
            "action_type": "SQL_QUERY",
            "action_target": "SELECT * FROM inventory WHERE factory = '{{ factory }}'",
            "parameters": [{"name": "factory", "required": true}, "status"],
            "trigger_words": ["工厂", "库存"],
            "synonyms": {"工厂": ["厂区", "基地"]},
            "example_query": "查询深圳工厂的库存",
            "priority": 3
        }));
        assert_eq!(rec.parameters.len(), 2);
        assert!(rec.parameters[0].required);
        assert!(!rec.parameters[1].required);
        assert_eq!(rec.status, RuleStatus::Active);

        let rule = IntentRule::from_record(rec).unwrap();
        assert_eq!(rule.action.kind(), "SQL_QUERY");
        assert_eq!(rule.parameter_names(), vec!["factory", "status"]);
        assert_eq!(rule.required_parameters().collect::<Vec<_>>(), vec!["factory"]);
        assert_eq!(rule.weighted_score(6), 200.0);
        assert_eq!(rule.weighted_score(0), 0.0);
    }

    #[test]
    fn test_json_encoded_fields() {
        let rec = record(json!({
            "intent_name": "批次追溯",
            "action_type": "FUNCTION_CALL",
            "action_target": "batch_trace",
            "parameters": "[{\"name\":\"batch_code\",\"required\":true}]",
            "trigger_words": "[\"批次\",\"追溯\"]",
            "synonyms": "{\"批次\":[\"批号\"]}",
            "priority": "2",
            "status": "ACTIVE"
        }));
        assert_eq!(rec.trigger_words, vec!["批次", "追溯"]);
        assert_eq!(rec.synonyms["批次"], vec!["批号"]);
        assert_eq!(rec.priority, 2);
        assert!(rec.parameters[0].required);
    }

    #[test]
    fn test_comma_separated_triggers() {
        let rec = record(json!({
            "intent_name": "x",
            "action_type": "DATA_QUERY",
            "action_target": "inventory",
            "trigger_words": "库存, 物料，仓库",
            "synonyms": null,
            "parameters": ""
        }));
        assert_eq!(rec.trigger_words, vec!["库存", "物料", "仓库"]);
        assert!(rec.synonyms.is_empty());
        assert!(rec.parameters.is_empty());
        assert_eq!(rec.priority, DEFAULT_PRIORITY);
    }

    #[test]
    fn test_action_parsing() {
        assert!(matches!(
            RuleAction::from_parts("function_call", "inventory_summary"),
            Ok(RuleAction::FunctionCall { .. })
        ));
        assert!(matches!(
            RuleAction::from_parts("HTTP_CALL", "x"),
            Err(NlpError::UnsupportedAction(_))
        ));
        assert!(RuleAction::from_parts("DATA_QUERY", "  ").is_err());
        assert!(matches!(
            RuleAction::from_parts("SQL_QUERY", "SELECT 1 {% if a %}"),
            Err(NlpError::Template(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_records() {
        let base = json!({
            "intent_name": "x",
            "action_type": "SQL_QUERY",
            "action_target": "SELECT 1",
        });

        let mut zero = base.clone();
        zero["priority"] = json!(0);
        assert!(IntentRule::from_record(record(zero)).is_err());

        let mut nameless = base.clone();
        nameless["intent_name"] = json!("  ");
        assert!(IntentRule::from_record(record(nameless)).is_err());

        let mut bad_template = base.clone();
        bad_template["action_target"] = json!("SELECT {{ a b }}");
        assert!(matches!(
            IntentRule::from_record(record(bad_template)),
            Err(NlpError::RuleLoad(_))
        ));

        let mut bad_regex = base;
        bad_regex["parameters"] = json!([
            {"name": "p", "extractors": [{"type": "regex", "pattern": "(unclosed"}]}
        ]);
        assert!(matches!(
            IntentRule::from_record(record(bad_regex)),
            Err(NlpError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_trigger_words_are_trimmed_and_deduplicated() {
        let rule = IntentRule::from_record(record(json!({
            "intent_name": "x",
            "action_type": "DATA_QUERY",
            "action_target": "inventory",
            "trigger_words": [" 库存", "库存", ""],
        })))
        .unwrap();
        assert_eq!(rule.trigger_words, vec!["库存"]);
    }

    #[test]
    fn test_summary_hides_sql() {
        let rule = IntentRule::from_record(record(json!({
            "intent_name": "x",
            "action_type": "SQL_QUERY",
            "action_target": "SELECT 1",
            "status": "inactive"
        })))
        .unwrap();
        assert!(!rule.is_active());
        let summary = rule.summary();
        assert_eq!(summary.action_target, None);
        assert_eq!(summary.action_type, "SQL_QUERY");
    }
}
