use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A single result row: column name to JSON value.
pub type Row = Map<String, Value>;

/// Which backend (or which non-data outcome) produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Live relational database
    Database,
    /// Synced in-process snapshot
    Memory,
    /// Synthetic rows
    Mock,
    /// No intent matched; suggestions returned instead of data
    Fallback,
    /// A required parameter was missing
    Validation,
    /// Nothing could produce data
    Unavailable,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Memory => "memory",
            Self::Mock => "mock",
            Self::Fallback => "fallback",
            Self::Validation => "validation",
            Self::Unavailable => "unavailable",
        }
    }

    /// True for the tiers that return actual rows.
    pub fn is_data_tier(&self) -> bool {
        matches!(self, Self::Database | Self::Memory | Self::Mock)
    }

    /// True when the data is not live database data.
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Self::Database)
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters extracted from one question.
///
/// One value per key; the first value written for a key is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedParameters(BTreeMap<String, String>);

impl ExtractedParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Insert a value unless the key is already set. Returns whether it was inserted.
    pub fn insert_if_absent(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        if self.0.contains_key(&key) {
            return false;
        }
        self.0.insert(key, value.into());
        true
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parameters as a JSON object, the shape the template renderer consumes.
    pub fn to_json_map(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ExtractedParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.insert_if_absent(k, v);
        }
        params
    }
}

/// Caller-supplied context for one query. Opaque to the pipeline beyond
/// being logged and handed to function actions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryContext {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub business_context: Option<Value>,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_business_context(mut self, context: Value) -> Self {
        self.business_context = Some(context);
        self
    }
}

/// The response returned for every question, successful or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantResponse {
    pub success: bool,
    pub data: Value,
    pub source: DataSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AssistantResponse {
    pub fn success(data: Value, source: DataSource, intent: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            source,
            intent: Some(intent.into()),
            error: None,
        }
    }

    pub fn failure(data: Value, source: DataSource, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data,
            source,
            intent: None,
            error: Some(error.into()),
        }
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    /// The human-readable part of `data`, if any.
    pub fn message(&self) -> Option<&str> {
        match &self.data {
            Value::String(s) => Some(s),
            Value::Object(map) => map
                .get("summary")
                .or_else(|| map.get("message"))
                .and_then(Value::as_str),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_source_serialization() {
        assert_eq!(serde_json::to_string(&DataSource::Memory).unwrap(), "\"memory\"");
        assert_eq!(DataSource::Fallback.to_string(), "fallback");
        assert!(DataSource::Mock.is_data_tier());
        assert!(!DataSource::Validation.is_data_tier());
        assert!(!DataSource::Database.is_degraded());
        assert!(DataSource::Memory.is_degraded());
    }

    #[test]
    fn test_extracted_parameters_first_write_wins() {
        let mut params = ExtractedParameters::new();
        assert!(params.insert_if_absent("factory", "深圳工厂"));
        assert!(!params.insert_if_absent("factory", "重庆工厂"));
        assert_eq!(params.get("factory"), Some("深圳工厂"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_extracted_parameters_json_map() {
        let params: ExtractedParameters =
            vec![("supplier", "BOE"), ("status", "风险")].into_iter().collect();
        let map = params.to_json_map();
        assert_eq!(map.get("supplier"), Some(&json!("BOE")));
        assert_eq!(map.get("status"), Some(&json!("风险")));
    }

    #[test]
    fn test_response_shape() {
        let response = AssistantResponse::success(
            json!({"summary": "共 3 条记录"}),
            DataSource::Memory,
            "库存查询",
        );
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["source"], json!("memory"));
        assert_eq!(value["intent"], json!("库存查询"));
        assert!(value.get("error").is_none());
        assert_eq!(response.message(), Some("共 3 条记录"));
    }

    #[test]
    fn test_failure_response() {
        let response = AssistantResponse::failure(
            json!("服务暂时不可用"),
            DataSource::Unavailable,
            "all tiers failed",
        );
        assert!(!response.success);
        assert!(response.intent.is_none());
        assert_eq!(response.message(), Some("服务暂时不可用"));
    }
}
