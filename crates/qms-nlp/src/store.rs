//! Rule stores.
//!
//! A store yields raw rule records as JSON values; parsing and validation
//! happen in [`RuleCatalog`](crate::RuleCatalog) so a bad record only costs
//! that one rule.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{NlpError, Result};

/// Backing store for intent rules.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// Load every rule record, active or not.
    async fn load_records(&self) -> Result<Vec<Value>>;
}

/// Rules from a JSON or YAML file.
///
/// The document is either a list of records or an object with a `rules`
/// list. Files ending in `.yaml`/`.yml` are read as YAML, anything else as
/// JSON.
#[derive(Debug, Clone)]
pub struct FileRuleStore {
    path: PathBuf,
}

impl FileRuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_yaml(&self) -> bool {
        matches!(
            self.path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        )
    }

    /// Parse file contents into rule records.
    pub fn parse(&self, contents: &str) -> Result<Vec<Value>> {
        let document: Value = if self.is_yaml() {
            serde_yaml::from_str(contents)
                .map_err(|e| NlpError::rule_load(format!("{}: {}", self.path.display(), e)))?
        } else {
            serde_json::from_str(contents)
                .map_err(|e| NlpError::rule_load(format!("{}: {}", self.path.display(), e)))?
        };
        records_from_document(document)
    }
}

fn records_from_document(document: Value) -> Result<Vec<Value>> {
    match document {
        Value::Array(records) => Ok(records),
        Value::Object(mut map) => match map.remove("rules") {
            Some(Value::Array(records)) => Ok(records),
            _ => Err(NlpError::rule_load(
                "expected a list of rules or an object with a 'rules' list",
            )),
        },
        Value::Null => Ok(Vec::new()),
        _ => Err(NlpError::rule_load("expected a list of rules")),
    }
}

#[async_trait]
impl RuleStore for FileRuleStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn load_records(&self) -> Result<Vec<Value>> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| NlpError::store(format!("{}: {}", self.path.display(), e)))?;
        let records = self.parse(&contents)?;
        debug!(path = %self.path.display(), count = records.len(), "Read rule file");
        Ok(records)
    }
}

/// Fixed in-process records.
#[derive(Debug, Clone, Default)]
pub struct StaticRuleStore {
    records: Vec<Value>,
}

impl StaticRuleStore {
    pub fn new(records: Vec<Value>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl RuleStore for StaticRuleStore {
    fn name(&self) -> &str {
        "static"
    }

    async fn load_records(&self) -> Result<Vec<Value>> {
        Ok(self.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("qms-nlp-{}-{}", std::process::id(), name));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_json_file() {
        let path = temp_file(
            "rules.json",
            r#"[{"intent_name": "a", "action_type": "DATA_QUERY", "action_target": "inventory"}]"#,
        );
        let records = FileRuleStore::new(&path).load_records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["intent_name"], "a");
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_yaml_file_with_rules_key() {
        let path = temp_file(
            "rules.yaml",
            "rules:\n  - intent_name: a\n    action_type: DATA_QUERY\n    action_target: inventory\n    trigger_words: [库存]\n",
        );
        let records = FileRuleStore::new(&path).load_records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["trigger_words"][0], "库存");
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_missing_file() {
        let store = FileRuleStore::new("/nonexistent/qms/rules.json");
        assert!(matches!(store.load_records().await, Err(NlpError::Store(_))));
    }

    #[test]
    fn test_rejects_scalar_document() {
        let store = FileRuleStore::new("rules.json");
        assert!(store.parse("42").is_err());
        assert!(store.parse(r#"{"other": []}"#).is_err());
        assert!(store.parse("null").unwrap().is_empty());
    }
}
