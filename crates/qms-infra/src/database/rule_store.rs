//! Intent rules stored in the `nlp_intent_rules` table.

use async_trait::async_trait;
use qms_nlp::{NlpError, RuleStore};
use serde_json::Value;
use sqlx::mysql::MySqlPool;
use tracing::debug;

use super::row::row_to_json;
use crate::timeout::{TimeoutOrError, TimeoutPolicy};

const RULES_QUERY: &str = "SELECT intent_name, description, action_type, action_target, \
     parameters, trigger_words, synonyms, example_query, priority, status \
     FROM nlp_intent_rules ORDER BY priority ASC, intent_name ASC";

/// Loads rule records from MySQL.
///
/// JSON columns may come back as native JSON or as text; the record
/// deserializer accepts both.
#[derive(Debug, Clone)]
pub struct SqlRuleStore {
    pool: MySqlPool,
    timeouts: TimeoutPolicy,
}

impl SqlRuleStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            pool,
            timeouts: TimeoutPolicy::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutPolicy) -> Self {
        self.timeouts = timeouts;
        self
    }
}

#[async_trait]
impl RuleStore for SqlRuleStore {
    fn name(&self) -> &str {
        "database"
    }

    async fn load_records(&self) -> qms_nlp::Result<Vec<Value>> {
        let rows = self
            .timeouts
            .run_query("load_intent_rules", sqlx::query(RULES_QUERY).fetch_all(&self.pool))
            .await
            .map_err(|e| match e {
                TimeoutOrError::Timeout(t) => NlpError::store(t.to_string()),
                TimeoutOrError::Error(err) => NlpError::store(err.to_string()),
            })?;

        debug!(count = rows.len(), "Fetched intent rule rows");
        Ok(rows.iter().map(|row| Value::Object(row_to_json(row))).collect())
    }
}
