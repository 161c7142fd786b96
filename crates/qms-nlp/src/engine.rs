//! NLP engine implementation.
//!
//! Runs intent matching and parameter extraction over one query and reports
//! which of the selected rule's required parameters are missing.

use async_trait::async_trait;
use qms_core::ExtractedParameters;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::catalog::RuleCatalog;
use crate::error::{NlpError, Result};
use crate::extractor::ParameterExtractor;
use crate::matcher::{IntentMatcher, MatchResult};
use crate::rule::IntentRule;
use crate::NlpEngine;

const MAX_QUERY_CHARS: usize = 1000;

/// Outcome of understanding one query.
#[derive(Debug, Clone)]
pub struct Understanding {
    /// The preprocessed query text.
    pub query: String,
    pub matched: Option<MatchResult>,
    pub parameters: ExtractedParameters,
    /// Required parameters of the matched rule that were not found.
    pub missing: Vec<String>,
}

impl Understanding {
    pub fn rule(&self) -> Option<&Arc<IntentRule>> {
        self.matched.as_ref().map(|m| &m.rule)
    }

    pub fn is_complete(&self) -> bool {
        self.matched.is_some() && self.missing.is_empty()
    }
}

/// Rule-based NLP engine over an immutable catalog.
pub struct NlpEngineImpl {
    catalog: Arc<RuleCatalog>,
    extractor: ParameterExtractor,
    matcher: IntentMatcher,
}

impl NlpEngineImpl {
    pub fn new(catalog: Arc<RuleCatalog>) -> Self {
        info!(
            rules = catalog.len(),
            origin = catalog.origin(),
            "Initializing NLP engine"
        );
        Self {
            catalog,
            extractor: ParameterExtractor::new(),
            matcher: IntentMatcher::default(),
        }
    }

    pub fn with_matcher(mut self, matcher: IntentMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_extractor(mut self, extractor: ParameterExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn catalog(&self) -> &Arc<RuleCatalog> {
        &self.catalog
    }

    pub fn matcher(&self) -> &IntentMatcher {
        &self.matcher
    }

    /// Validates the query before processing.
    fn validate_query(&self, query: &str) -> Result<()> {
        if query.trim().is_empty() {
            return Err(NlpError::validation("Query cannot be empty"));
        }

        if query.chars().count() > MAX_QUERY_CHARS {
            return Err(NlpError::validation(format!(
                "Query is too long (max {} characters)",
                MAX_QUERY_CHARS
            )));
        }

        Ok(())
    }

    /// Trim and collapse internal whitespace.
    fn preprocess_query(&self, query: &str) -> String {
        query.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

#[async_trait]
impl NlpEngine for NlpEngineImpl {
    #[instrument(skip(self), fields(query_len = query.len()))]
    async fn identify_intent(&self, query: &str) -> Result<Option<MatchResult>> {
        self.validate_query(query)?;
        let processed = self.preprocess_query(query);
        Ok(self.matcher.identify(&processed, &self.catalog))
    }

    #[instrument(skip(self, rule), fields(query_len = query.len()))]
    async fn extract_parameters(
        &self,
        query: &str,
        rule: Option<&IntentRule>,
    ) -> Result<ExtractedParameters> {
        self.validate_query(query)?;
        let processed = self.preprocess_query(query);
        let params = match rule {
            Some(rule) => self.extractor.extract_for_rule(&processed, rule),
            None => self.extractor.extract(&processed),
        };
        debug!(count = params.len(), "Extracted parameters");
        Ok(params)
    }

    #[instrument(skip(self), fields(query_len = query.len()))]
    async fn understand(&self, query: &str) -> Result<Understanding> {
        self.validate_query(query)?;
        let processed = self.preprocess_query(query);

        let matched = self.matcher.identify(&processed, &self.catalog);
        let (parameters, missing) = match &matched {
            Some(m) => {
                let params = self.extractor.extract_for_rule(&processed, &m.rule);
                let missing = ParameterExtractor::missing_required(&m.rule, &params);
                (params, missing)
            }
            None => (self.extractor.extract(&processed), Vec::new()),
        };

        info!(
            intent = matched.as_ref().map(|m| m.rule.name.as_str()).unwrap_or("none"),
            parameters = parameters.len(),
            missing = missing.len(),
            "Query understood"
        );

        Ok(Understanding {
            query: processed,
            matched,
            parameters,
            missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> NlpEngineImpl {
        NlpEngineImpl::new(Arc::new(RuleCatalog::builtin()))
    }

    #[tokio::test]
    async fn test_understand_factory_status() {
        let understanding = engine().understand("深圳工厂风险库存").await.unwrap();
        assert_eq!(understanding.rule().unwrap().name, "工厂库存查询");
        assert_eq!(understanding.parameters.get("factory"), Some("深圳工厂"));
        assert_eq!(understanding.parameters.get("status"), Some("风险"));
        assert!(understanding.is_complete());
    }

    #[tokio::test]
    async fn test_understand_missing_parameter() {
        let understanding = engine().understand("查询批次的信息").await.unwrap();
        assert_eq!(understanding.rule().unwrap().name, "批次追溯");
        assert_eq!(understanding.missing, vec!["batch_code"]);
        assert!(!understanding.is_complete());
    }

    #[tokio::test]
    async fn test_understand_no_match() {
        let understanding = engine().understand("随便说点什么").await.unwrap();
        assert!(understanding.matched.is_none());
        assert!(understanding.missing.is_empty());
    }

    #[tokio::test]
    async fn test_query_validation() {
        let engine = engine();
        assert!(matches!(
            engine.understand("   ").await,
            Err(NlpError::Validation(_))
        ));
        let long = "库".repeat(MAX_QUERY_CHARS + 1);
        assert!(engine.understand(&long).await.is_err());
    }

    #[tokio::test]
    async fn test_preprocess_collapses_whitespace() {
        let understanding = engine().understand("  BOE \t供应商\n库存 ").await.unwrap();
        assert_eq!(understanding.query, "BOE 供应商 库存");
        assert_eq!(understanding.rule().unwrap().name, "BOE供应商库存查询");
    }

    #[tokio::test]
    async fn test_custom_threshold() {
        let engine = engine().with_matcher(IntentMatcher::new(1000.0));
        assert!(engine.identify_intent("BOE供应商库存").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_extract_without_rule() {
        let params = engine()
            .extract_parameters("BOE的电池盖", None)
            .await
            .unwrap();
        assert_eq!(params.get("supplier"), Some("BOE"));
        assert_eq!(params.get("material"), Some("电池盖"));
    }
}
