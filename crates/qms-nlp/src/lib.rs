//! # QMS NLP
//!
//! Rule-based language understanding for the QMS assistant.
//!
//! This crate turns a free-text quality-management question into a selected
//! intent rule plus a flat parameter map. Matching is deterministic keyword
//! scoring; there is no statistical model.
//!
//! ## Features
//!
//! - **Rule catalog**: validated, immutable rules loaded from a file, a
//!   database table, or the built-in set
//! - **Parameter extraction**: ordered keyword tables, aliases, synonym
//!   fallbacks and batch-code detectors
//! - **Intent matching**: trigger and synonym hits weighted by rule priority
//!
//! ## Example
//!
//! ```rust,no_run
//! use qms_nlp::{NlpEngine, NlpEngineImpl, RuleCatalog};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = NlpEngineImpl::new(Arc::new(RuleCatalog::builtin()));
//!
//!     let understanding = engine.understand("深圳工厂风险库存").await?;
//!     if let Some(rule) = understanding.rule() {
//!         println!("Intent: {}, parameters: {:?}", rule.name, understanding.parameters);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod builtin;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod matcher;
pub mod rule;
pub mod store;
pub mod vocab;

use async_trait::async_trait;
use qms_core::ExtractedParameters;

pub use catalog::{RejectedRule, RuleCatalog};
pub use engine::{NlpEngineImpl, Understanding};
pub use error::{NlpError, Result};
pub use extractor::{
    AliasLookup, LiteralLookup, ParameterCategory, ParameterExtractor, RegexDetector,
    RuleExtractor, ValueExtractor,
};
pub use matcher::{IntentMatcher, MatchResult, RuleScore, DEFAULT_MIN_SCORE};
pub use rule::{
    ExtractorSpec, IntentRule, ParameterDefinition, ParameterSpec, RuleAction, RuleRecord,
    RuleStatus, RuleSummary,
};
pub use store::{FileRuleStore, RuleStore, StaticRuleStore};

/// Language understanding over a rule catalog.
#[async_trait]
pub trait NlpEngine: Send + Sync {
    /// Select the best matching rule, or `None` when nothing clears the
    /// threshold.
    async fn identify_intent(&self, query: &str) -> Result<Option<MatchResult>>;

    /// Extract parameters; with a rule, its declared extractors fill gaps
    /// left by the standard categories.
    async fn extract_parameters(
        &self,
        query: &str,
        rule: Option<&IntentRule>,
    ) -> Result<ExtractedParameters>;

    /// Match, extract and check required parameters in one pass.
    async fn understand(&self, query: &str) -> Result<Understanding>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_nlp_engine_basic() {
        let engine = NlpEngineImpl::new(Arc::new(RuleCatalog::builtin()));
        let matched = engine.identify_intent("BOE供应商库存").await.unwrap();
        assert_eq!(matched.unwrap().rule.name, "BOE供应商库存查询");
    }

    #[tokio::test]
    async fn test_engine_as_trait_object() {
        let engine: Arc<dyn NlpEngine> = Arc::new(NlpEngineImpl::new(Arc::new(RuleCatalog::builtin())));
        let params = engine.extract_parameters("深圳工厂风险库存", None).await.unwrap();
        assert_eq!(params.len(), 2);
    }
}
