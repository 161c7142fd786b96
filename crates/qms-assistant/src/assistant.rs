//! The question-to-answer pipeline.

use qms_core::{AssistantConfig, AssistantResponse, DataSource, QueryContext};
use qms_nlp::{
    IntentMatcher, IntentRule, NlpEngine, NlpEngineImpl, NlpError, RuleAction, RuleCatalog,
    RuleSummary, Understanding,
};
use qms_infra::TimeoutPolicy;
use qms_query::{
    Collection, FormatContext, QueryExecutor, QueryResult, ResponseFormatter, SnapshotCounts,
    SnapshotStore, SyncPayload,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::functions::{FunctionContext, FunctionRegistry};

/// Display names for parameter keys in prompts.
const PARAMETER_LABELS: &[(&str, &str)] = &[
    ("factory", "工厂"),
    ("warehouse", "仓库"),
    ("supplier", "供应商"),
    ("material", "物料"),
    ("status", "状态"),
    ("test_result", "检验结果"),
    ("batch_code", "批次号"),
    ("project", "项目"),
];

const FALLBACK_MESSAGE: &str = "抱歉，我没有理解您的问题。您可以尝试这样问：";
const DEGRADED_MESSAGE: &str = "查询服务暂时降级，请稍后重试";

fn parameter_label(name: &str) -> &str {
    PARAMETER_LABELS
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, label)| *label)
        .unwrap_or(name)
}

/// Builds a [`QueryAssistant`].
///
/// Rules whose action cannot run here (an unregistered function or an
/// unknown collection) are moved to the catalog's rejected list on `build`.
pub struct AssistantBuilder {
    catalog: RuleCatalog,
    executor: Option<QueryExecutor>,
    functions: FunctionRegistry,
    config: AssistantConfig,
}

impl AssistantBuilder {
    pub fn new(catalog: RuleCatalog) -> Self {
        Self {
            catalog,
            executor: None,
            functions: FunctionRegistry::with_defaults(),
            config: AssistantConfig::default(),
        }
    }

    pub fn with_executor(mut self, executor: QueryExecutor) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    pub fn with_config(mut self, config: AssistantConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> QueryAssistant {
        let mut catalog = self.catalog;
        let functions = self.functions;
        catalog.exclude(|rule| unsupported_reason(rule, &functions));

        let catalog = Arc::new(catalog);
        let nlp = NlpEngineImpl::new(catalog.clone())
            .with_matcher(IntentMatcher::new(self.config.min_match_score));
        let executor = self.executor.unwrap_or_else(|| {
            QueryExecutor::new(None, TimeoutPolicy::default(), Arc::new(SnapshotStore::new()))
        });

        info!(
            rules = catalog.len(),
            rejected = catalog.rejected().len(),
            origin = catalog.origin(),
            functions = ?functions.names(),
            "Query assistant ready"
        );

        QueryAssistant {
            nlp: Arc::new(nlp),
            catalog,
            executor,
            formatter: ResponseFormatter::new(self.config.preview_rows),
            functions,
            suggestion_count: self.config.suggestion_count,
        }
    }
}

fn unsupported_reason(rule: &IntentRule, functions: &FunctionRegistry) -> Option<String> {
    match &rule.action {
        RuleAction::SqlQuery { .. } => None,
        RuleAction::FunctionCall { name } if !functions.contains(name) => {
            Some(format!("unsupported function '{}'", name))
        }
        RuleAction::FunctionCall { .. } => None,
        RuleAction::DataQuery { name } => name
            .parse::<Collection>()
            .err()
            .map(|_| format!("unknown collection '{}'", name)),
    }
}

/// Answers quality-management questions.
///
/// `process_query` never fails: every outcome, including no match, missing
/// parameters and unavailable data, is a response object.
pub struct QueryAssistant {
    nlp: Arc<dyn NlpEngine>,
    catalog: Arc<RuleCatalog>,
    executor: QueryExecutor,
    formatter: ResponseFormatter,
    functions: FunctionRegistry,
    suggestion_count: usize,
}

impl QueryAssistant {
    pub fn builder(catalog: RuleCatalog) -> AssistantBuilder {
        AssistantBuilder::new(catalog)
    }

    #[instrument(
        skip(self, context),
        fields(session_id = context.session_id.as_deref().unwrap_or("-"))
    )]
    pub async fn process_query(&self, text: &str, context: &QueryContext) -> AssistantResponse {
        let understanding = match self.nlp.understand(text).await {
            Ok(u) => u,
            Err(NlpError::Validation(msg)) => {
                return AssistantResponse::failure(
                    json!({ "message": msg.clone() }),
                    DataSource::Validation,
                    msg,
                );
            }
            Err(e) => {
                warn!(error = %e, "Language understanding failed");
                return self.degraded(None, e.to_string());
            }
        };

        let Some(matched) = understanding.matched.as_ref() else {
            debug!("No intent matched");
            return self.fallback();
        };
        let rule = matched.rule.clone();
        info!(
            intent = %rule.name,
            score = matched.score,
            parameters = understanding.parameters.len(),
            "Intent identified"
        );

        if !understanding.missing.is_empty() {
            return self.missing_parameters(&rule, &understanding);
        }

        match self.run_action(&rule, &understanding, context).await {
            Ok(result) => {
                let formatted = self
                    .formatter
                    .format(&result.rows, FormatContext::new(&rule.name, result.source));
                AssistantResponse::success(
                    json!({
                        "summary": formatted.summary,
                        "structured": formatted.structured,
                        "parameters": understanding.parameters,
                    }),
                    result.source,
                    rule.name.clone(),
                )
            }
            Err(e) => {
                warn!(intent = %rule.name, error = %e, "Query could not be answered");
                self.degraded(Some(&rule.name), e.to_string())
            }
        }
    }

    async fn run_action(
        &self,
        rule: &IntentRule,
        understanding: &Understanding,
        context: &QueryContext,
    ) -> Result<QueryResult> {
        let params = &understanding.parameters;
        let result = match &rule.action {
            RuleAction::SqlQuery { template } => {
                let sql = template.render(&params.to_json_map());
                debug!(sql = %sql, "Rendered rule template");
                let bind_order: Vec<String> =
                    rule.parameter_names().into_iter().map(String::from).collect();
                self.executor.execute(&sql, params, &bind_order).await?
            }
            RuleAction::DataQuery { name } => {
                let collection: Collection = name.parse()?;
                self.executor.query_collection(collection, params).await?
            }
            RuleAction::FunctionCall { name } => {
                let ctx = FunctionContext {
                    executor: &self.executor,
                    params,
                    query: context,
                };
                self.functions.call(name, ctx).await?
            }
        };
        Ok(result)
    }

    fn fallback(&self) -> AssistantResponse {
        let suggestions = self.catalog.example_queries(self.suggestion_count);
        AssistantResponse::failure(
            json!({
                "message": FALLBACK_MESSAGE,
                "suggestions": suggestions,
            }),
            DataSource::Fallback,
            "no intent matched",
        )
    }

    fn missing_parameters(&self, rule: &IntentRule, understanding: &Understanding) -> AssistantResponse {
        let labels: Vec<&str> = understanding
            .missing
            .iter()
            .map(|name| parameter_label(name))
            .collect();
        let mut message = format!("请补充以下信息：{}", labels.join("、"));
        if let Some(example) = &rule.example_query {
            message.push_str(&format!("。例如：{}", example));
        }

        AssistantResponse::failure(
            json!({
                "message": message,
                "missing": understanding.missing,
                "example_query": rule.example_query,
            }),
            DataSource::Validation,
            format!("missing required parameter(s): {}", understanding.missing.join(", ")),
        )
        .with_intent(rule.name.clone())
    }

    fn degraded(&self, intent: Option<&str>, error: String) -> AssistantResponse {
        let response = AssistantResponse::failure(
            json!({ "message": DEGRADED_MESSAGE }),
            DataSource::Unavailable,
            error,
        );
        match intent {
            Some(name) => response.with_intent(name),
            None => response,
        }
    }

    /// Replace the in-memory dataset used by the snapshot tier.
    pub fn sync_dataset(&self, payload: SyncPayload) -> SnapshotCounts {
        self.executor.snapshot().sync(payload)
    }

    pub fn rules(&self) -> Vec<RuleSummary> {
        self.catalog.summaries()
    }

    pub fn catalog(&self) -> &Arc<RuleCatalog> {
        &self.catalog
    }

    pub fn executor(&self) -> &QueryExecutor {
        &self.executor
    }
}
