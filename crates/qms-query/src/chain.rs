//! Ordered fallback over query tiers.

use qms_core::{DataSource, Row};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{QueryError, Result, TierFailure};
use crate::tier::{QueryAttempt, QueryRequest};

/// Rows plus the tier that produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub source: DataSource,
}

impl QueryResult {
    pub fn new(rows: Vec<Row>, source: DataSource) -> Self {
        Self { rows, source }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Tries each tier in order; the first success wins.
#[derive(Clone, Default)]
pub struct FallbackChain {
    attempts: Vec<Arc<dyn QueryAttempt>>,
}

impl FallbackChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attempt(mut self, attempt: Arc<dyn QueryAttempt>) -> Self {
        self.attempts.push(attempt);
        self
    }

    pub fn sources(&self) -> Vec<DataSource> {
        self.attempts.iter().map(|a| a.source()).collect()
    }

    pub async fn run(&self, request: &QueryRequest) -> Result<QueryResult> {
        let mut failures = Vec::with_capacity(self.attempts.len());

        for attempt in &self.attempts {
            let source = attempt.source();
            match attempt.attempt(request).await {
                Ok(rows) => {
                    debug!(source = %source, rows = rows.len(), "Tier answered");
                    return Ok(QueryResult::new(rows, source));
                }
                Err(err) => {
                    warn!(source = %source, error = %err, "Tier failed, falling back");
                    failures.push(TierFailure {
                        tier: source,
                        error: err.to_string(),
                    });
                }
            }
        }

        Err(QueryError::AllTiersFailed(failures))
    }
}

impl std::fmt::Debug for FallbackChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackChain")
            .field("sources", &self.sources())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::MockQueryAttempt;
    use qms_core::ExtractedParameters;
    use serde_json::json;

    fn row() -> Row {
        json!({"factory": "深圳工厂"}).as_object().cloned().unwrap()
    }

    fn failing(source: DataSource, err: QueryError) -> Arc<dyn QueryAttempt> {
        let mut mock = MockQueryAttempt::new();
        mock.expect_source().return_const(source);
        mock.expect_attempt()
            .times(1)
            .returning(move |_| Err(err.clone()));
        Arc::new(mock)
    }

    fn answering(source: DataSource, rows: Vec<Row>) -> Arc<dyn QueryAttempt> {
        let mut mock = MockQueryAttempt::new();
        mock.expect_source().return_const(source);
        mock.expect_attempt()
            .times(1)
            .returning(move |_| Ok(rows.clone()));
        Arc::new(mock)
    }

    fn never_called(source: DataSource) -> Arc<dyn QueryAttempt> {
        let mut mock = MockQueryAttempt::new();
        mock.expect_source().return_const(source);
        mock.expect_attempt().times(0);
        Arc::new(mock)
    }

    fn request() -> QueryRequest {
        QueryRequest::sql("SELECT * FROM inventory", ExtractedParameters::new())
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let chain = FallbackChain::new()
            .with_attempt(failing(
                DataSource::Database,
                QueryError::NotConfigured(DataSource::Database),
            ))
            .with_attempt(answering(DataSource::Memory, vec![row()]))
            .with_attempt(never_called(DataSource::Mock));

        let result = chain.run(&request()).await.unwrap();
        assert_eq!(result.source, DataSource::Memory);
        assert_eq!(result.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_rows_are_a_success() {
        let chain = FallbackChain::new()
            .with_attempt(answering(DataSource::Database, Vec::new()))
            .with_attempt(never_called(DataSource::Memory));

        let result = chain.run(&request()).await.unwrap();
        assert_eq!(result.source, DataSource::Database);
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_all_failures_are_collected() {
        let chain = FallbackChain::new()
            .with_attempt(failing(DataSource::Database, QueryError::database("connection refused")))
            .with_attempt(failing(DataSource::Memory, QueryError::no_data("inventory")));

        let err = chain.run(&request()).await.unwrap_err();
        match err {
            QueryError::AllTiersFailed(failures) => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].tier, DataSource::Database);
                assert_eq!(failures[1].tier, DataSource::Memory);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_chain_fails() {
        let err = FallbackChain::new().run(&request()).await.unwrap_err();
        assert_eq!(err, QueryError::AllTiersFailed(Vec::new()));
    }
}
