//! Query executor: wires the tiers into fallback chains.

use qms_core::ExtractedParameters;
use qms_infra::{MySqlPool, TimeoutPolicy};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::chain::{FallbackChain, QueryResult};
use crate::database::DatabaseTier;
use crate::error::Result;
use crate::memory::MemoryTier;
use crate::mock::MockTier;
use crate::snapshot::{Collection, SnapshotStore};
use crate::tier::{QueryAttempt, QueryRequest};

/// Runs rule SQL against database, then snapshot, then mock data; and
/// collection queries against snapshot, then mock data.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    sql_chain: FallbackChain,
    collection_chain: FallbackChain,
    snapshot: Arc<SnapshotStore>,
}

impl QueryExecutor {
    pub fn new(
        pool: Option<MySqlPool>,
        timeouts: TimeoutPolicy,
        snapshot: Arc<SnapshotStore>,
    ) -> Self {
        let database = Arc::new(DatabaseTier::new(pool).with_timeouts(timeouts));
        let memory = Arc::new(MemoryTier::new(snapshot.clone()));
        Self::with_tiers(database, memory, Arc::new(MockTier::new()), snapshot)
    }

    /// Build from explicit tiers.
    pub fn with_tiers(
        database: Arc<dyn QueryAttempt>,
        memory: Arc<dyn QueryAttempt>,
        mock: Arc<dyn QueryAttempt>,
        snapshot: Arc<SnapshotStore>,
    ) -> Self {
        let sql_chain = FallbackChain::new()
            .with_attempt(database)
            .with_attempt(memory.clone())
            .with_attempt(mock.clone());
        let collection_chain = FallbackChain::new().with_attempt(memory).with_attempt(mock);

        info!(
            sql_tiers = ?sql_chain.sources(),
            collection_tiers = ?collection_chain.sources(),
            "Query executor ready"
        );

        Self {
            sql_chain,
            collection_chain,
            snapshot,
        }
    }

    /// Run rendered SQL. `bind_order` names the parameters bound to
    /// positional placeholders.
    #[instrument(skip(self, sql, params, bind_order))]
    pub async fn execute(
        &self,
        sql: &str,
        params: &ExtractedParameters,
        bind_order: &[String],
    ) -> Result<QueryResult> {
        let request = QueryRequest::sql(sql, params.clone()).with_bind_order(bind_order.to_vec());
        self.sql_chain.run(&request).await
    }

    /// Filter a whole collection by the parameters.
    #[instrument(skip(self, params), fields(collection = %collection))]
    pub async fn query_collection(
        &self,
        collection: Collection,
        params: &ExtractedParameters,
    ) -> Result<QueryResult> {
        let request = QueryRequest::collection(collection, params.clone());
        self.collection_chain.run(&request).await
    }

    pub fn snapshot(&self) -> &Arc<SnapshotStore> {
        &self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use crate::snapshot::SyncPayload;
    use crate::tier::MockQueryAttempt;
    use qms_core::DataSource;
    use serde_json::json;

    fn unused(source: DataSource) -> Arc<dyn QueryAttempt> {
        let mut mock = MockQueryAttempt::new();
        mock.expect_source().return_const(source);
        mock.expect_attempt().times(0);
        Arc::new(mock)
    }

    #[tokio::test]
    async fn test_unconfigured_database_falls_back_to_snapshot() {
        let snapshot = Arc::new(SnapshotStore::new());
        snapshot.sync(SyncPayload {
            inventory: Some(vec![json!({"factory": "深圳工厂", "quantity": 10})]),
            ..Default::default()
        });
        let executor = QueryExecutor::new(None, TimeoutPolicy::default(), snapshot);

        let result = executor
            .execute("SELECT * FROM inventory", &ExtractedParameters::new(), &[])
            .await
            .unwrap();
        assert_eq!(result.source, DataSource::Memory);
        assert_eq!(result.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_snapshot_falls_back_to_mock() {
        let executor =
            QueryExecutor::new(None, TimeoutPolicy::default(), Arc::new(SnapshotStore::new()));
        let result = executor
            .execute("SELECT * FROM lab_tests", &ExtractedParameters::new(), &[])
            .await
            .unwrap();
        assert_eq!(result.source, DataSource::Mock);
        assert!(!result.is_empty());
    }

    #[tokio::test]
    async fn test_collection_query_skips_database() {
        let mut memory = MockQueryAttempt::new();
        memory.expect_source().return_const(DataSource::Memory);
        memory
            .expect_attempt()
            .withf(|req| req.sql.is_none() && req.collection == Some(Collection::Inventory))
            .times(1)
            .returning(|_| Err(QueryError::no_data("inventory")));

        let mut mock = MockQueryAttempt::new();
        mock.expect_source().return_const(DataSource::Mock);
        mock.expect_attempt().times(1).returning(|_| Ok(Vec::new()));

        let executor = QueryExecutor::with_tiers(
            unused(DataSource::Database),
            Arc::new(memory),
            Arc::new(mock),
            Arc::new(SnapshotStore::new()),
        );
        let result = executor
            .query_collection(Collection::Inventory, &ExtractedParameters::new())
            .await
            .unwrap();
        assert_eq!(result.source, DataSource::Mock);
    }

    #[tokio::test]
    async fn test_bind_order_reaches_the_database_tier() {
        let mut database = MockQueryAttempt::new();
        database.expect_source().return_const(DataSource::Database);
        database
            .expect_attempt()
            .withf(|req| req.bind_order == vec!["supplier".to_string()])
            .times(1)
            .returning(|_| Ok(Vec::new()));

        let executor = QueryExecutor::with_tiers(
            Arc::new(database),
            unused(DataSource::Memory),
            unused(DataSource::Mock),
            Arc::new(SnapshotStore::new()),
        );
        let params: ExtractedParameters = vec![("supplier", "BOE")].into_iter().collect();
        let result = executor
            .execute(
                "SELECT * FROM inventory WHERE supplier_name = ?",
                &params,
                &["supplier".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(result.source, DataSource::Database);
    }
}
