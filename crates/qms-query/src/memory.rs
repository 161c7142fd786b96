//! Snapshot tier.

use async_trait::async_trait;
use qms_core::{DataSource, Row};
use std::sync::Arc;
use tracing::debug;

use crate::error::{QueryError, Result};
use crate::filter::RowFilter;
use crate::snapshot::SnapshotStore;
use crate::tier::{QueryAttempt, QueryRequest};

/// Second tier: the last synced dataset, filtered by the request parameters.
#[derive(Debug, Clone)]
pub struct MemoryTier {
    snapshot: Arc<SnapshotStore>,
}

impl MemoryTier {
    pub fn new(snapshot: Arc<SnapshotStore>) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl QueryAttempt for MemoryTier {
    fn source(&self) -> DataSource {
        DataSource::Memory
    }

    async fn attempt(&self, request: &QueryRequest) -> Result<Vec<Row>> {
        let collection = request.collection.ok_or_else(|| {
            QueryError::unknown_collection(request.sql.clone().unwrap_or_default())
        })?;

        let snapshot = self.snapshot.current();
        let rows = snapshot.collection(collection);
        if rows.is_empty() {
            return Err(QueryError::no_data(collection.as_str()));
        }

        let filtered = RowFilter::from_params(&request.params).apply(rows);
        debug!(
            collection = %collection,
            total = rows.len(),
            matched = filtered.len(),
            "Answered from snapshot"
        );
        Ok(filtered)
    }
}
