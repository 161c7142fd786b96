//! The tier abstraction.

use async_trait::async_trait;
use qms_core::{DataSource, ExtractedParameters, Row};

use crate::error::Result;
use crate::snapshot::Collection;

/// What a tier is asked to produce.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    /// Rendered SQL, for rule templates.
    pub sql: Option<String>,
    /// Target collection; derived from `sql` when not given.
    pub collection: Option<Collection>,
    pub params: ExtractedParameters,
    /// Parameter names bound to positional `?` placeholders, in order.
    pub bind_order: Vec<String>,
}

impl QueryRequest {
    pub fn sql(sql: impl Into<String>, params: ExtractedParameters) -> Self {
        let sql = sql.into();
        Self {
            collection: Collection::from_sql(&sql),
            sql: Some(sql),
            params,
            bind_order: Vec::new(),
        }
    }

    pub fn collection(collection: Collection, params: ExtractedParameters) -> Self {
        Self {
            sql: None,
            collection: Some(collection),
            params,
            bind_order: Vec::new(),
        }
    }

    pub fn with_bind_order(mut self, names: Vec<String>) -> Self {
        self.bind_order = names;
        self
    }
}

/// One way of answering a query.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueryAttempt: Send + Sync {
    /// Tag put on rows this tier returns.
    fn source(&self) -> DataSource;

    async fn attempt(&self, request: &QueryRequest) -> Result<Vec<Row>>;
}
