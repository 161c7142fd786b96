//! Query execution errors.

use qms_core::DataSource;
use serde::Serialize;
use thiserror::Error;

/// Why one tier could not answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierFailure {
    pub tier: DataSource,
    pub error: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("{0} tier not configured")]
    NotConfigured(DataSource),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Query timed out: {0}")]
    Timeout(String),

    #[error("Rejected statement: {0}")]
    Rejected(String),

    #[error("No data for collection '{0}'")]
    NoData(String),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("All tiers failed: {}", format_failures(.0))]
    AllTiersFailed(Vec<TierFailure>),
}

fn format_failures(failures: &[TierFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.tier, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

impl QueryError {
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn no_data(collection: impl Into<String>) -> Self {
        Self::NoData(collection.into())
    }

    pub fn unknown_collection(name: impl Into<String>) -> Self {
        Self::UnknownCollection(name.into())
    }
}

impl From<QueryError> for qms_core::AppError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Rejected(msg) => qms_core::AppError::validation(msg),
            QueryError::UnknownCollection(msg) => qms_core::AppError::not_found(msg),
            other => qms_core::AppError::unavailable(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_tiers_failed_message() {
        let err = QueryError::AllTiersFailed(vec![
            TierFailure {
                tier: DataSource::Database,
                error: "database tier not configured".into(),
            },
            TierFailure {
                tier: DataSource::Memory,
                error: "No data for collection 'inventory'".into(),
            },
        ]);
        assert_eq!(
            err.to_string(),
            "All tiers failed: database: database tier not configured; memory: No data for collection 'inventory'"
        );
    }
}
