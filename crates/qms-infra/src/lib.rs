//! # QMS Infra
//!
//! Infrastructure adapters for the QMS assistant: the MySQL pool, the
//! `nlp_intent_rules` rule store, query timeouts and health checks.

pub mod database;
pub mod health;
pub mod timeout;

pub use database::{connect_optional, create_pool, row_to_json, SqlRuleStore};
pub use health::{DatabaseHealthCheck, HealthCheck, HealthStatus};
pub use timeout::{TimeoutError, TimeoutOrError, TimeoutPolicy};

pub use sqlx::mysql::MySqlPool;

#[derive(Debug, thiserror::Error)]
pub enum InfraError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl InfraError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

impl From<InfraError> for qms_core::AppError {
    fn from(err: InfraError) -> Self {
        match err {
            InfraError::Configuration(msg) => qms_core::AppError::configuration(msg),
            other => qms_core::AppError::unavailable(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, InfraError>;
