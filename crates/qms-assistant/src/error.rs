//! Assistant error types

use qms_nlp::NlpError;
use qms_query::QueryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("NLP error: {0}")]
    Nlp(#[from] NlpError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Missing parameter: {0}")]
    MissingParameter(String),
}

impl AssistantError {
    pub fn unknown_function(name: impl Into<String>) -> Self {
        Self::UnknownFunction(name.into())
    }

    pub fn missing_parameter(name: impl Into<String>) -> Self {
        Self::MissingParameter(name.into())
    }
}

impl From<AssistantError> for qms_core::AppError {
    fn from(err: AssistantError) -> Self {
        match err {
            AssistantError::Nlp(e) => e.into(),
            AssistantError::Query(e) => e.into(),
            AssistantError::UnknownFunction(name) => qms_core::AppError::not_found(name),
            AssistantError::MissingParameter(name) => qms_core::AppError::validation(name),
        }
    }
}

pub type Result<T> = std::result::Result<T, AssistantError>;
