//! NLP-specific error types

use qms_template::TemplateError;
use thiserror::Error;

/// NLP-specific error types
#[derive(Error, Debug)]
pub enum NlpError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Rule load error: {0}")]
    RuleLoad(String),

    #[error("Unsupported action type: {0}")]
    UnsupportedAction(String),

    #[error("Invalid extractor pattern: {0}")]
    InvalidPattern(String),

    #[error("Template syntax error: {0}")]
    Template(#[from] TemplateError),

    #[error("Rule store error: {0}")]
    Store(String),
}

impl NlpError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn rule_load(msg: impl Into<String>) -> Self {
        Self::RuleLoad(msg.into())
    }

    pub fn unsupported_action(msg: impl Into<String>) -> Self {
        Self::UnsupportedAction(msg.into())
    }

    pub fn invalid_pattern(msg: impl Into<String>) -> Self {
        Self::InvalidPattern(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }
}

/// Result type for NLP operations
pub type Result<T> = std::result::Result<T, NlpError>;

// Convert to qms_core AppError
impl From<NlpError> for qms_core::AppError {
    fn from(err: NlpError) -> Self {
        match err {
            NlpError::Validation(msg) => qms_core::AppError::validation(msg),
            NlpError::RuleLoad(msg) => qms_core::AppError::configuration(msg),
            NlpError::UnsupportedAction(msg) => qms_core::AppError::configuration(msg),
            NlpError::InvalidPattern(msg) => qms_core::AppError::configuration(msg),
            NlpError::Template(err) => qms_core::AppError::configuration(err.to_string()),
            NlpError::Store(msg) => qms_core::AppError::unavailable(msg),
        }
    }
}
