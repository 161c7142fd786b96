//! Template validation errors

use thiserror::Error;

/// A template that cannot be rendered reliably.
///
/// Positions are byte offsets into the template source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unterminated '{delimiter}' starting at byte {position}")]
    Unterminated {
        delimiter: &'static str,
        position: usize,
    },

    #[error("Invalid expression '{expression}' at byte {position}: expected a bare identifier")]
    InvalidExpression { expression: String, position: usize },

    #[error("Unknown tag '{tag}' at byte {position}")]
    UnknownTag { tag: String, position: usize },

    #[error("Nested if block '{name}' at byte {position}")]
    NestedBlock { name: String, position: usize },

    #[error("endif without matching if at byte {position}")]
    UnmatchedEndif { position: usize },

    #[error("if block '{name}' opened at byte {position} is never closed")]
    UnclosedBlock { name: String, position: usize },
}

/// Result type for template operations
pub type Result<T> = std::result::Result<T, TemplateError>;
