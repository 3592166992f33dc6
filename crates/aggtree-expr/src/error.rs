//! Error types for aggregate expression parsing.

use thiserror::Error;

/// Errors that can occur while parsing or compiling aggregate expressions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    /// The input matches no expression form, or names a function/field
    /// combination the catalog does not allow.
    #[error("\"{input}\" is not a valid aggregate expression.")]
    InvalidExpression {
        /// The rejected input, as given.
        input: String,
        /// Byte offset where parsing stopped.
        position: usize,
    },

    /// Empty (or whitespace-only) input provided.
    #[error("empty aggregate expression")]
    EmptyExpression,

    /// Calculations are nested deeper than the parser allows.
    #[error("aggregate expression nested deeper than {max_depth} levels")]
    TooDeep {
        /// The configured nesting limit.
        max_depth: usize,
    },
}

/// Result type for aggregate expression operations.
pub type ExprResult<T> = std::result::Result<T, ExprError>;
