//! Query error types
//!
//! Error codes:
//! - HOOPQL_REWRITE_AMBIGUOUS: token not mappable to a known field
//! - HOOPQL_COMPILE_ERROR: text is not valid in the expression language
//! - HOOPQL_EVAL_ERROR: runtime failure against a specific record
//!
//! A missing division baseline is not an error: the grade is simply absent
//! and a BASELINE_UNAVAILABLE event is logged.

use std::fmt;

use thiserror::Error;

/// Machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorCode {
    RewriteAmbiguous,
    CompileError,
    EvalError,
}

impl QueryErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            QueryErrorCode::RewriteAmbiguous => "HOOPQL_REWRITE_AMBIGUOUS",
            QueryErrorCode::CompileError => "HOOPQL_COMPILE_ERROR",
            QueryErrorCode::EvalError => "HOOPQL_EVAL_ERROR",
        }
    }
}

impl fmt::Display for QueryErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised while compiling or evaluating a query
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// Identifier survived the rewrite without becoming an accessor
    #[error("unknown field '{name}'")]
    UnknownField { name: String },

    /// Lexer or parser failure
    #[error("{message} at position {position}")]
    Compile { message: String, position: usize },

    /// Runtime failure against one record
    #[error("{message}")]
    Evaluation { message: String },
}

impl QueryError {
    pub fn compile(message: impl Into<String>, position: usize) -> Self {
        QueryError::Compile {
            message: message.into(),
            position,
        }
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        QueryError::Evaluation {
            message: message.into(),
        }
    }

    pub fn unknown_field(name: impl Into<String>) -> Self {
        QueryError::UnknownField { name: name.into() }
    }

    /// Returns the error code
    pub fn code(&self) -> QueryErrorCode {
        match self {
            QueryError::UnknownField { .. } => QueryErrorCode::RewriteAmbiguous,
            QueryError::Compile { .. } => QueryErrorCode::CompileError,
            QueryError::Evaluation { .. } => QueryErrorCode::EvalError,
        }
    }

    /// Byte offset into the rewritten text, for compile errors
    pub fn position(&self) -> Option<usize> {
        match self {
            QueryError::Compile { position, .. } => Some(*position),
            _ => None,
        }
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
