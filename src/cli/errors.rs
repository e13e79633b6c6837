//! CLI-specific error types
//!
//! CLI errors end the process. Query errors do not: a failed query still
//! returns the input records together with an error message.

use std::fmt;
use std::io;

use crate::config::ConfigError;
use crate::expr::QueryError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout/input files)
    IoError,
    /// Input is not the expected JSON shape
    InputError,
    /// Query text could not be rewritten
    QueryError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "HOOPQL_CLI_CONFIG_ERROR",
            Self::IoError => "HOOPQL_CLI_IO_ERROR",
            Self::InputError => "HOOPQL_CLI_INPUT_ERROR",
            Self::QueryError => "HOOPQL_CLI_QUERY_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn input_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InputError, msg)
    }

    pub fn query_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::QueryError, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::input_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(format!("{}: {}", e.code(), e))
    }
}

impl From<QueryError> for CliError {
    fn from(e: QueryError) -> Self {
        Self::query_error(format!("{}: {}", e.code(), e))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code() {
        let err = CliError::input_error("expected a JSON array");
        assert_eq!(err.to_string(), "HOOPQL_CLI_INPUT_ERROR: expected a JSON array");
        assert_eq!(err.code(), &CliErrorCode::InputError);
    }

    #[test]
    fn test_from_query_error() {
        let err = CliError::from(QueryError::compile("unexpected ')'", 3));
        assert_eq!(err.code_str(), "HOOPQL_CLI_QUERY_ERROR");
        assert!(err.message().starts_with("HOOPQL_COMPILE_ERROR"));
    }

    #[test]
    fn test_from_config_error() {
        let err = CliError::from(ConfigError::Invalid("zero depth".into()));
        assert_eq!(err.code_str(), "HOOPQL_CLI_CONFIG_ERROR");
        assert!(err.message().contains("zero depth"));
    }
}
