//! CLI module for hoopql
//!
//! Provides command-line interface for:
//! - filter: filter and sort records read from stdin
//! - rewrite: show the canonical form of a query

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, SchemaArg};
pub use commands::{filter, filter_records, rewrite, rewrite_document, run, run_command, FilterJob};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{error_document, read_records, response_document, write_error, write_response};
