//! JSON I/O handling for CLI
//!
//! - Input: one JSON array of records on stdin, or from a file
//! - Output: one JSON object on stdout
//! - UTF-8 only

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use serde_json::{json, Value};

use super::errors::{CliError, CliResult};

/// Read a JSON array of records from stdin
pub fn read_records() -> CliResult<Vec<Value>> {
    let mut input = String::new();
    io::stdin().lock().read_to_string(&mut input)?;
    parse_records(&input)
}

/// Read a JSON array of records from a file
pub fn read_records_file(path: &Path) -> CliResult<Vec<Value>> {
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::io_error(format!("failed to read {}: {}", path.display(), e)))?;
    parse_records(&content)
}

fn parse_records(input: &str) -> CliResult<Vec<Value>> {
    if input.trim().is_empty() {
        return Err(CliError::input_error("Empty input"));
    }
    match serde_json::from_str(input)? {
        Value::Array(records) => Ok(records),
        other => Err(CliError::input_error(format!(
            "expected a JSON array of records, got {}",
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Success document; `error` carries a recovered query failure
pub fn response_document(data: Value, error: Option<&str>) -> Value {
    json!({
        "status": "ok",
        "data": data,
        "error": error
    })
}

/// Failure document
pub fn error_document(code: &str, message: &str) -> Value {
    json!({
        "status": "error",
        "code": code,
        "message": message
    })
}

/// Write a success response to stdout
pub fn write_response(data: Value, error: Option<&str>) -> CliResult<()> {
    write_document(&response_document(data, error))
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    write_document(&error_document(code, message))
}

fn write_document(document: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, document)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
