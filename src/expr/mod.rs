//! Expression compiler and evaluator
//!
//! Rewritten query text is tokenized, parsed by recursive descent into a
//! small AST, and evaluated by a tree-walking interpreter against anything
//! implementing [`FieldSource`].
//!
//! Compilation errors carry the byte position they were found at.

mod ast;
mod errors;
mod eval;
mod parser;

pub use ast::{BinaryOp, Expr, FieldRef, Function, LogicalOp, Scalar, SortDirection, UnaryOp};
pub use errors::{QueryError, QueryErrorCode, QueryResult};
pub use eval::{loose_eq, FieldSource};
pub use parser::DEFAULT_MAX_DEPTH;

/// Compiles rewritten text into an expression tree
pub fn compile(text: &str, max_depth: usize) -> QueryResult<Expr> {
    parser::parse(text, max_depth)
}
