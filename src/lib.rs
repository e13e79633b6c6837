//! hoopql - filter and sort basketball season records with short queries
//!
//! A query such as `off_ppp >= 1.1 && conf == 'ACC' SORT_BY net_margin DESC`
//! is rewritten into canonical field paths, compiled into an expression tree
//! and evaluated against a view of each record with derived aggregates and
//! league-relative grades attached.

pub mod cli;
pub mod config;
pub mod expr;
pub mod grades;
pub mod observability;
pub mod query;
pub mod resolver;
pub mod rewrite;
pub mod view;
