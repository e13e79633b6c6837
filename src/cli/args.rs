//! CLI argument definitions using clap
//!
//! Commands:
//! - hoopql filter --schema <team|player> --query <Q> [--extra LABEL=CLAUSE]...
//! - hoopql rewrite --schema <team|player> --query <Q>

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::query::ExtraFilter;
use crate::resolver::Schema;

/// hoopql - filter and sort basketball season records with short queries
#[derive(Parser, Debug)]
#[command(name = "hoopql")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Record schema selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SchemaArg {
    Team,
    Player,
}

impl From<SchemaArg> for Schema {
    fn from(arg: SchemaArg) -> Self {
        match arg {
            SchemaArg::Team => Schema::Team,
            SchemaArg::Player => Schema::Player,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Filter and sort a JSON array of records read from stdin
    Filter {
        #[arg(long, value_enum)]
        schema: SchemaArg,

        /// Query text, e.g. "off_ppp >= 1.1 SORT_BY net_margin DESC"
        #[arg(long)]
        query: String,

        /// Extra filter ANDed onto the query, as LABEL=CLAUSE
        #[arg(long = "extra", value_parser = parse_extra)]
        extras: Vec<ExtraFilter>,

        /// Records are prev/next/pred season bundles
        #[arg(long)]
        comparison: bool,

        /// League-wide records of the same schema to grade against
        #[arg(long)]
        baseline: Option<PathBuf>,

        /// League-wide team records, for team_stats grades in player queries
        #[arg(long)]
        team_baseline: Option<PathBuf>,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the rewritten filter and sort fragments of a query
    Rewrite {
        #[arg(long, value_enum)]
        schema: SchemaArg,

        #[arg(long)]
        query: String,

        #[arg(long)]
        comparison: bool,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Parses `LABEL=CLAUSE`; the clause may itself contain `=`
fn parse_extra(raw: &str) -> Result<ExtraFilter, String> {
    match raw.split_once('=') {
        Some((label, clause)) if !label.trim().is_empty() && !clause.trim().is_empty() => {
            Ok(ExtraFilter::new(label.trim(), clause.trim()))
        }
        _ => Err(format!("expected LABEL=CLAUSE, got '{}'", raw)),
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extra() {
        let extra = parse_extra("teams=team == 'Duke'").unwrap();
        assert_eq!(extra.label, "teams");
        assert_eq!(extra.clause, "team == 'Duke'");
        assert!(parse_extra("no-separator").is_err());
        assert!(parse_extra("=clause").is_err());
    }

    #[test]
    fn test_filter_command() {
        let cli = Cli::try_parse_from([
            "hoopql", "filter", "--schema", "player", "--query", "ALL",
            "--extra", "a=code == 'X'", "--extra", "b=year == '2020'", "--comparison",
        ])
        .unwrap();
        match cli.command {
            Command::Filter { schema, extras, comparison, baseline, .. } => {
                assert_eq!(Schema::from(schema), Schema::Player);
                assert_eq!(extras.len(), 2);
                assert!(comparison);
                assert!(baseline.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_schema_rejected() {
        assert!(Cli::try_parse_from(["hoopql", "rewrite", "--schema", "coach", "--query", "ALL"]).is_err());
    }
}
