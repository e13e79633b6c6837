//! CLI command implementations
//!
//! `filter` reads records from stdin and always answers with a success
//! document: a failed query still returns the input, with `error` set.
//! Only configuration and I/O problems end in an error document.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use crate::config::EngineConfig;
use crate::expr::{compile, FieldRef, QueryError};
use crate::grades::{scalar_text, BaselineCache, RecordSetStats};
use crate::observability::{Logger, MetricsRegistry};
use crate::query::{split_query, ExtraFilter, FilterEngine, FilterRequest, GradeSources};
use crate::resolver::{RewriteMode, Schema, Slot};
use crate::rewrite::rewrite_fragment;
use crate::view::{ComparisonViewBuilder, ViewBuilder};

use super::args::Command;
use super::errors::CliResult;
use super::io::{read_records, read_records_file, write_error, write_response};

/// Main entry point for CLI
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let result = match cmd {
        Command::Filter {
            schema,
            query,
            extras,
            comparison,
            baseline,
            team_baseline,
            config,
        } => {
            let job = FilterJob {
                schema: schema.into(),
                query,
                extras,
                comparison,
                baseline,
                team_baseline,
            };
            filter(config.as_deref(), &job)
        }
        Command::Rewrite {
            schema,
            query,
            comparison,
            config,
        } => rewrite(config.as_deref(), schema.into(), &query, comparison),
    };

    if let Err(e) = &result {
        write_error(e.code_str(), e.message())?;
    }
    result
}

/// Loads the config file if given, otherwise defaults, and applies its log level
fn load_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    Logger::set_min_severity(config.severity()?);
    Ok(config)
}

/// Arguments of one `filter` invocation
#[derive(Debug, Clone)]
pub struct FilterJob {
    pub schema: Schema,
    pub query: String,
    pub extras: Vec<ExtraFilter>,
    pub comparison: bool,
    pub baseline: Option<PathBuf>,
    pub team_baseline: Option<PathBuf>,
}

/// Filter records from stdin
pub fn filter(config_path: Option<&Path>, job: &FilterJob) -> CliResult<()> {
    let config = load_config(config_path)?;
    let records = read_records()?;

    let baseline = match &job.baseline {
        Some(path) => read_records_file(path)?,
        None => Vec::new(),
    };
    let team_baseline = match &job.team_baseline {
        Some(path) => read_records_file(path)?,
        None => Vec::new(),
    };

    let (data, error) = filter_records(&config, job, &records, baseline, team_baseline);
    write_response(data, error.as_deref())
}

/// Runs `job` over `records`, returning the output records and any query error
pub fn filter_records(
    config: &EngineConfig,
    job: &FilterJob,
    records: &[Value],
    baseline: Vec<Value>,
    team_baseline: Vec<Value>,
) -> (Value, Option<String>) {
    let years = record_years(records, job.comparison);

    let stats = RecordSetStats::new(job.schema, baseline);
    let cache = BaselineCache::new();
    if job.baseline.is_some() {
        for year in &years {
            cache.get_or_build(&stats, year, &config.gender);
        }
    }

    let team_stats = RecordSetStats::new(Schema::Team, team_baseline);
    let team_cache = BaselineCache::new();
    if job.schema == Schema::Player && job.team_baseline.is_some() {
        for year in &years {
            team_cache.get_or_build(&team_stats, year, &config.gender);
        }
    }

    let metrics = MetricsRegistry::new();
    let engine = FilterEngine::new(config, &stats).with_metrics(&metrics);
    let baselines = cache.scoped(&config.gender);
    let team_baselines = team_cache.scoped(&config.gender);

    let outcome = match job.schema {
        Schema::Player => engine.apply_player_filter(
            records,
            &job.query,
            &baselines,
            &team_baselines,
            &job.extras,
            job.comparison,
        ),
        Schema::Team if job.comparison => {
            let request = FilterRequest {
                query: &job.query,
                extras: &job.extras,
                schema: Schema::Team,
                mode: engine.comparison_mode(),
            };
            let sources = GradeSources {
                baselines: &baselines,
                team_baselines: None,
            };
            let builder: &dyn ViewBuilder = &ComparisonViewBuilder::new(Schema::Team);
            engine.apply_filter(records, request, builder, sources)
        }
        Schema::Team => engine.apply_team_filter(records, &job.query, &baselines, &job.extras),
    };

    Logger::trace("FILTER_METRICS", &[("counters", &metrics.to_json())]);

    let data = Value::Array(outcome.records.into_iter().cloned().collect());
    (data, outcome.error)
}

/// Every season year present in `records`, including comparison slots
fn record_years(records: &[Value], comparison: bool) -> BTreeSet<String> {
    let mut years = BTreeSet::new();
    for record in records {
        if comparison {
            for slot in Slot::ALL {
                if let Some(year) = record.get(slot.as_str()).and_then(|s| s.get("year")).and_then(scalar_text) {
                    years.insert(year);
                }
            }
        } else if let Some(year) = record.get("year").and_then(scalar_text) {
            years.insert(year);
        }
    }
    years
}

/// Print the rewritten form of a query
pub fn rewrite(config_path: Option<&Path>, schema: Schema, query: &str, comparison: bool) -> CliResult<()> {
    let config = load_config(config_path)?;
    let document = rewrite_document(&config, schema, query, comparison)?;
    write_response(document, None)
}

/// Rewritten filter and sort fragments as JSON
///
/// Each fragment is also compiled, so unknown fields and syntax errors
/// surface here instead of as a silent fallback.
pub fn rewrite_document(
    config: &EngineConfig,
    schema: Schema,
    query: &str,
    comparison: bool,
) -> CliResult<Value> {
    let (filter_mode, sort_mode) = if comparison {
        (
            RewriteMode::comparison(schema, config.comparison.filter_slot),
            RewriteMode::comparison(schema, config.comparison.sort_slot),
        )
    } else {
        (RewriteMode::single(schema), RewriteMode::single(schema))
    };

    let parts = split_query(query);
    let filter = rewrite_fragment(parts.filter, &filter_mode)?;
    check_fragment(config, &filter.text)?;

    let mut sorts = Vec::with_capacity(parts.sorts.len());
    for fragment in &parts.sorts {
        let rewritten = rewrite_fragment(fragment, &sort_mode)?;
        check_fragment(config, &rewritten.text)?;
        sorts.push(json!({
            "expression": rewritten.text,
            "direction": rewritten.direction.unwrap_or_default().as_str(),
        }));
    }

    Ok(json!({
        "filter": filter.text,
        "sorts": sorts,
    }))
}

/// Compiles rewritten text and rejects identifiers the rewrite left unresolved
fn check_fragment(config: &EngineConfig, text: &str) -> CliResult<()> {
    let expr = compile(text, config.max_expression_depth)?;
    let mut unresolved = None;
    expr.for_each_field(&mut |field| {
        if let FieldRef::Unresolved(name) = field {
            unresolved.get_or_insert_with(|| name.clone());
        }
    });
    match unresolved {
        Some(name) => Err(QueryError::unknown_field(name).into()),
        None => Ok(()),
    }
}
