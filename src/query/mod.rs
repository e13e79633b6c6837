//! Query orchestrator
//!
//! One call runs one query over one record set:
//!
//! 1. split on `SORT_BY` into a filter and ordered sort fragments
//! 2. rewrite each fragment for its own rewrite mode
//! 3. compile the user filter, each extra filter, each sort key and the
//!    tie-break keys separately
//! 4. build a View Object per record, grading only what the query names
//! 5. keep records passing the user filter and every extra filter
//! 6. order by sort keys, then identity fields ascending, then the volume
//!    field descending, then input order
//!
//! Failures never escape. A fault in an extra filter re-runs the query
//! without extras, reusing the compiled user clauses; any other fault
//! returns the input unchanged with the error message.

mod clauses;
mod sorter;

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::config::EngineConfig;
use crate::expr::{compile, Expr, FieldSource, QueryError, Scalar, SortDirection};
use crate::grades::{BaselineLookup, DivisionStatsProvider, GradeContext, GradeRequest};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry, ObservationScope};
use crate::resolver::{RewriteMode, Schema, Slot};
use crate::rewrite::rewrite_fragment;
use crate::view::{ComparisonViewBuilder, SeasonViewBuilder, ViewBuilder};

pub use clauses::{split_query, ExtraFilter, QueryParts, MATCH_ALL, SORT_KEYWORD};
pub use sorter::{compare_keys, sort_rows, SortRow};

/// Which clause of a query an error came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClauseOrigin {
    Filter,
    Extra(String),
    /// Zero-based `SORT_BY` fragment
    Sort(usize),
    TieBreak,
}

impl ClauseOrigin {
    pub fn is_extra(&self) -> bool {
        matches!(self, ClauseOrigin::Extra(_))
    }
}

impl fmt::Display for ClauseOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClauseOrigin::Filter => write!(f, "filter"),
            ClauseOrigin::Extra(label) => write!(f, "extra filter '{}'", label),
            ClauseOrigin::Sort(i) => write!(f, "sort clause {}", i + 1),
            ClauseOrigin::TieBreak => write!(f, "tie-break"),
        }
    }
}

/// A query error tagged with its clause and rewritten text
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{source} in `{expression}`")]
pub struct ClauseError {
    pub origin: ClauseOrigin,
    /// Rewritten text of the clause, or the raw text if rewriting failed
    pub expression: String,
    pub source: QueryError,
}

/// Result of one filter call
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome<'r> {
    pub records: Vec<&'r Value>,
    /// Set when any clause failed, even if results were recovered
    pub error: Option<String>,
}

/// How a query addresses its records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// One season per record
    Single,
    /// Season bundles; unprefixed stats fall back to these slots
    Comparison { filter_slot: Slot, sort_slot: Slot },
}

impl QueryMode {
    fn filter_rewrite(&self, schema: Schema) -> RewriteMode {
        match self {
            QueryMode::Single => RewriteMode::single(schema),
            QueryMode::Comparison { filter_slot, .. } => RewriteMode::comparison(schema, *filter_slot),
        }
    }

    fn sort_rewrite(&self, schema: Schema) -> RewriteMode {
        match self {
            QueryMode::Single => RewriteMode::single(schema),
            QueryMode::Comparison { sort_slot, .. } => RewriteMode::comparison(schema, *sort_slot),
        }
    }
}

/// One query over one record set
#[derive(Debug, Clone, Copy)]
pub struct FilterRequest<'q> {
    pub query: &'q str,
    pub extras: &'q [ExtraFilter],
    pub schema: Schema,
    pub mode: QueryMode,
}

/// Baselines grades are computed against
#[derive(Clone, Copy)]
pub struct GradeSources<'a> {
    pub baselines: &'a dyn BaselineLookup,
    /// `team_stats.*` grades in player queries
    pub team_baselines: Option<&'a dyn BaselineLookup>,
}

struct Compiled {
    origin: ClauseOrigin,
    text: String,
    expr: Expr,
}

impl Compiled {
    fn evaluate(&self, source: &dyn FieldSource) -> Result<Scalar, ClauseError> {
        self.expr.evaluate(source).map_err(|e| self.error(e))
    }

    fn matches(&self, source: &dyn FieldSource) -> Result<bool, ClauseError> {
        self.evaluate(source).map(|v| v.truthy())
    }

    fn error(&self, source: QueryError) -> ClauseError {
        ClauseError {
            origin: self.origin.clone(),
            expression: self.text.clone(),
            source,
        }
    }
}

/// User clauses of a query; extras are compiled separately
struct Plan {
    filter: Compiled,
    keys: Vec<(Compiled, SortDirection)>,
}

/// Runs filter/sort queries
pub struct FilterEngine<'a> {
    config: &'a EngineConfig,
    stats: &'a dyn DivisionStatsProvider,
    metrics: Option<&'a MetricsRegistry>,
}

impl<'a> FilterEngine<'a> {
    pub fn new(config: &'a EngineConfig, stats: &'a dyn DivisionStatsProvider) -> Self {
        Self {
            config,
            stats,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: &'a MetricsRegistry) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Comparison mode with the configured default slots
    pub fn comparison_mode(&self) -> QueryMode {
        QueryMode::Comparison {
            filter_slot: self.config.comparison.filter_slot,
            sort_slot: self.config.comparison.sort_slot,
        }
    }

    /// Filters team-season records
    pub fn apply_team_filter<'r>(
        &self,
        records: &'r [Value],
        query: &str,
        baselines: &dyn BaselineLookup,
        extras: &[ExtraFilter],
    ) -> FilterOutcome<'r> {
        let request = FilterRequest {
            query,
            extras,
            schema: Schema::Team,
            mode: QueryMode::Single,
        };
        let sources = GradeSources {
            baselines,
            team_baselines: None,
        };
        self.apply_filter(records, request, &SeasonViewBuilder::new(Schema::Team), sources)
    }

    /// Filters player-season records, or season bundles when `comparison`
    pub fn apply_player_filter<'r>(
        &self,
        records: &'r [Value],
        query: &str,
        player_baselines: &dyn BaselineLookup,
        team_baselines: &dyn BaselineLookup,
        extras: &[ExtraFilter],
        comparison: bool,
    ) -> FilterOutcome<'r> {
        let sources = GradeSources {
            baselines: player_baselines,
            team_baselines: Some(team_baselines),
        };
        let mode = if comparison {
            self.comparison_mode()
        } else {
            QueryMode::Single
        };
        let request = FilterRequest {
            query,
            extras,
            schema: Schema::Player,
            mode,
        };

        if comparison {
            self.apply_filter(records, request, &ComparisonViewBuilder::new(Schema::Player), sources)
        } else {
            self.apply_filter(records, request, &SeasonViewBuilder::new(Schema::Player), sources)
        }
    }

    /// Runs `request` over `records`
    pub fn apply_filter<'r>(
        &self,
        records: &'r [Value],
        request: FilterRequest<'_>,
        builder: &dyn ViewBuilder,
        sources: GradeSources<'_>,
    ) -> FilterOutcome<'r> {
        let input_count = records.len().to_string();
        let scope = ObservationScope::with_fields(
            "FILTER",
            &[("schema", request.schema.as_str()), ("records", &input_count)],
        );

        let plan = match self.compile_plan(&request) {
            Ok(plan) => plan,
            Err(err) => return self.fall_back(records, err, scope),
        };

        let extras = match self.compile_extras(&request) {
            Ok(extras) => extras,
            Err(fault) => {
                return self.retry_without_extras(records, &request, &plan, builder, sources, fault, scope)
            }
        };

        match self.execute(records, &request, &plan, &extras, builder, sources) {
            Ok(matched) => self.complete(matched, None, scope),
            Err(fault) if fault.origin.is_extra() => {
                self.retry_without_extras(records, &request, &plan, builder, sources, fault, scope)
            }
            Err(err) => self.fall_back(records, err, scope),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn retry_without_extras<'r>(
        &self,
        records: &'r [Value],
        request: &FilterRequest<'_>,
        plan: &Plan,
        builder: &dyn ViewBuilder,
        sources: GradeSources<'_>,
        fault: ClauseError,
        scope: ObservationScope<'_>,
    ) -> FilterOutcome<'r> {
        let reason = fault.to_string();
        let label = match &fault.origin {
            ClauseOrigin::Extra(label) => label.as_str(),
            _ => "",
        };
        log_event_with_fields(
            Event::QueryRetryWithoutExtras,
            &[("extra", label), ("reason", &reason)],
        );
        if let Some(metrics) = self.metrics {
            metrics.increment_retries();
        }

        match self.execute(records, request, plan, &[], builder, sources) {
            Ok(matched) => self.complete(matched, Some(reason), scope),
            Err(err) => self.fall_back(records, err, scope),
        }
    }

    fn complete<'r>(
        &self,
        matched: Vec<&'r Value>,
        error: Option<String>,
        scope: ObservationScope<'_>,
    ) -> FilterOutcome<'r> {
        let count = matched.len().to_string();
        let retried = if error.is_some() { "true" } else { "false" };
        scope.complete_with_fields(&[("matched", &count), ("retried", retried)]);

        if let Some(metrics) = self.metrics {
            metrics.increment_queries_executed();
            metrics.add_records_matched(matched.len() as u64);
        }
        FilterOutcome {
            records: matched,
            error,
        }
    }

    /// The unfiltered input, in input order
    fn fall_back<'r>(
        &self,
        records: &'r [Value],
        err: ClauseError,
        scope: ObservationScope<'_>,
    ) -> FilterOutcome<'r> {
        let message = err.to_string();
        scope.fail(&message);
        if let Some(metrics) = self.metrics {
            metrics.increment_queries_failed();
        }
        FilterOutcome {
            records: records.iter().collect(),
            error: Some(message),
        }
    }

    fn compile_plan(&self, request: &FilterRequest<'_>) -> Result<Plan, ClauseError> {
        let parts = split_query(request.query);
        let filter_mode = request.mode.filter_rewrite(request.schema);
        let sort_mode = request.mode.sort_rewrite(request.schema);

        let filter = self.compile_clause(ClauseOrigin::Filter, parts.filter, &filter_mode)?.0;

        let mut keys = Vec::new();
        for (i, fragment) in parts.sorts.iter().enumerate() {
            let (compiled, direction) = self.compile_clause(ClauseOrigin::Sort(i), fragment, &sort_mode)?;
            keys.push((compiled, direction.unwrap_or_default()));
        }

        for field in self.config.identity_fields(request.schema) {
            let (compiled, _) = self.compile_clause(ClauseOrigin::TieBreak, field, &sort_mode)?;
            keys.push((compiled, SortDirection::Asc));
        }
        let (volume, _) =
            self.compile_clause(ClauseOrigin::TieBreak, &self.config.volume_field, &sort_mode)?;
        keys.push((volume, SortDirection::Desc));

        Ok(Plan { filter, keys })
    }

    fn compile_extras(&self, request: &FilterRequest<'_>) -> Result<Vec<Compiled>, ClauseError> {
        let mode = request.mode.filter_rewrite(request.schema);
        request
            .extras
            .iter()
            .map(|extra| {
                self.compile_clause(ClauseOrigin::Extra(extra.label.clone()), &extra.clause, &mode)
                    .map(|(compiled, _)| compiled)
            })
            .collect()
    }

    fn compile_clause(
        &self,
        origin: ClauseOrigin,
        fragment: &str,
        mode: &RewriteMode,
    ) -> Result<(Compiled, Option<SortDirection>), ClauseError> {
        let rewritten = rewrite_fragment(fragment, mode).map_err(|source| ClauseError {
            origin: origin.clone(),
            expression: fragment.to_string(),
            source,
        })?;

        match compile(&rewritten.text, self.config.max_expression_depth) {
            Ok(expr) => Ok((
                Compiled {
                    origin,
                    text: rewritten.text,
                    expr,
                },
                rewritten.direction,
            )),
            Err(source) => Err(ClauseError {
                origin,
                expression: rewritten.text,
                source,
            }),
        }
    }

    fn execute<'r>(
        &self,
        records: &'r [Value],
        request: &FilterRequest<'_>,
        plan: &Plan,
        extras: &[Compiled],
        builder: &dyn ViewBuilder,
        sources: GradeSources<'_>,
    ) -> Result<Vec<&'r Value>, ClauseError> {
        let exprs = std::iter::once(&plan.filter.expr)
            .chain(extras.iter().map(|c| &c.expr))
            .chain(plan.keys.iter().map(|(c, _)| &c.expr));
        let mut grades = GradeContext::new(
            request.schema,
            GradeRequest::scan(exprs),
            self.stats,
            sources.baselines,
        );
        if let Some(team) = sources.team_baselines {
            grades = grades.with_team_baselines(team);
        }

        let mut rows = Vec::new();
        'records: for (index, record) in records.iter().enumerate() {
            let view = builder.build(record, &grades);

            if !plan.filter.matches(&view)? {
                continue;
            }
            for extra in extras {
                if !extra.matches(&view)? {
                    continue 'records;
                }
            }

            let keys = plan
                .keys
                .iter()
                .map(|(key, _)| key.evaluate(&view))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(SortRow {
                index,
                item: record,
                keys,
            });
        }

        let unavailable = grades.unavailable_years();
        for year in &unavailable {
            log_event_with_fields(
                Event::BaselineUnavailable,
                &[("schema", request.schema.as_str()), ("year", year)],
            );
        }
        if let Some(metrics) = self.metrics {
            metrics.add_baseline_misses(unavailable.len() as u64);
        }

        let directions: Vec<SortDirection> = plan.keys.iter().map(|(_, d)| *d).collect();
        sort_rows(&mut rows, &directions);
        Ok(rows.into_iter().map(|row| row.item).collect())
    }
}
