//! Grade Consistency Tests
//!
//! Tests for rank/percentile injection through the filter engine:
//! - rank is derived from the percentile and the sample count
//! - only years with a baseline are graded
//! - a missing baseline leaves grades undefined, never an error

use std::collections::BTreeMap;
use std::sync::Arc;

use hoopql::config::EngineConfig;
use hoopql::expr::{compile, DEFAULT_MAX_DEPTH};
use hoopql::grades::{
    no_baselines, BaselineCache, DivisionBaseline, DivisionStatsProvider, GradeContext,
    GradeRequest, PercentileSample, RecordSetStats,
};
use hoopql::observability::MetricsRegistry;
use hoopql::query::FilterEngine;
use hoopql::resolver::{GradeKind, Schema};
use hoopql::view::{SeasonViewBuilder, ViewBuilder};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

/// 100 teams in 2020 with off_ppp 1..=100
fn division() -> Vec<Value> {
    (1..=100)
        .map(|i| json!({"team_name": format!("T{:03}", i), "year": "2020", "off_ppp": {"value": i}}))
        .collect()
}

fn names(outcome: &[&Value]) -> Vec<String> {
    outcome.iter().map(|r| r["team_name"].as_str().unwrap().to_string()).collect()
}

// =============================================================================
// Rank Formula
// =============================================================================

/// percentile 0.95 over 100 samples ranks 6th.
#[test]
fn test_rank_formula() {
    let sample = PercentileSample { value: 0.95, samples: 100 };
    assert_eq!(sample.rank(), 6.0);

    let top = PercentileSample { value: 1.0, samples: 100 };
    assert_eq!(top.rank(), 1.0);
}

/// Every graded view in a division satisfies the rank formula.
#[test]
fn test_rank_matches_pctile_across_division() {
    let records = division();
    let stats = RecordSetStats::new(Schema::Team, records.clone());
    let base = Arc::new(stats.build_baseline("2020", "Men"));
    let samples = base.samples("off_ppp").unwrap().len() as f64;
    let lookup = move |year: &str| (year == "2020").then(|| base.clone());

    let expr = compile("$.rank.off_ppp > 0 && $.pctile.off_ppp >= 0", DEFAULT_MAX_DEPTH).unwrap();
    let ctx = GradeContext::new(Schema::Team, GradeRequest::scan([&expr]), &stats, &lookup);
    let builder = SeasonViewBuilder::new(Schema::Team);

    for (i, record) in records.iter().enumerate() {
        let view = builder.build(record, &ctx);
        let rank = view.grades().map(GradeKind::Rank)["off_ppp"].as_f64().unwrap();
        let pctile = view.grades().map(GradeKind::Pctile)["off_ppp"].as_f64().unwrap();

        assert!((pctile - (i + 1) as f64 / samples).abs() < 1e-12, "{}: {}", i, pctile);
        assert_eq!(rank, ((1.0 - pctile) * samples + 0.5).floor() + 1.0, "{}", i);
    }
    assert!(ctx.unavailable_years().is_empty());
}

/// Percentile is the share of samples at or below the value.
#[test]
fn test_percentile_of_baseline() {
    let stats = RecordSetStats::new(Schema::Team, division());
    let baseline = stats.build_baseline("2020", "Men");
    let p = stats.percentile_of(&baseline, "off_ppp", 95.0).unwrap();
    assert_eq!(p.samples, 100);
    assert!((p.value - 0.95).abs() < 1e-12);

    assert!(stats.percentile_of(&baseline, "def_ppp", 1.0).is_none());
}

/// Baselines only include the requested year.
#[test]
fn test_baseline_scoped_to_year() {
    let mut records = division();
    records.push(json!({"team_name": "Old", "year": "2019", "off_ppp": {"value": 500}}));
    let stats = RecordSetStats::new(Schema::Team, records);
    assert_eq!(stats.build_baseline("2020", "Men").samples("off_ppp").unwrap().len(), 100);
    assert_eq!(stats.build_baseline("2019", "Men").samples("off_ppp").unwrap(), &[500.0]);
}

// =============================================================================
// Filtering on Grades
// =============================================================================

/// `rank_off_ppp <= 10` keeps a record ranked 6th.
#[test]
fn test_rank_filter_example() {
    let config = EngineConfig::default();
    let stats = RecordSetStats::new(Schema::Team, division());
    let cache = BaselineCache::new();
    cache.get_or_build(&stats, "2020", "Men");
    let engine = FilterEngine::new(&config, &stats);

    let records = vec![
        json!({"team_name": "A", "year": "2020", "off_ppp": {"value": 95}}),
        json!({"team_name": "B", "year": "2020", "off_ppp": {"value": 50}}),
    ];
    let outcome = engine.apply_team_filter(&records, "rank_off_ppp <= 10", &cache.scoped("Men"), &[]);
    assert_eq!(outcome.error, None);
    assert_eq!(names(&outcome.records), vec!["A"]);

    let outcome = engine.apply_team_filter(&records, "pctile_off_ppp > 0.4", &cache.scoped("Men"), &[]);
    assert_eq!(names(&outcome.records), vec!["A", "B"]);
}

/// Sorting by rank ascending puts the best team first.
#[test]
fn test_sort_by_rank() {
    let config = EngineConfig::default();
    let stats = RecordSetStats::new(Schema::Team, division());
    let base = Arc::new(stats.build_baseline("2020", "Men"));
    let lookup = move |year: &str| (year == "2020").then(|| base.clone());
    let engine = FilterEngine::new(&config, &stats);

    let records = division();
    let outcome = engine.apply_team_filter(&records, "rank_off_ppp <= 3 SORT_BY rank_off_ppp ASC", &lookup, &[]);
    assert_eq!(names(&outcome.records), vec!["T100", "T099", "T098"]);
}

/// Without a baseline the grade is undefined: nothing matches, no error.
#[test]
fn test_missing_baseline_is_undefined() {
    let config = EngineConfig::default();
    let stats = RecordSetStats::new(Schema::Team, Vec::new());
    let metrics = MetricsRegistry::new();
    let engine = FilterEngine::new(&config, &stats).with_metrics(&metrics);

    let records = vec![
        json!({"team_name": "A", "year": "2018", "off_ppp": {"value": 95}}),
        json!({"team_name": "B", "year": "2019", "off_ppp": {"value": 50}}),
    ];
    let outcome = engine.apply_team_filter(&records, "rank_off_ppp <= 10", &no_baselines, &[]);
    assert!(outcome.records.is_empty());
    assert_eq!(outcome.error, None);

    let outcome = engine.apply_team_filter(&records, "!exists(rank_off_ppp)", &no_baselines, &[]);
    assert_eq!(outcome.records.len(), 2);
    assert_eq!(metrics.snapshot().baseline_misses, 4);
}

/// A baseline for one year does not grade records from another.
#[test]
fn test_grades_use_record_year() {
    let config = EngineConfig::default();
    let samples = BTreeMap::from([("off_ppp".to_string(), (1..=10).map(f64::from).collect())]);
    let base = Arc::new(DivisionBaseline::new("2020", "Men", samples));
    let lookup = move |year: &str| (year == "2020").then(|| base.clone());
    let stats = RecordSetStats::new(Schema::Team, Vec::new());
    let engine = FilterEngine::new(&config, &stats);

    let records = vec![
        json!({"team_name": "Now", "year": "2020", "off_ppp": {"value": 10}}),
        json!({"team_name": "Then", "year": "2019", "off_ppp": {"value": 10}}),
    ];
    let outcome = engine.apply_team_filter(&records, "exists(rank_off_ppp)", &lookup, &[]);
    assert_eq!(names(&outcome.records), vec!["Now"]);
}
