//! Division statistics baselines
//!
//! A baseline is a read-only, per-(year, gender) snapshot of league-wide
//! field distributions. The engine only ever reads baselines; callers build
//! them through a [`DivisionStatsProvider`] and publish them through a
//! [`BaselineCache`], which swaps whole snapshots and never mutates one in
//! place.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::observability::{log_event_with_fields, Event};
use crate::resolver::{FieldPath, Schema};
use crate::view::SeasonViewBuilder;

/// League-wide sorted samples per field, for one year and gender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivisionBaseline {
    pub year: String,
    pub gender: String,
    fields: BTreeMap<String, Vec<f64>>,
}

impl DivisionBaseline {
    /// Builds a baseline; samples are sorted and NaNs dropped
    pub fn new(
        year: impl Into<String>,
        gender: impl Into<String>,
        fields: BTreeMap<String, Vec<f64>>,
    ) -> Self {
        let fields = fields
            .into_iter()
            .map(|(name, mut samples)| {
                samples.retain(|v| !v.is_nan());
                samples.sort_by(|a, b| a.total_cmp(b));
                (name, samples)
            })
            .filter(|(_, samples)| !samples.is_empty())
            .collect();
        Self {
            year: year.into(),
            gender: gender.into(),
            fields,
        }
    }

    /// Sorted samples of `field` (dotted stem, e.g. `style.Transition.possPct`)
    pub fn samples(&self, field: &str) -> Option<&[f64]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A percentile and the sample count it was computed over
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentileSample {
    /// Fraction of samples at or below the value, in `[0, 1]`
    pub value: f64,
    pub samples: usize,
}

impl PercentileSample {
    /// `round((1 - percentile) * samples) + 1`; the top of the division is rank 1
    pub fn rank(&self) -> f64 {
        let raw = (1.0 - self.value) * self.samples as f64;
        (raw + 0.5).floor() + 1.0
    }
}

/// Builds baselines and looks values up in them
pub trait DivisionStatsProvider {
    /// Builds the baseline for one division-year
    fn build_baseline(&self, year: &str, gender: &str) -> DivisionBaseline;

    /// Percentile of `value` within `field`'s samples; `None` when the
    /// baseline has no samples for the field
    fn percentile_of(
        &self,
        baseline: &DivisionBaseline,
        field: &str,
        value: f64,
    ) -> Option<PercentileSample> {
        let samples = baseline.samples(field)?;
        if value.is_nan() {
            return None;
        }
        let at_or_below = samples.partition_point(|s| *s <= value);
        Some(PercentileSample {
            value: at_or_below as f64 / samples.len() as f64,
            samples: samples.len(),
        })
    }
}

/// Resolves the baseline for a record's year
///
/// Implemented by [`ScopedBaselines`] and by any
/// `Fn(&str) -> Option<Arc<DivisionBaseline>>`.
pub trait BaselineLookup {
    fn baseline_for(&self, year: &str) -> Option<Arc<DivisionBaseline>>;
}

impl<F> BaselineLookup for F
where
    F: Fn(&str) -> Option<Arc<DivisionBaseline>>,
{
    fn baseline_for(&self, year: &str) -> Option<Arc<DivisionBaseline>> {
        self(year)
    }
}

/// A lookup that never finds a baseline
pub fn no_baselines(_year: &str) -> Option<Arc<DivisionBaseline>> {
    None
}

/// Baseline provider over a league-wide record set
///
/// Samples are every numeric stat (bare numbers and `{ "value": x }` cells)
/// plus the schema's numeric aggregates, taken from records of the
/// requested year and, when records carry one, gender.
pub struct RecordSetStats {
    schema: Schema,
    records: Vec<Value>,
}

impl RecordSetStats {
    pub fn new(schema: Schema, records: Vec<Value>) -> Self {
        Self { schema, records }
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    fn in_division(&self, record: &Value, year: &str, gender: &str) -> bool {
        let year_matches = record
            .get("year")
            .and_then(scalar_text)
            .map_or(false, |y| y == year);
        let gender_matches = record
            .get("gender")
            .and_then(scalar_text)
            .map_or(true, |g| g == gender);
        year_matches && gender_matches
    }
}

impl DivisionStatsProvider for RecordSetStats {
    fn build_baseline(&self, year: &str, gender: &str) -> DivisionBaseline {
        let builder = SeasonViewBuilder::new(self.schema);
        let meta = self.schema.meta_fields();
        let mut fields: BTreeMap<String, Vec<f64>> = BTreeMap::new();

        for record in self.records.iter().filter(|r| self.in_division(r, year, gender)) {
            if let Value::Object(map) = record {
                for (key, value) in map.iter().filter(|(k, _)| !meta.contains(&k.as_str())) {
                    let mut path = FieldPath::root();
                    path.push_key(key.as_str());
                    collect_samples(value, &mut path, &mut fields);
                }
            }

            let view = builder.view(record);
            for name in self.schema.aggregate_fields() {
                if let Some(n) = view.derived(name).and_then(Value::as_f64) {
                    fields.entry(name.to_string()).or_default().push(n);
                }
            }
        }

        DivisionBaseline::new(year, gender, fields)
    }
}

/// Walks `value`, pushing every numeric leaf under its dotted path
fn collect_samples(value: &Value, path: &mut FieldPath, out: &mut BTreeMap<String, Vec<f64>>) {
    match value {
        Value::Number(n) => {
            if let Some(n) = n.as_f64() {
                out.entry(path.dotted()).or_default().push(n);
            }
        }
        Value::Object(map) => {
            if let Some(cell) = map.get("value") {
                collect_samples(cell, path, out);
                return;
            }
            for (key, child) in map {
                let mut child_path = path.clone();
                child_path.push_key(key.as_str());
                collect_samples(child, &mut child_path, out);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                let mut child_path = path.clone();
                child_path.push_index(i);
                collect_samples(child, &mut child_path, out);
            }
        }
        _ => {}
    }
}

/// Years may be stored as strings or numbers
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Explicit cache of built baselines keyed by (year, gender)
///
/// Baselines are shared as `Arc` snapshots. Replacing one swaps the pointer;
/// readers holding the old snapshot keep a consistent view.
#[derive(Debug, Default)]
pub struct BaselineCache {
    entries: RwLock<HashMap<(String, String), Arc<DivisionBaseline>>>,
}

impl BaselineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached baseline, if one was built
    pub fn get(&self, year: &str, gender: &str) -> Option<Arc<DivisionBaseline>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(&(year.to_string(), gender.to_string())).cloned()
    }

    /// Returns the cached baseline, building and caching it first if needed
    pub fn get_or_build(
        &self,
        provider: &dyn DivisionStatsProvider,
        year: &str,
        gender: &str,
    ) -> Arc<DivisionBaseline> {
        if let Some(existing) = self.get(year, gender) {
            return existing;
        }

        let built = Arc::new(provider.build_baseline(year, gender));
        let fields = built.fields.len().to_string();
        log_event_with_fields(
            Event::BaselineBuilt,
            &[("year", year), ("gender", gender), ("fields", &fields)],
        );

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries
            .entry((year.to_string(), gender.to_string()))
            .or_insert(built)
            .clone()
    }

    /// Publishes `baseline`, returning the snapshot it replaced
    pub fn replace(&self, baseline: DivisionBaseline) -> Option<Arc<DivisionBaseline>> {
        let key = (baseline.year.clone(), baseline.gender.clone());
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key, Arc::new(baseline))
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lookup handle for one gender
    pub fn scoped<'c>(&'c self, gender: &str) -> ScopedBaselines<'c> {
        ScopedBaselines {
            cache: self,
            gender: gender.to_string(),
        }
    }
}

/// [`BaselineCache`] view fixed to one gender
pub struct ScopedBaselines<'c> {
    cache: &'c BaselineCache,
    gender: String,
}

impl BaselineLookup for ScopedBaselines<'_> {
    fn baseline_for(&self, year: &str) -> Option<Arc<DivisionBaseline>> {
        self.cache.get(year, &self.gender)
    }
}
