//! Grade injection
//!
//! Ranks and percentiles are computed lazily: before evaluation the compiled
//! clauses are scanned for `rank`/`pctile` accessors, and only those fields
//! are graded for each record. A missing baseline leaves the grade
//! undefined; it is logged, never raised.
//!
//! Grade maps mirror the field path, so style sub-fields nest one level
//! deeper than flat stats:
//!
//! ```text
//! rank.off_ppp                      -> { "off_ppp": 6 }
//! rank.style.Transition.possPct     -> { "style": { "Transition": { "possPct": 12 } } }
//! ```

mod baseline;

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::expr::{Expr, FieldRef};
use crate::resolver::{FieldPath, GradeKind, PathSegment, Schema, Slot, TEAM_STATS_KEY};
use crate::view::ViewObject;

pub(crate) use baseline::scalar_text;
pub use baseline::{
    no_baselines, BaselineCache, BaselineLookup, DivisionBaseline, DivisionStatsProvider,
    PercentileSample, RecordSetStats, ScopedBaselines,
};

/// One graded field referenced by a query
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GradeRef {
    /// Comparison slot the grade lives under, `None` at top level
    pub slot: Option<Slot>,
    pub kind: GradeKind,
    /// Field path below the `rank`/`pctile` namespace
    pub field: FieldPath,
}

impl GradeRef {
    /// Recognises `$[.slot].(rank|pctile).<field>`
    pub fn from_path(path: &FieldPath) -> Option<Self> {
        let segments = path.segments();
        let (slot, rest) = match segments.first() {
            Some(PathSegment::Key(k)) => match Slot::parse(k) {
                Some(slot) => (Some(slot), &segments[1..]),
                None => (None, segments),
            },
            _ => return None,
        };
        let kind = match rest.first() {
            Some(PathSegment::Key(k)) => GradeKind::parse(k)?,
            _ => return None,
        };
        if rest.len() < 2 {
            return None;
        }
        Some(Self {
            slot,
            kind,
            field: FieldPath::from_segments(rest[1..].to_vec()),
        })
    }
}

/// Deduplicated set of grades a query needs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradeRequest {
    refs: BTreeSet<GradeRef>,
}

impl GradeRequest {
    /// Collects every grade accessor referenced by `exprs`
    pub fn scan<'e>(exprs: impl IntoIterator<Item = &'e Expr>) -> Self {
        let mut refs = BTreeSet::new();
        for expr in exprs {
            expr.for_each_field(&mut |field| {
                if let FieldRef::Path(path) = field {
                    if let Some(grade) = GradeRef::from_path(path) {
                        refs.insert(grade);
                    }
                }
            });
        }
        Self { refs }
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GradeRef> {
        self.refs.iter()
    }
}

/// The `rank` and `pctile` side channels of one View Object
#[derive(Debug, Clone, PartialEq)]
pub struct GradeMaps {
    rank: Value,
    pctile: Value,
}

impl Default for GradeMaps {
    fn default() -> Self {
        Self {
            rank: Value::Object(Map::new()),
            pctile: Value::Object(Map::new()),
        }
    }
}

impl GradeMaps {
    pub fn insert(&mut self, kind: GradeKind, field: &FieldPath, grade: f64) {
        let target = match kind {
            GradeKind::Rank => &mut self.rank,
            GradeKind::Pctile => &mut self.pctile,
        };
        insert_at(target, field.segments(), Value::from(grade));
    }

    pub fn map(&self, kind: GradeKind) -> &Value {
        match kind {
            GradeKind::Rank => &self.rank,
            GradeKind::Pctile => &self.pctile,
        }
    }

    pub fn is_empty(&self) -> bool {
        let empty = |v: &Value| v.as_object().map_or(true, Map::is_empty);
        empty(&self.rank) && empty(&self.pctile)
    }
}

/// Writes `leaf` at `segments`, creating objects and padding arrays as needed
fn insert_at(target: &mut Value, segments: &[PathSegment], leaf: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *target = leaf;
        return;
    };
    let child = match first {
        PathSegment::Key(key) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            match target {
                Value::Object(map) => map.entry(key.clone()).or_insert(Value::Null),
                _ => return,
            }
        }
        PathSegment::Index(i) => {
            if !target.is_array() {
                *target = Value::Array(Vec::new());
            }
            match target {
                Value::Array(items) => {
                    if items.len() <= *i {
                        items.resize(*i + 1, Value::Null);
                    }
                    &mut items[*i]
                }
                _ => return,
            }
        }
    };
    insert_at(child, rest, leaf);
}

struct EmptyDivision;

impl DivisionStatsProvider for EmptyDivision {
    fn build_baseline(&self, year: &str, gender: &str) -> DivisionBaseline {
        DivisionBaseline::new(year, gender, Default::default())
    }
}

/// Everything needed to grade records for one query
///
/// Baseline snapshots are resolved once per year and held for the rest of
/// the call, so a concurrent cache swap cannot mix two snapshots in one
/// result.
pub struct GradeContext<'a> {
    schema: Schema,
    request: GradeRequest,
    provider: &'a dyn DivisionStatsProvider,
    baselines: &'a dyn BaselineLookup,
    team_baselines: Option<&'a dyn BaselineLookup>,
    snapshots: RefCell<HashMap<(bool, String), Option<Arc<DivisionBaseline>>>>,
    unavailable: RefCell<BTreeSet<String>>,
}

impl<'a> GradeContext<'a> {
    pub fn new(
        schema: Schema,
        request: GradeRequest,
        provider: &'a dyn DivisionStatsProvider,
        baselines: &'a dyn BaselineLookup,
    ) -> Self {
        Self {
            schema,
            request,
            provider,
            baselines,
            team_baselines: None,
            snapshots: RefCell::new(HashMap::new()),
            unavailable: RefCell::new(BTreeSet::new()),
        }
    }

    /// Grades nothing
    pub fn empty(schema: Schema) -> GradeContext<'static> {
        GradeContext::new(schema, GradeRequest::default(), &EmptyDivision, &no_baselines)
    }

    /// Baselines for `team_stats.*` grades in player queries
    pub fn with_team_baselines(mut self, team_baselines: &'a dyn BaselineLookup) -> Self {
        self.team_baselines = Some(team_baselines);
        self
    }

    /// Years a grade was requested for but no baseline existed
    pub fn unavailable_years(&self) -> Vec<String> {
        self.unavailable.borrow().iter().cloned().collect()
    }

    /// Computes the grades `view` needs for `slot`
    pub fn grades_for(&self, slot: Option<Slot>, view: &ViewObject<'_>) -> GradeMaps {
        let mut maps = GradeMaps::default();
        let mut refs = self.request.iter().filter(|r| r.slot == slot).peekable();
        if refs.peek().is_none() {
            return maps;
        }
        let Some(year) = view.meta_text("year") else {
            return maps;
        };

        for grade in refs {
            let (team_scope, baseline_field) = self.baseline_field(&grade.field);
            let Some(baseline) = self.snapshot(team_scope, &year) else {
                self.unavailable.borrow_mut().insert(year.clone());
                continue;
            };
            let Some(value) = self.graded_value(view, &grade.field) else {
                continue;
            };
            let Some(sample) = self.provider.percentile_of(&baseline, &baseline_field, value)
            else {
                continue;
            };
            let grade_value = match grade.kind {
                GradeKind::Pctile => sample.value,
                GradeKind::Rank => sample.rank(),
            };
            maps.insert(grade.kind, &grade.field, grade_value);
        }
        maps
    }

    /// Player grades on `team_stats.<field>` read the team baseline
    fn baseline_field(&self, field: &FieldPath) -> (bool, String) {
        if self.schema == Schema::Player && field.head_key() == Some(TEAM_STATS_KEY) {
            (true, field.tail().dotted())
        } else {
            (false, field.dotted())
        }
    }

    fn snapshot(&self, team_scope: bool, year: &str) -> Option<Arc<DivisionBaseline>> {
        let key = (team_scope, year.to_string());
        if let Some(cached) = self.snapshots.borrow().get(&key) {
            return cached.clone();
        }
        let resolved = if team_scope {
            self.team_baselines.and_then(|lookup| lookup.baseline_for(year))
        } else {
            self.baselines.baseline_for(year)
        };
        self.snapshots.borrow_mut().insert(key, resolved.clone());
        resolved
    }

    /// The value being graded, read from the field's own namespace
    fn graded_value(&self, view: &ViewObject<'_>, field: &FieldPath) -> Option<f64> {
        let stem = field
            .segments()
            .iter()
            .filter_map(|s| match s {
                PathSegment::Key(k) => Some(k.as_str()),
                PathSegment::Index(_) => None,
            })
            .collect::<Vec<_>>()
            .join(".");
        let class = self.schema.classify(&stem)?;

        let mut segments = vec![PathSegment::Key(class.namespace().to_string())];
        segments.extend_from_slice(field.segments());
        view.resolve(&FieldPath::from_segments(segments)).as_number()
    }
}
