//! View Objects
//!
//! A View Object is the per-record evaluation context: the raw record, the
//! aggregates derived from it, the `rank`/`pctile` side channels, and in
//! comparison mode one sub-view per season slot.
//!
//! Views borrow their record and are rebuilt on every query. Building one
//! never fails; missing inputs become 0 or undefined.

mod comparison;
mod single;

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::expr::{FieldSource, Scalar};
use crate::grades::{scalar_text, GradeContext, GradeMaps};
use crate::resolver::{lookup_segments, FieldPath, GradeKind, PathSegment, Slot};

pub use comparison::ComparisonViewBuilder;
pub use single::SeasonViewBuilder;

/// Builds one View Object per raw record
pub trait ViewBuilder {
    fn build<'r>(&self, record: &'r Value, grades: &GradeContext<'_>) -> ViewObject<'r>;
}

/// Per-record evaluation context
#[derive(Debug, Clone, PartialEq)]
pub struct ViewObject<'r> {
    record: Option<&'r Value>,
    derived: Value,
    grades: GradeMaps,
    slots: BTreeMap<Slot, ViewObject<'r>>,
}

impl<'r> ViewObject<'r> {
    pub fn new(record: Option<&'r Value>) -> Self {
        Self {
            record,
            derived: Value::Object(Map::new()),
            grades: GradeMaps::default(),
            slots: BTreeMap::new(),
        }
    }

    pub fn record(&self) -> Option<&'r Value> {
        self.record
    }

    pub fn set_derived(&mut self, name: &str, value: Value) {
        if let Value::Object(map) = &mut self.derived {
            map.insert(name.to_string(), value);
        }
    }

    pub fn derived(&self, name: &str) -> Option<&Value> {
        self.derived.get(name)
    }

    pub fn grades(&self) -> &GradeMaps {
        &self.grades
    }

    pub fn set_grades(&mut self, grades: GradeMaps) {
        self.grades = grades;
    }

    pub fn insert_slot(&mut self, slot: Slot, view: ViewObject<'r>) {
        self.slots.insert(slot, view);
    }

    pub fn slot(&self, slot: Slot) -> Option<&ViewObject<'r>> {
        self.slots.get(&slot)
    }

    /// Top-level record field rendered as text (years may be numbers)
    pub fn meta_text(&self, key: &str) -> Option<String> {
        self.record?.get(key).and_then(scalar_text)
    }

    /// Resolves an accessor path; any missing link is `Undefined`
    pub fn resolve(&self, path: &FieldPath) -> Scalar {
        self.resolve_segments(path.segments())
    }

    fn resolve_segments(&self, segments: &[PathSegment]) -> Scalar {
        let Some((PathSegment::Key(head), rest)) = segments.split_first() else {
            return Scalar::Undefined;
        };

        if let Some(slot) = Slot::parse(head) {
            return match self.slots.get(&slot) {
                Some(view) => view.resolve_segments(rest),
                None => Scalar::Undefined,
            };
        }

        match head.as_str() {
            "stat" => Scalar::from(self.lookup_record(rest).map(unwrap_cell)),
            "meta" => Scalar::from(self.lookup_record(rest)),
            "agg" => Scalar::from(lookup_segments(&self.derived, rest)),
            other => match GradeKind::parse(other) {
                Some(kind) => Scalar::from(lookup_segments(self.grades.map(kind), rest)),
                None => Scalar::Undefined,
            },
        }
    }

    fn lookup_record(&self, segments: &[PathSegment]) -> Option<&'r Value> {
        let record = self.record?;
        if segments.is_empty() {
            return None;
        }
        lookup_segments(record, segments)
    }
}

impl FieldSource for ViewObject<'_> {
    fn field(&self, path: &FieldPath) -> Scalar {
        self.resolve(path)
    }
}

/// Stat cells are `{ "value": x, ... }`; anything else reads as itself
pub(crate) fn unwrap_cell(value: &Value) -> &Value {
    match value {
        Value::Object(map) => map.get("value").unwrap_or(value),
        other => other,
    }
}

/// Numeric stat by dotted name, unwrapping cells
pub(crate) fn stat_number(record: &Value, dotted: &str) -> Option<f64> {
    FieldPath::from_dotted(dotted)
        .lookup(record)
        .map(unwrap_cell)
        .and_then(Value::as_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(dotted: &str) -> FieldPath {
        FieldPath::from_dotted(dotted)
    }

    #[test]
    fn test_stat_cells_unwrap() {
        let record = json!({"off_ppp": {"value": 1.1, "old_value": 1.0}, "def_ppp": 0.9});
        let view = ViewObject::new(Some(&record));
        assert_eq!(view.resolve(&path("stat.off_ppp")), Scalar::Number(1.1));
        assert_eq!(view.resolve(&path("stat.def_ppp")), Scalar::Number(0.9));
        assert_eq!(view.resolve(&path("meta.off_ppp")), Scalar::Compound);
    }

    #[test]
    fn test_namespaces() {
        let record = json!({"conf": "ACC"});
        let mut view = ViewObject::new(Some(&record));
        view.set_derived("net_margin", json!(3.5));
        let mut grades = GradeMaps::default();
        grades.insert(GradeKind::Pctile, &path("off_ppp"), 0.5);
        view.set_grades(grades);

        assert_eq!(view.resolve(&path("meta.conf")), Scalar::Str("ACC".into()));
        assert_eq!(view.resolve(&path("agg.net_margin")), Scalar::Number(3.5));
        assert_eq!(view.resolve(&path("pctile.off_ppp")), Scalar::Number(0.5));
        assert_eq!(view.resolve(&path("rank.off_ppp")), Scalar::Undefined);
        assert_eq!(view.resolve(&path("bogus.x")), Scalar::Undefined);
        assert_eq!(view.resolve(&path("stat")), Scalar::Undefined);
    }

    #[test]
    fn test_slots() {
        let prev = json!({"off_rtg": 100});
        let mut view = ViewObject::new(None);
        view.insert_slot(Slot::Prev, ViewObject::new(Some(&prev)));

        assert_eq!(view.resolve(&path("prev.stat.off_rtg")), Scalar::Number(100.0));
        assert_eq!(view.resolve(&path("next.stat.off_rtg")), Scalar::Undefined);
        assert_eq!(view.resolve(&path("stat.off_rtg")), Scalar::Undefined);
    }

    #[test]
    fn test_meta_text() {
        let record = json!({"year": 2020, "team": "Duke"});
        let view = ViewObject::new(Some(&record));
        assert_eq!(view.meta_text("year").as_deref(), Some("2020"));
        assert_eq!(view.meta_text("team").as_deref(), Some("Duke"));
        assert_eq!(view.meta_text("conf"), None);
    }
}
