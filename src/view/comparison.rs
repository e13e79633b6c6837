//! Comparison View Objects
//!
//! The raw record is a bundle of up to five seasons of one entity:
//!
//! ```text
//! { "prev": {...}, "next": {...}, "pred_ok": {...}, "pred_good": {...}, "pred_bad": {...} }
//! ```
//!
//! Each present slot becomes a single-season sub-view with its own grades.
//! The top level carries the identity record (next, else prev) and the
//! transfer fields derived by comparing prev and next.

use serde_json::Value;

use crate::grades::GradeContext;
use crate::resolver::{Schema, Slot};

use super::{SeasonViewBuilder, ViewBuilder, ViewObject};

#[derive(Debug, Clone, Copy)]
pub struct ComparisonViewBuilder {
    season: SeasonViewBuilder,
}

impl ComparisonViewBuilder {
    pub fn new(schema: Schema) -> Self {
        Self {
            season: SeasonViewBuilder::new(schema),
        }
    }

    fn entity_key(&self) -> &'static str {
        match self.season.schema() {
            Schema::Team => "team_name",
            Schema::Player => "team",
        }
    }
}

impl ViewBuilder for ComparisonViewBuilder {
    fn build<'r>(&self, record: &'r Value, grades: &GradeContext<'_>) -> ViewObject<'r> {
        let slot_record = |slot: Slot| record.get(slot.as_str()).filter(|v| v.is_object());

        let identity = slot_record(Slot::Next).or_else(|| slot_record(Slot::Prev));
        let mut top = ViewObject::new(identity);

        for slot in Slot::ALL {
            if let Some(season) = slot_record(slot) {
                let mut sub = self.season.view(season);
                let maps = grades.grades_for(Some(slot), &sub);
                sub.set_grades(maps);
                top.insert_slot(slot, sub);
            }
        }

        if self.season.schema() == Schema::Player {
            let key = self.entity_key();
            let team_of = |slot: Slot| {
                slot_record(slot)
                    .and_then(|r| r.get(key))
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
            };
            let moved = match (team_of(Slot::Prev), team_of(Slot::Next)) {
                (Some(from), Some(to)) if from != to => Some((from, to)),
                _ => None,
            };
            if let Some((from, to)) = moved {
                top.set_derived("tx_from", Value::from(from));
                top.set_derived("tx_to", Value::from(to));
            }
            top.set_derived("is_transfer", Value::from(moved.is_some()));
        }

        top
    }
}
