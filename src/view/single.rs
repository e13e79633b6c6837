//! Single-season View Objects

use serde_json::Value;

use crate::grades::GradeContext;
use crate::resolver::Schema;
use crate::rewrite::{height_inches, normalize_height};

use super::{stat_number, ViewBuilder, ViewObject};

/// Wraps one team-season or player-season record
#[derive(Debug, Clone, Copy)]
pub struct SeasonViewBuilder {
    schema: Schema,
}

impl SeasonViewBuilder {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    /// View with derived fields and no grades
    pub fn view<'r>(&self, record: &'r Value) -> ViewObject<'r> {
        let mut view = ViewObject::new(Some(record));
        match self.schema {
            Schema::Team => derive_team(&mut view, record),
            Schema::Player => derive_player(&mut view, record),
        }
        view
    }
}

impl ViewBuilder for SeasonViewBuilder {
    fn build<'r>(&self, record: &'r Value, grades: &GradeContext<'_>) -> ViewObject<'r> {
        let mut view = self.view(record);
        let maps = grades.grades_for(None, &view);
        view.set_grades(maps);
        view
    }
}

fn derive_team(view: &mut ViewObject<'_>, record: &Value) {
    let stat = |name: &str| stat_number(record, name);

    let off = stat("off_adj_ppp").or_else(|| stat("off_ppp")).unwrap_or(0.0);
    let def = stat("def_adj_ppp").or_else(|| stat("def_ppp")).unwrap_or(0.0);
    view.set_derived("net_margin", Value::from(off - def));

    let raw = stat("off_ppp").unwrap_or(0.0) - stat("def_ppp").unwrap_or(0.0);
    view.set_derived("raw_margin", Value::from(raw));
}

fn derive_player(view: &mut ViewObject<'_>, record: &Value) {
    let stat = |name: &str| stat_number(record, name).unwrap_or(0.0);

    if let Some(height) = record.pointer("/roster/height").and_then(Value::as_str) {
        if let Some(norm) = normalize_height(height) {
            view.set_derived("height_norm", Value::from(norm));
        }
        if let Some(inches) = height_inches(height) {
            view.set_derived("height_in", Value::from(inches));
        }
    }

    let tx_from = non_empty_text(record.get("transfer_src"));
    let tx_to = non_empty_text(record.get("transfer_dest"));
    let is_transfer = tx_from.is_some() || tx_to.is_some();
    if let Some(from) = tx_from {
        view.set_derived("tx_from", Value::from(from));
    }
    if let Some(to) = tx_to {
        view.set_derived("tx_to", Value::from(to));
    }
    view.set_derived("is_transfer", Value::from(is_transfer));

    let off_net = stat("off_adj_rapm") * stat("off_team_poss_pct");
    let def_net = stat("def_adj_rapm") * stat("def_team_poss_pct");
    view.set_derived("off_net", Value::from(off_net));
    view.set_derived("def_net", Value::from(def_net));
    view.set_derived("net_margin", Value::from(off_net - def_net));
}

fn non_empty_text(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Scalar;
    use crate::resolver::FieldPath;
    use serde_json::json;

    fn agg(view: &ViewObject<'_>, name: &str) -> Scalar {
        view.resolve(&FieldPath::from_dotted(&format!("agg.{}", name)))
    }

    #[test]
    fn test_team_margins_prefer_adjusted() {
        let record = json!({
            "off_ppp": {"value": 1.10}, "def_ppp": {"value": 1.00},
            "off_adj_ppp": {"value": 1.20}, "def_adj_ppp": {"value": 0.95}
        });
        let view = SeasonViewBuilder::new(Schema::Team).view(&record);
        let net = agg(&view, "net_margin").as_number().unwrap();
        let raw = agg(&view, "raw_margin").as_number().unwrap();
        assert!((net - 0.25).abs() < 1e-9);
        assert!((raw - 0.10).abs() < 1e-9);
    }

    #[test]
    fn test_team_margin_defaults_to_zero() {
        let record = json!({"team_name": "Duke"});
        let view = SeasonViewBuilder::new(Schema::Team).view(&record);
        assert_eq!(agg(&view, "net_margin"), Scalar::Number(0.0));
    }

    #[test]
    fn test_player_height_and_transfer() {
        let record = json!({
            "code": "JoSmith",
            "roster": {"height": "6-7"},
            "transfer_src": "Duke",
            "transfer_dest": ""
        });
        let view = SeasonViewBuilder::new(Schema::Player).view(&record);
        assert_eq!(agg(&view, "height_norm"), Scalar::Str("6-07".into()));
        assert_eq!(agg(&view, "height_in"), Scalar::Number(79.0));
        assert_eq!(agg(&view, "tx_from"), Scalar::Str("Duke".into()));
        assert_eq!(agg(&view, "tx_to"), Scalar::Undefined);
        assert_eq!(agg(&view, "is_transfer"), Scalar::Bool(true));
    }

    #[test]
    fn test_player_net_ratings() {
        let record = json!({
            "off_adj_rapm": {"value": 4.0}, "off_team_poss_pct": {"value": 0.25},
            "def_adj_rapm": {"value": -2.0}, "def_team_poss_pct": {"value": 0.5}
        });
        let view = SeasonViewBuilder::new(Schema::Player).view(&record);
        assert_eq!(agg(&view, "off_net"), Scalar::Number(1.0));
        assert_eq!(agg(&view, "def_net"), Scalar::Number(-1.0));
        assert_eq!(agg(&view, "net_margin"), Scalar::Number(2.0));
    }

    #[test]
    fn test_player_missing_inputs() {
        let record = json!({"roster": null});
        let view = SeasonViewBuilder::new(Schema::Player).view(&record);
        assert_eq!(agg(&view, "height_norm"), Scalar::Undefined);
        assert_eq!(agg(&view, "is_transfer"), Scalar::Bool(false));
        assert_eq!(agg(&view, "net_margin"), Scalar::Number(0.0));
    }

    #[test]
    fn test_build_without_grades() {
        let record = json!({"year": "2020", "off_ppp": 1.0});
        let view = SeasonViewBuilder::new(Schema::Team).build(&record, &GradeContext::empty(Schema::Team));
        assert!(view.grades().is_empty());
    }
}
