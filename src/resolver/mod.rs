//! Field-path resolver
//!
//! Maps a bare field token to a `$`-rooted accessor path on the View
//! Object. The mapping depends on the schema (team or player) and on
//! whether the query runs in comparison mode, where the record is a bundle
//! of related seasons held under named slots.
//!
//! # Accessor shapes
//!
//! ```text
//! $[.slot].stat.<path>     raw per-entity stat
//! $[.slot].agg.<name>      aggregate precomputed on the View Object
//! $[.slot].meta.<path>     roster / metadata
//! $[.slot].rank.<path>     rank side channel
//! $[.slot].pctile.<path>   percentile side channel
//! ```
//!
//! Tokens that map to none of these are left alone; they fail when a
//! record is evaluated, not here.

mod fields;
mod path;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use fields::{FieldClass, Schema, COMPARISON_AGGREGATES, TEAM_STATS_KEY};
pub use path::{lookup_segments, FieldPath, PathSegment};

/// A named season slot of a comparison record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Prev,
    Next,
    PredOk,
    PredGood,
    PredBad,
}

impl Slot {
    /// All slots, in bundle order
    pub const ALL: [Slot; 5] = [
        Slot::Prev,
        Slot::Next,
        Slot::PredOk,
        Slot::PredGood,
        Slot::PredBad,
    ];

    /// Key of the slot in a comparison bundle and in accessor paths
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Prev => "prev",
            Slot::Next => "next",
            Slot::PredOk => "pred_ok",
            Slot::PredGood => "pred_good",
            Slot::PredBad => "pred_bad",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.as_str() == name)
    }

    /// Peels a `prev_`-style prefix off a field token
    fn strip_prefix(token: &str) -> Option<(Slot, &str)> {
        Self::ALL.iter().find_map(|slot| {
            token
                .strip_prefix(slot.as_str())
                .and_then(|rest| rest.strip_prefix('_'))
                .filter(|rest| !rest.is_empty())
                .map(|rest| (*slot, rest))
        })
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rank or percentile
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GradeKind {
    Rank,
    Pctile,
}

impl GradeKind {
    /// View Object namespace of the side channel
    pub fn as_str(&self) -> &'static str {
        match self {
            GradeKind::Rank => "rank",
            GradeKind::Pctile => "pctile",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "rank" => Some(GradeKind::Rank),
            "pctile" => Some(GradeKind::Pctile),
            _ => None,
        }
    }

    fn strip_prefix(token: &str) -> Option<(GradeKind, &str)> {
        [GradeKind::Rank, GradeKind::Pctile]
            .iter()
            .find_map(|kind| {
                token
                    .strip_prefix(kind.as_str())
                    .and_then(|rest| rest.strip_prefix('_'))
                    .filter(|rest| !rest.is_empty())
                    .map(|rest| (*kind, rest))
            })
    }
}

/// How field tokens of one query fragment are expanded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteMode {
    pub schema: Schema,
    /// Default slot for unprefixed fields; `None` outside comparison mode
    pub comparison: Option<Slot>,
}

impl RewriteMode {
    /// Single-season mode
    pub fn single(schema: Schema) -> Self {
        Self {
            schema,
            comparison: None,
        }
    }

    /// Comparison mode with the slot unprefixed fields fall back to
    pub fn comparison(schema: Schema, default_slot: Slot) -> Self {
        Self {
            schema,
            comparison: Some(default_slot),
        }
    }

    pub fn is_comparison(&self) -> bool {
        self.comparison.is_some()
    }
}

/// A field token split into its prefixes and stem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldToken {
    pub slot: Option<Slot>,
    pub grade: Option<GradeKind>,
    pub stem: String,
}

impl FieldToken {
    /// Splits `[slot_][rank_|pctile_]stem`. Slot prefixes are only
    /// recognised in comparison mode.
    pub fn parse(token: &str, mode: &RewriteMode) -> Self {
        let (slot, rest) = match Slot::strip_prefix(token) {
            Some((slot, rest)) if mode.is_comparison() => (Some(slot), rest),
            _ => (None, token),
        };
        let (grade, stem) = match GradeKind::strip_prefix(rest) {
            Some((kind, stem)) => (Some(kind), stem),
            None => (None, rest),
        };
        Self {
            slot,
            grade,
            stem: stem.to_string(),
        }
    }
}

/// Expands field tokens into accessor paths for one rewrite mode
pub struct FieldResolver<'m> {
    mode: &'m RewriteMode,
}

impl<'m> FieldResolver<'m> {
    pub fn new(mode: &'m RewriteMode) -> Self {
        Self { mode }
    }

    /// Resolves a parsed token. `index` is a trailing `[n]` subscript.
    pub fn resolve(&self, token: &FieldToken, index: Option<usize>) -> Option<FieldPath> {
        let class = self.mode.schema.classify(&token.stem)?;
        if token.grade.is_some() && !class.is_gradeable() {
            return None;
        }

        let mut path = FieldPath::root();
        if let Some(default_slot) = self.mode.comparison {
            match token.slot {
                Some(slot) => path.push_key(slot.as_str()),
                None if self.is_top_level(class, &token.stem) => {}
                None => path.push_key(default_slot.as_str()),
            }
        }

        match token.grade {
            Some(kind) => path.push_key(kind.as_str()),
            None => path.push_key(class.namespace()),
        }
        path.push_dotted(&token.stem);

        if let Some(i) = index {
            path.push_index(i);
        }
        Some(path)
    }

    /// Comparison views keep identity metadata and transfer flags at top level
    fn is_top_level(&self, class: FieldClass, stem: &str) -> bool {
        match class {
            FieldClass::Meta => true,
            FieldClass::Aggregate => COMPARISON_AGGREGATES.contains(&stem),
            FieldClass::Stat => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(token: &str, mode: RewriteMode) -> Option<String> {
        let parsed = FieldToken::parse(token, &mode);
        FieldResolver::new(&mode)
            .resolve(&parsed, None)
            .map(|p| p.to_string())
    }

    #[test]
    fn test_single_season_shapes() {
        let mode = RewriteMode::single(Schema::Team);
        assert_eq!(resolve("off_ppp", mode).as_deref(), Some("$.stat.off_ppp"));
        assert_eq!(resolve("net_margin", mode).as_deref(), Some("$.agg.net_margin"));
        assert_eq!(resolve("team_name", mode).as_deref(), Some("$.meta.team_name"));
        assert_eq!(
            resolve("style.Transition.possPct", mode).as_deref(),
            Some("$.stat.style.Transition.possPct")
        );
    }

    #[test]
    fn test_grades() {
        let mode = RewriteMode::single(Schema::Team);
        assert_eq!(resolve("rank_off_ppp", mode).as_deref(), Some("$.rank.off_ppp"));
        assert_eq!(
            resolve("pctile_style.Transition.possPct", mode).as_deref(),
            Some("$.pctile.style.Transition.possPct")
        );
        // Metadata has no grade
        assert_eq!(resolve("rank_team_name", mode), None);
    }

    #[test]
    fn test_unknown_token_unresolved() {
        assert_eq!(resolve("banana", RewriteMode::single(Schema::Team)), None);
        // Slot prefixes mean nothing outside comparison mode
        assert_eq!(resolve("prev_off_rtg", RewriteMode::single(Schema::Player)), None);
    }

    #[test]
    fn test_comparison_slots() {
        let mode = RewriteMode::comparison(Schema::Player, Slot::Prev);
        assert_eq!(
            resolve("next_off_rtg", mode).as_deref(),
            Some("$.next.stat.off_rtg")
        );
        assert_eq!(
            resolve("pred_good_off_rtg", mode).as_deref(),
            Some("$.pred_good.stat.off_rtg")
        );
        assert_eq!(
            resolve("next_rank_off_rtg", mode).as_deref(),
            Some("$.next.rank.off_rtg")
        );
        assert_eq!(resolve("off_rtg", mode).as_deref(), Some("$.prev.stat.off_rtg"));
    }

    #[test]
    fn test_comparison_top_level_fields() {
        let mode = RewriteMode::comparison(Schema::Player, Slot::Next);
        assert_eq!(resolve("code", mode).as_deref(), Some("$.meta.code"));
        assert_eq!(resolve("tx_from", mode).as_deref(), Some("$.agg.tx_from"));
        assert_eq!(resolve("off_net", mode).as_deref(), Some("$.next.agg.off_net"));
        assert_eq!(
            resolve("prev_roster.height", mode).as_deref(),
            Some("$.prev.meta.roster.height")
        );
    }

    #[test]
    fn test_index_suffix() {
        let mode = RewriteMode::single(Schema::Player);
        let token = FieldToken::parse("posFreqs", &mode);
        let path = FieldResolver::new(&mode).resolve(&token, Some(3)).unwrap();
        assert_eq!(path.to_string(), "$.stat.posFreqs[3]");
    }

    #[test]
    fn test_slot_parse_roundtrip() {
        for slot in Slot::ALL {
            assert_eq!(Slot::parse(slot.as_str()), Some(slot));
        }
        assert_eq!(Slot::parse("current"), None);
    }
}
