//! Schema field tables
//!
//! Every bare field name belongs to exactly one accessor shape: a raw
//! per-entity stat, a precomputed aggregate living on the View Object, or
//! roster/metadata read verbatim from the record.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which kind of record a query runs over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Schema {
    Team,
    Player,
}

impl Schema {
    pub fn as_str(&self) -> &'static str {
        match self {
            Schema::Team => "team",
            Schema::Player => "player",
        }
    }

    /// Metadata fields (first path segment)
    pub fn meta_fields(&self) -> &'static [&'static str] {
        match self {
            Schema::Team => TEAM_META,
            Schema::Player => PLAYER_META,
        }
    }

    /// Aggregates the single-season builder derives
    pub fn aggregate_fields(&self) -> &'static [&'static str] {
        match self {
            Schema::Team => TEAM_AGGREGATES,
            Schema::Player => PLAYER_AGGREGATES,
        }
    }

    /// Classifies a canonical (already aliased) field name
    pub fn classify(&self, stem: &str) -> Option<FieldClass> {
        let head = stem.split('.').next().unwrap_or(stem);

        if head == stem && self.aggregate_fields().contains(&stem) {
            return Some(FieldClass::Aggregate);
        }
        if self.meta_fields().contains(&head) {
            return Some(FieldClass::Meta);
        }
        if head.starts_with("off_")
            || head.starts_with("def_")
            || STAT_GROUPS.contains(&head)
            || (*self == Schema::Player && head == TEAM_STATS_KEY)
        {
            return Some(FieldClass::Stat);
        }
        None
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Accessor shape of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    /// Raw per-entity stat, read through `{ "value": x }` cells
    Stat,
    /// Precomputed aggregate on the View Object
    Aggregate,
    /// Roster/metadata, read verbatim
    Meta,
}

impl FieldClass {
    /// View Object namespace the accessor path starts with
    pub fn namespace(&self) -> &'static str {
        match self {
            FieldClass::Stat => "stat",
            FieldClass::Aggregate => "agg",
            FieldClass::Meta => "meta",
        }
    }

    pub fn is_gradeable(&self) -> bool {
        !matches!(self, FieldClass::Meta)
    }
}

/// Key under which a player record embeds its team's season
pub const TEAM_STATS_KEY: &str = "team_stats";

const TEAM_META: &[&str] = &["team_name", "conf", "year", "gender"];

const PLAYER_META: &[&str] = &[
    "code",
    "key",
    "team",
    "conf",
    "year",
    "gender",
    "posClass",
    "roster",
    "transfer_src",
    "transfer_dest",
];

const TEAM_AGGREGATES: &[&str] = &["net_margin", "raw_margin"];

const PLAYER_AGGREGATES: &[&str] = &[
    "height_norm",
    "height_in",
    "tx_from",
    "tx_to",
    "is_transfer",
    "off_net",
    "def_net",
    "net_margin",
];

/// Stat groups that are not `off_`/`def_` prefixed
const STAT_GROUPS: &[&str] = &["style", "posFreqs"];

/// Aggregates a comparison view derives at top level from its prev/next slots
pub const COMPARISON_AGGREGATES: &[&str] = &["tx_from", "tx_to", "is_transfer"];
