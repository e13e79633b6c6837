//! Whole-token alias tables
//!
//! Friendly names map to canonical field stems. Lookup is by whole token
//! only, so no alias can collide with part of another name.

use crate::resolver::Schema;

const SHARED_ALIASES: &[(&str, &str)] = &[
    ("ortg", "off_rtg"),
    ("drtg", "def_rtg"),
    ("efg", "off_efg"),
    ("ppp", "off_ppp"),
    ("to", "off_to"),
    ("ftr", "off_ftr"),
    ("usg", "off_usage"),
    ("usage", "off_usage"),
    ("poss", "off_team_poss_pct"),
    ("poss_pct", "off_team_poss_pct"),
    ("margin", "net_margin"),
    ("adj_margin", "net_margin"),
    ("conference", "conf"),
];

const TEAM_ALIASES: &[(&str, &str)] = &[("name", "team_name")];

const PLAYER_ALIASES: &[(&str, &str)] = &[
    ("name", "key"),
    ("rapm", "off_adj_rapm"),
    ("height", "height_norm"),
    ("inches", "height_in"),
    ("class", "roster.year_class"),
    ("pos", "posClass"),
];

const POSITIONS: &[(&str, usize)] = &[("PG", 0), ("SG", 1), ("SF", 2), ("PF", 3), ("C", 4)];

/// Returns the canonical stem for `token`, or `token` itself
pub fn canonical<'t>(schema: Schema, token: &'t str) -> &'t str {
    let schema_table = match schema {
        Schema::Team => TEAM_ALIASES,
        Schema::Player => PLAYER_ALIASES,
    };
    schema_table
        .iter()
        .chain(SHARED_ALIASES.iter())
        .find(|(alias, _)| *alias == token)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(token)
}

/// Array index of a positional shorthand (`PG` .. `C`)
pub fn position_index(name: &str) -> Option<usize> {
    POSITIONS
        .iter()
        .find(|(pos, _)| pos.eq_ignore_ascii_case(name))
        .map(|(_, index)| *index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_alias() {
        assert_eq!(canonical(Schema::Team, "efg"), "off_efg");
        assert_eq!(canonical(Schema::Player, "ortg"), "off_rtg");
    }

    #[test]
    fn test_schema_specific_alias() {
        assert_eq!(canonical(Schema::Team, "name"), "team_name");
        assert_eq!(canonical(Schema::Player, "name"), "key");
        assert_eq!(canonical(Schema::Team, "height"), "height");
        assert_eq!(canonical(Schema::Player, "height"), "height_norm");
    }

    #[test]
    fn test_whole_token_only() {
        // "to" must not rewrite the inside of other names
        assert_eq!(canonical(Schema::Team, "total"), "total");
        assert_eq!(canonical(Schema::Team, "off_to"), "off_to");
        assert_eq!(canonical(Schema::Team, "efg_x"), "efg_x");
    }

    #[test]
    fn test_positions() {
        assert_eq!(position_index("PG"), Some(0));
        assert_eq!(position_index("pf"), Some(3));
        assert_eq!(position_index("C"), Some(4));
        assert_eq!(position_index("G"), None);
    }
}
