//! Text rewrite pipeline
//!
//! Turns a user query fragment into canonical text the compiler accepts.
//! The fragment is tokenized once and every token is rewritten on its own,
//! by table lookup:
//!
//! - `AND`/`OR`/`NOT` become `&&`/`||`/`!`, bare `=` becomes `==`
//! - `NN%` becomes a fraction, `6-7` and `"6-7"` become `"6-07"`
//! - `ASC`/`DESC` are stripped and reported as the fragment's direction
//! - `ALL` becomes `exists($)`
//! - field tokens are aliased, given positional subscripts, and expanded
//!   into accessor paths
//!
//! Because each pass owns whole tokens, the order of passes cannot change
//! the result.

mod aliases;
mod lexer;
mod literals;

use crate::expr::{QueryResult, SortDirection};
use crate::resolver::{FieldResolver, FieldToken, RewriteMode};

pub use aliases::{canonical, position_index};
pub use lexer::{format_number, tokenize, Token, TokenKind};
pub use literals::{canonical_height, height_inches, normalize_height, percentage};

/// Output of rewriting one fragment
#[derive(Debug, Clone, PartialEq)]
pub struct Rewritten {
    /// Canonical text
    pub text: String,
    /// Last `ASC`/`DESC` keyword seen, if any
    pub direction: Option<SortDirection>,
}

/// Rewrites `query` for `mode`, returning only the canonical text
pub fn rewrite(query: &str, mode: &RewriteMode) -> QueryResult<String> {
    rewrite_fragment(query, mode).map(|r| r.text)
}

/// Rewrites `query` for `mode`
pub fn rewrite_fragment(query: &str, mode: &RewriteMode) -> QueryResult<Rewritten> {
    let tokens = tokenize(query)?;
    let resolver = FieldResolver::new(mode);

    let mut out: Vec<TokenKind> = Vec::with_capacity(tokens.len());
    let mut direction = None;
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i].kind {
            TokenKind::Ident(name) => match name.as_str() {
                "AND" => out.push(TokenKind::AndAnd),
                "OR" => out.push(TokenKind::OrOr),
                "NOT" => out.push(TokenKind::Bang),
                "ASC" => direction = Some(SortDirection::Asc),
                "DESC" => direction = Some(SortDirection::Desc),
                "ALL" => out.extend([
                    TokenKind::Ident("exists".to_string()),
                    TokenKind::LParen,
                    TokenKind::Path(Default::default()),
                    TokenKind::RParen,
                ]),
                "true" | "false" | "null" | "undefined" => out.push(tokens[i].kind.clone()),
                _ if matches!(tokens.get(i + 1).map(|t| &t.kind), Some(TokenKind::LParen)) => {
                    out.push(tokens[i].kind.clone())
                }
                _ => {
                    let mut field = FieldToken::parse(name, mode);
                    field.stem = canonical(mode.schema, &field.stem).to_string();

                    let subscript = subscript_at(&tokens, i + 1);
                    match resolver.resolve(&field, subscript) {
                        Some(path) => {
                            out.push(TokenKind::Path(path));
                            if subscript.is_some() {
                                i += 3;
                            }
                        }
                        None => out.push(tokens[i].kind.clone()),
                    }
                }
            },
            TokenKind::Assign => out.push(TokenKind::EqEq),
            TokenKind::Percent(value) => out.push(TokenKind::Number(percentage(*value))),
            TokenKind::Height { feet, inches } => {
                out.push(TokenKind::Str(canonical_height(*feet, *inches)))
            }
            TokenKind::Str(s) => {
                out.push(TokenKind::Str(normalize_height(s).unwrap_or_else(|| s.clone())))
            }
            other => out.push(other.clone()),
        }
        i += 1;
    }

    let text = out
        .iter()
        .map(|kind| kind.to_string())
        .collect::<Vec<_>>()
        .join(" ");

    Ok(Rewritten { text, direction })
}

/// `[PG]` or `[2]` directly after a field token
fn subscript_at(tokens: &[Token], start: usize) -> Option<usize> {
    let window = tokens.get(start..start + 3)?;
    match (&window[0].kind, &window[1].kind, &window[2].kind) {
        (TokenKind::LBracket, TokenKind::Ident(pos), TokenKind::RBracket) => position_index(pos),
        (TokenKind::LBracket, TokenKind::Number(n), TokenKind::RBracket)
            if n.fract() == 0.0 && *n >= 0.0 =>
        {
            Some(*n as usize)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{Schema, Slot};

    fn team(q: &str) -> String {
        rewrite(q, &RewriteMode::single(Schema::Team)).unwrap()
    }

    fn player(q: &str) -> String {
        rewrite(q, &RewriteMode::single(Schema::Player)).unwrap()
    }

    #[test]
    fn test_boolean_keywords() {
        assert_eq!(
            team("off_ppp > 1 AND def_ppp < 1 OR NOT conf = 'ACC'"),
            r#"$.stat.off_ppp > 1 && $.stat.def_ppp < 1 || ! $.meta.conf == "ACC""#
        );
    }

    #[test]
    fn test_all_sentinel() {
        assert_eq!(team("ALL"), "exists ( $ )");
    }

    #[test]
    fn test_percent_literal() {
        assert_eq!(team("efg >= 52%"), "$.stat.off_efg >= 0.52");
    }

    #[test]
    fn test_height_literal() {
        assert_eq!(player("height >= 6-7"), r#"$.agg.height_norm >= "6-07""#);
        assert_eq!(player("height == '6-7'"), r#"$.agg.height_norm == "6-07""#);
    }

    #[test]
    fn test_height_literal_after_keyword() {
        let keyword = player("off_rtg > 100 AND 6-7 <= height");
        assert_eq!(keyword, player("off_rtg > 100 && 6-7 <= height"));
        assert!(keyword.contains(r#""6-07" <= $.agg.height_norm"#), "{}", keyword);

        assert_eq!(player("NOT 6-7 == height"), player("! 6-7 == height"));
        assert_eq!(player("off_rtg > 1 OR 6-7 == height"), player("off_rtg > 1 || 6-7 == height"));
    }

    #[test]
    fn test_positional_subscript() {
        assert_eq!(player("posFreqs[PG] > 0.5"), "$.stat.posFreqs[0] > 0.5");
        assert_eq!(player("posFreqs[4] > 0.5"), "$.stat.posFreqs[4] > 0.5");
    }

    #[test]
    fn test_unknown_identifier_passes_through() {
        assert_eq!(team("banana > 3"), "banana > 3");
    }

    #[test]
    fn test_function_names_untouched() {
        assert_eq!(team("abs(net_margin) < 5"), "abs ( $.agg.net_margin ) < 5");
        // "to" is an alias, but not when called
        assert_eq!(team("to(1)"), "to ( 1 )");
    }

    #[test]
    fn test_direction_stripped() {
        let r = rewrite_fragment("off_ppp ASC", &RewriteMode::single(Schema::Team)).unwrap();
        assert_eq!(r.text, "$.stat.off_ppp");
        assert_eq!(r.direction, Some(SortDirection::Asc));

        let r = rewrite_fragment("off_ppp", &RewriteMode::single(Schema::Team)).unwrap();
        assert_eq!(r.direction, None);
    }

    #[test]
    fn test_alias_inside_grade_and_slot() {
        let mode = RewriteMode::comparison(Schema::Player, Slot::Prev);
        assert_eq!(
            rewrite("next_rank_ortg <= 10", &mode).unwrap(),
            "$.next.rank.off_rtg <= 10"
        );
    }

    #[test]
    fn test_rewrite_is_idempotent_on_canonical_text() {
        let once = team("rank_off_ppp <= 10 && margin > 3");
        let twice = team(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_lexer_error_propagates() {
        assert!(rewrite("conf == 'ACC", &RewriteMode::single(Schema::Team)).is_err());
    }
}
