//! Query splitting and extra filters

use crate::rewrite::{tokenize, TokenKind};

/// Keyword separating the filter from each sort fragment
pub const SORT_KEYWORD: &str = "SORT_BY";

/// Filter used when a query has no filter text
pub const MATCH_ALL: &str = "ALL";

/// A query split into its fragments, before rewriting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParts<'q> {
    pub filter: &'q str,
    /// Sort fragments in priority order, direction keywords still attached
    pub sorts: Vec<&'q str>,
}

/// Splits `query` on `SORT_BY` keyword tokens
///
/// `SORT_BY` inside a quoted string is not a keyword. An empty filter
/// fragment matches everything and empty sort fragments are dropped. Text
/// the lexer rejects stays whole as the filter, so compiling it reports
/// the lexer error.
pub fn split_query(query: &str) -> QueryParts<'_> {
    let cuts: Vec<usize> = match tokenize(query) {
        Ok(tokens) => tokens
            .iter()
            .filter(|t| matches!(&t.kind, TokenKind::Ident(name) if name == SORT_KEYWORD))
            .map(|t| t.position)
            .collect(),
        Err(_) => Vec::new(),
    };

    let filter_end = cuts.first().copied().unwrap_or(query.len());
    let filter = query[..filter_end].trim();
    let filter = if filter.is_empty() { MATCH_ALL } else { filter };

    let sorts = cuts
        .iter()
        .enumerate()
        .map(|(i, &cut)| {
            let end = cuts.get(i + 1).copied().unwrap_or(query.len());
            query[cut + SORT_KEYWORD.len()..end].trim()
        })
        .filter(|fragment| !fragment.is_empty())
        .collect();

    QueryParts { filter, sorts }
}

/// A caller-supplied side filter ANDed onto the user's query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraFilter {
    /// Names the filter in error messages
    pub label: String,
    /// Query text, rewritten like the user's filter
    pub clause: String,
}

impl ExtraFilter {
    pub fn new(label: impl Into<String>, clause: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            clause: clause.into(),
        }
    }

    /// Keeps records whose `field` equals one of `values`
    ///
    /// Produces `(field == "a" || field == "b")`; an empty list matches
    /// nothing.
    pub fn allow_list<I, S>(label: impl Into<String>, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms: Vec<String> = values
            .into_iter()
            .map(|v| format!("{} == {}", field, TokenKind::Str(v.as_ref().to_string())))
            .collect();
        let clause = if terms.is_empty() {
            "false".to_string()
        } else {
            format!("({})", terms.join(" || "))
        };
        Self::new(label, clause)
    }
}
