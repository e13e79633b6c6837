//! Sort-key ordering
//!
//! Keys are evaluated once per record and compared here. Ordering rules:
//! - missing keys (undefined, null, NaN) sort last in either direction
//! - across types: bool < number < string < object
//! - within a type, natural ordering
//!
//! Rows that compare equal on every key keep their input order.

use std::cmp::Ordering;

use crate::expr::{Scalar, SortDirection};

/// One matched record with its evaluated sort keys
#[derive(Debug, Clone)]
pub struct SortRow<T> {
    /// Position in the input
    pub index: usize,
    pub item: T,
    pub keys: Vec<Scalar>,
}

/// Sorts `rows` by their keys, each key in its own direction
pub fn sort_rows<T>(rows: &mut [SortRow<T>], directions: &[SortDirection]) {
    rows.sort_by(|a, b| compare_rows(&a.keys, &b.keys, directions).then(a.index.cmp(&b.index)));
}

fn compare_rows(a: &[Scalar], b: &[Scalar], directions: &[SortDirection]) -> Ordering {
    a.iter()
        .zip(b.iter())
        .zip(directions.iter())
        .map(|((x, y), direction)| compare_keys(x, y, *direction))
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// Compares two keys in `direction`; missing keys always go last
pub fn compare_keys(a: &Scalar, b: &Scalar, direction: SortDirection) -> Ordering {
    match (a.is_missing(), b.is_missing()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ordering = compare_present(a, b);
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        }
    }
}

fn compare_present(a: &Scalar, b: &Scalar) -> Ordering {
    let type_order = |v: &Scalar| -> u8 {
        match v {
            Scalar::Bool(_) => 0,
            Scalar::Number(_) => 1,
            Scalar::Str(_) => 2,
            _ => 3,
        }
    };

    match (a, b) {
        (Scalar::Bool(x), Scalar::Bool(y)) => x.cmp(y),
        (Scalar::Number(x), Scalar::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Scalar::Str(x), Scalar::Str(y)) => x.cmp(y),
        _ => type_order(a).cmp(&type_order(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Scalar {
        Scalar::Number(n)
    }

    fn rows(keys: Vec<Vec<Scalar>>) -> Vec<SortRow<usize>> {
        keys.into_iter()
            .enumerate()
            .map(|(index, keys)| SortRow { index, item: index, keys })
            .collect()
    }

    fn order(rows: &[SortRow<usize>]) -> Vec<usize> {
        rows.iter().map(|r| r.item).collect()
    }

    #[test]
    fn test_descending() {
        let mut r = rows(vec![vec![num(1.0)], vec![num(3.0)], vec![num(2.0)]]);
        sort_rows(&mut r, &[SortDirection::Desc]);
        assert_eq!(order(&r), vec![1, 2, 0]);
    }

    #[test]
    fn test_missing_last_both_directions() {
        let keys = vec![vec![Scalar::Undefined], vec![num(1.0)], vec![num(f64::NAN)], vec![num(2.0)]];

        let mut asc = rows(keys.clone());
        sort_rows(&mut asc, &[SortDirection::Asc]);
        assert_eq!(order(&asc), vec![1, 3, 0, 2]);

        let mut desc = rows(keys);
        sort_rows(&mut desc, &[SortDirection::Desc]);
        assert_eq!(order(&desc), vec![3, 1, 0, 2]);
    }

    #[test]
    fn test_multi_key() {
        let mut r = rows(vec![
            vec![num(1.0), num(5.0)],
            vec![num(2.0), num(9.0)],
            vec![num(1.0), num(3.0)],
        ]);
        sort_rows(&mut r, &[SortDirection::Desc, SortDirection::Asc]);
        assert_eq!(order(&r), vec![1, 2, 0]);
    }

    #[test]
    fn test_stable_on_ties() {
        let mut r = rows(vec![vec![num(1.0)], vec![num(1.0)], vec![num(1.0)]]);
        sort_rows(&mut r, &[SortDirection::Desc]);
        assert_eq!(order(&r), vec![0, 1, 2]);
    }

    #[test]
    fn test_cross_type_order() {
        assert_eq!(
            compare_keys(&Scalar::Bool(true), &num(0.0), SortDirection::Asc),
            Ordering::Less
        );
        assert_eq!(
            compare_keys(&num(9.0), &Scalar::Str("a".into()), SortDirection::Asc),
            Ordering::Less
        );
        assert_eq!(
            compare_keys(&Scalar::Null, &Scalar::Str("a".into()), SortDirection::Desc),
            Ordering::Greater
        );
    }
}
