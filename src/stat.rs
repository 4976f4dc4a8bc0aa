// Statistic Shapes - Tagged result values and the one merge rule
//
// Every statistic yields exactly one of four shapes: a number, or a counter
// mapping nested one, two or three levels deep. One merge rule serves all of
// them: numbers add, counters union their keys and merge recursively. The
// rule is associative and commutative, so sequential folds and parallel
// tree-reduces agree exactly, and the same machinery aggregates at every
// hierarchy level without knowing which level it is at.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub type Counter1 = BTreeMap<String, Decimal>;
pub type Counter2 = BTreeMap<String, Counter1>;
pub type Counter3 = BTreeMap<String, Counter2>;

// ============================================================================
// SHAPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    Number,
    Counter1,
    Counter2,
    Counter3,
}

impl Shape {
    /// The fold identity for this shape: zero, or the empty mapping.
    pub fn identity(self) -> StatResult {
        match self {
            Shape::Number => StatResult::Number(Decimal::ZERO),
            Shape::Counter1 => StatResult::Counter1(Counter1::new()),
            Shape::Counter2 => StatResult::Counter2(Counter2::new()),
            Shape::Counter3 => StatResult::Counter3(Counter3::new()),
        }
    }
}

// ============================================================================
// STAT RESULT
// ============================================================================

/// A tagged statistic value. Immutable once returned by an evaluation;
/// merging always builds a new aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatResult {
    Number(Decimal),
    Counter1(Counter1),
    Counter2(Counter2),
    Counter3(Counter3),
}

impl StatResult {
    pub fn shape(&self) -> Shape {
        match self {
            StatResult::Number(_) => Shape::Number,
            StatResult::Counter1(_) => Shape::Counter1,
            StatResult::Counter2(_) => Shape::Counter2,
            StatResult::Counter3(_) => Shape::Counter3,
        }
    }

    pub fn count(n: u64) -> StatResult {
        StatResult::Number(Decimal::from(n))
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            StatResult::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_counter1(&self) -> Option<&Counter1> {
        match self {
            StatResult::Counter1(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_counter2(&self) -> Option<&Counter2> {
        match self {
            StatResult::Counter2(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_counter3(&self) -> Option<&Counter3> {
        match self {
            StatResult::Counter3(c) => Some(c),
            _ => None,
        }
    }

    /// Merge another value of the same shape into this one. A shape mismatch
    /// is a broken registry invariant; the offending value is dropped and
    /// logged rather than corrupting or aborting the aggregation.
    pub fn merge(&mut self, other: StatResult) {
        match (self, other) {
            (StatResult::Number(a), StatResult::Number(b)) => *a += b,
            (StatResult::Counter1(a), StatResult::Counter1(b)) => merge_counter1(a, b),
            (StatResult::Counter2(a), StatResult::Counter2(b)) => merge_counter2(a, b),
            (StatResult::Counter3(a), StatResult::Counter3(b)) => merge_counter3(a, b),
            (a, b) => {
                warn!(left = ?a.shape(), right = ?b.shape(), "shape mismatch in merge, dropping value");
            }
        }
    }
}

pub fn merge_counter1(a: &mut Counter1, b: Counter1) {
    for (key, value) in b {
        *a.entry(key).or_insert(Decimal::ZERO) += value;
    }
}

pub fn merge_counter2(a: &mut Counter2, b: Counter2) {
    for (key, value) in b {
        merge_counter1(a.entry(key).or_default(), value);
    }
}

pub fn merge_counter3(a: &mut Counter3, b: Counter3) {
    for (key, value) in b {
        merge_counter2(a.entry(key).or_default(), value);
    }
}

/// Increment a counter key by one.
pub fn bump(counter: &mut Counter1, key: impl Into<String>) {
    bump_by(counter, key, Decimal::ONE);
}

/// Increment a counter key by an arbitrary amount.
pub fn bump_by(counter: &mut Counter1, key: impl Into<String>, amount: Decimal) {
    *counter.entry(key.into()).or_insert(Decimal::ZERO) += amount;
}

// ============================================================================
// FOLD
// ============================================================================

/// Fold any number of same-shaped values into one. The empty sequence yields
/// the shape identity; a single value folds to itself. Usable at any
/// hierarchy boundary: record to file, file to publisher, publisher to
/// corpus.
pub fn fold<I>(shape: Shape, values: I) -> StatResult
where
    I: IntoIterator<Item = StatResult>,
{
    let mut acc = shape.identity();
    for value in values {
        acc.merge(value);
    }
    acc
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn c1(pairs: &[(&str, i64)]) -> StatResult {
        StatResult::Counter1(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), Decimal::from(*v)))
                .collect(),
        )
    }

    #[test]
    fn test_fold_empty_is_identity() {
        assert_eq!(fold(Shape::Number, []), StatResult::Number(Decimal::ZERO));
        assert_eq!(fold(Shape::Counter1, []), StatResult::Counter1(Counter1::new()));
        assert_eq!(fold(Shape::Counter3, []), StatResult::Counter3(Counter3::new()));
    }

    #[test]
    fn test_fold_singleton_is_itself() {
        let x = c1(&[("EUR", 3)]);
        assert_eq!(fold(Shape::Counter1, [x.clone()]), x);
    }

    #[test]
    fn test_counter1_union_sums_shared_keys() {
        let merged = fold(Shape::Counter1, [c1(&[("EUR", 3), ("USD", 1)]), c1(&[("EUR", 2)])]);
        assert_eq!(merged, c1(&[("EUR", 5), ("USD", 1)]));
    }

    #[test]
    fn test_merge_commutative_and_associative() {
        let values = [
            c1(&[("a", 1), ("b", 2)]),
            c1(&[("b", 3)]),
            c1(&[("c", 4), ("a", 1)]),
            c1(&[("d", 7)]),
        ];

        let sequential = fold(Shape::Counter1, values.clone());

        // Pairwise tree-reduce in a different grouping and order.
        let left = fold(Shape::Counter1, [values[3].clone(), values[0].clone()]);
        let right = fold(Shape::Counter1, [values[2].clone(), values[1].clone()]);
        let tree = fold(Shape::Counter1, [right, left]);

        assert_eq!(sequential, tree);
    }

    #[test]
    fn test_counter3_recursive_merge() {
        let mut a = Counter3::new();
        a.entry("D".into()).or_default().entry("EUR".into()).or_default().insert("2013".into(), Decimal::from(100));
        let mut b = Counter3::new();
        b.entry("D".into()).or_default().entry("EUR".into()).or_default().insert("2013".into(), Decimal::from(25));
        b.entry("D".into()).or_default().entry("GBP".into()).or_default().insert("2014".into(), Decimal::from(1));

        let merged = fold(Shape::Counter3, [StatResult::Counter3(a), StatResult::Counter3(b)]);
        let c = merged.as_counter3().unwrap();
        assert_eq!(c["D"]["EUR"]["2013"], Decimal::from(125));
        assert_eq!(c["D"]["GBP"]["2014"], Decimal::ONE);
    }

    #[test]
    fn test_shape_mismatch_drops_value() {
        let mut a = StatResult::Number(Decimal::ONE);
        a.merge(c1(&[("x", 1)]));
        assert_eq!(a, StatResult::Number(Decimal::ONE));
    }

    #[test]
    fn test_json_rendering_is_nested() {
        let merged = fold(Shape::Counter1, [c1(&[("EUR", 5)])]);
        let json = serde_json::to_value(&merged).unwrap();
        assert_eq!(json["EUR"], serde_json::json!("5"));
    }
}
