//! Pure range arithmetic: depth assignment, integrity checks, flattening.

use std::fmt;

use serde::Serialize;

use super::schema::{Bounds, Leveled, NestedRecord};

/// Left bound of the first real node; `1` belongs to the implicit root.
pub const FIRST_LEFT: i64 = 2;

/// Annotate rows sorted by ascending left bound with their depth.
///
/// `base` is the level given to nodes with no listed ancestor.
pub fn with_levels<T: NestedRecord>(rows: Vec<T>, base: i64) -> Vec<Leveled<T>> {
    let mut open: Vec<i64> = Vec::new();

    rows.into_iter()
        .map(|node| {
            while open.last().is_some_and(|&right| right < node.left()) {
                open.pop();
            }
            let level = base + open.len() as i64;
            open.push(node.right());
            Leveled { node, level }
        })
        .collect()
}

/// A broken structural invariant found by [`verify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RangeViolation {
    /// `left >= right`.
    Inverted { id: i64, left: i64, right: i64 },
    /// The same integer is used as a bound twice.
    Duplicate { value: i64 },
    /// Two ranges overlap without one containing the other.
    Overlap { outer: i64, inner: i64 },
    /// Numbering is not contiguous from [`FIRST_LEFT`].
    Gap { expected: i64, found: i64 },
}

impl fmt::Display for RangeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inverted { id, left, right } => {
                write!(f, "node {id} has left {left} >= right {right}")
            }
            Self::Duplicate { value } => write!(f, "bound {value} is used more than once"),
            Self::Overlap { outer, inner } => {
                write!(f, "node {inner} overlaps node {outer} without nesting")
            }
            Self::Gap { expected, found } => {
                write!(f, "numbering jumps from {expected} to {found}")
            }
        }
    }
}

/// Check a scope's ranges against the nested-set invariants.
pub fn verify(ranges: &[Bounds]) -> Vec<RangeViolation> {
    let mut violations = Vec::new();

    for b in ranges {
        if b.left >= b.right {
            violations.push(RangeViolation::Inverted {
                id: b.id,
                left: b.left,
                right: b.right,
            });
        }
    }

    let mut endpoints: Vec<i64> = ranges.iter().flat_map(|b| [b.left, b.right]).collect();
    endpoints.sort_unstable();
    for pair in endpoints.windows(2) {
        if pair[0] == pair[1] {
            violations.push(RangeViolation::Duplicate { value: pair[0] });
        }
    }
    if let Some((offset, &found)) = endpoints
        .iter()
        .enumerate()
        .find(|&(i, &v)| v != FIRST_LEFT + i as i64)
    {
        violations.push(RangeViolation::Gap {
            expected: FIRST_LEFT + offset as i64,
            found,
        });
    }

    let mut sorted = ranges.to_vec();
    sorted.sort_by_key(|b| b.left);
    let mut open: Vec<Bounds> = Vec::new();
    for b in sorted {
        while open.last().is_some_and(|top| top.right < b.left) {
            open.pop();
        }
        if let Some(top) = open.last().filter(|top| b.right > top.right) {
            violations.push(RangeViolation::Overlap {
                outer: top.id,
                inner: b.id,
            });
        }
        open.push(b);
    }

    violations
}

/// Lay every node out as a top-level leaf in current left-to-right order,
/// numbered contiguously from [`FIRST_LEFT`]. Output is sorted by new left
/// bound.
pub fn flatten(ranges: &[Bounds]) -> Vec<Bounds> {
    let mut sorted = ranges.to_vec();
    sorted.sort_by_key(|b| (b.left, b.id));

    sorted
        .into_iter()
        .zip((FIRST_LEFT..).step_by(2))
        .map(|(b, left)| Bounds {
            id: b.id,
            left,
            right: left + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(id: i64, left: i64, right: i64) -> Bounds {
        Bounds { id, left, right }
    }

    #[test]
    fn levels_follow_containment() {
        // 1 ( 2 ( 3 ) ) 4
        let rows = vec![b(1, 2, 7), b(2, 3, 6), b(3, 4, 5), b(4, 8, 9)];
        let levels: Vec<(i64, i64)> = with_levels(rows, 1)
            .into_iter()
            .map(|l| (l.node.id, l.level))
            .collect();
        assert_eq!(levels, vec![(1, 1), (2, 2), (3, 3), (4, 1)]);
    }

    #[test]
    fn levels_from_subtree_start_at_zero() {
        let rows = vec![b(2, 3, 8), b(3, 4, 5), b(5, 6, 7)];
        let levels: Vec<i64> = with_levels(rows, 0).into_iter().map(|l| l.level).collect();
        assert_eq!(levels, vec![0, 1, 1]);
    }

    #[test]
    fn verify_accepts_well_formed_tree() {
        let ranges = vec![b(1, 2, 7), b(2, 3, 4), b(3, 5, 6), b(4, 8, 9)];
        assert!(verify(&ranges).is_empty());
        assert!(verify(&[]).is_empty());
    }

    #[test]
    fn verify_reports_each_kind() {
        let inverted = verify(&[b(1, 3, 2)]);
        assert!(inverted.contains(&RangeViolation::Inverted {
            id: 1,
            left: 3,
            right: 2
        }));

        let overlap = verify(&[b(1, 2, 5), b(2, 3, 6), b(3, 4, 7)]);
        assert!(overlap.contains(&RangeViolation::Overlap { outer: 1, inner: 2 }));

        let duplicate = verify(&[b(1, 2, 3), b(2, 3, 4)]);
        assert!(duplicate.contains(&RangeViolation::Duplicate { value: 3 }));

        let gap = verify(&[b(1, 2, 3), b(2, 6, 7)]);
        assert_eq!(
            gap,
            vec![RangeViolation::Gap {
                expected: 4,
                found: 6
            }]
        );
    }

    #[test]
    fn flatten_lifts_every_node_to_top_level() {
        let ranges = vec![b(1, 10, 40), b(2, 12, 13), b(3, 50, 51), b(4, 20, 30)];
        let flat = flatten(&ranges);
        assert_eq!(
            flat,
            vec![b(1, 2, 3), b(2, 4, 5), b(4, 6, 7), b(3, 8, 9)]
        );
        assert!(verify(&flat).is_empty());
        let levels: Vec<i64> = with_levels(flat, 1).into_iter().map(|l| l.level).collect();
        assert_eq!(levels, vec![1, 1, 1, 1]);
    }

    #[test]
    fn flatten_of_empty_scope_is_empty() {
        assert!(flatten(&[]).is_empty());
    }
}
