//! Post-count roll-up over a depth-first category listing.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::tree::{Leveled, NestedRecord};

/// A node with its direct and subtree post counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally<T> {
    pub node: T,
    pub level: i64,
    /// Posts filed directly under the node.
    pub nb_post: i64,
    /// Posts filed under the node or any descendant.
    pub nb_total: i64,
}

/// Compute subtree totals in one pass.
///
/// `nodes` must be in descending left order, so every descendant is visited
/// before its ancestor. Nodes missing from `counts` have no posts. The
/// result keeps the input order.
///
/// A running sum is kept per level. Climbing back up folds every deeper
/// level into the node just reached, so jumps of more than one level are
/// counted too.
pub fn roll_up<T: NestedRecord>(
    nodes: Vec<Leveled<T>>,
    counts: &HashMap<i64, i64>,
) -> Vec<Tally<T>> {
    let mut stack: BTreeMap<i64, i64> = BTreeMap::new();
    let mut last_level: Option<i64> = None;
    let mut tallies = Vec::with_capacity(nodes.len());

    for Leveled { node, level } in nodes {
        let nb_post = counts.get(&node.id()).copied().unwrap_or(0);

        let nb_total = match last_level {
            Some(last) if level < last => {
                let deeper: i64 = stack.split_off(&(level + 1)).values().sum();
                let total = deeper + nb_post;
                *stack.entry(level).or_insert(0) += total;
                total
            }
            Some(last) if level == last => {
                *stack.entry(level).or_insert(0) += nb_post;
                nb_post
            }
            _ => {
                stack.insert(level, nb_post);
                nb_post
            }
        };

        last_level = Some(level);
        tallies.push(Tally {
            node,
            level,
            nb_post,
            nb_total,
        });
    }

    tallies
}
