//! Nested-set tree engine.
//!
//! Each node of a scope stores a `(left, right)` range; a node is an
//! ancestor of another exactly when its range strictly contains the other's.
//! The scope behaves as if an implicit root occupied bound 1, so the first
//! real node is `(2, 3)`.
//!
//! All range arithmetic lives here. Callers work with ids, parents, and
//! siblings only.

mod nested;
mod ranges;
mod schema;

pub use nested::NestedTree;
pub use ranges::{FIRST_LEFT, RangeViolation, flatten, verify, with_levels};
pub use schema::{
    Bounds, Leveled, NestedRecord, NodeFields, Placement, Slot, SortOrder, TreeSchema,
};
