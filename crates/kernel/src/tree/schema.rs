//! Table descriptors and row traits for the nested-set engine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::any::AnyRow;
use sqlx::{AnyConnection, FromRow};

use crate::error::AppResult;

/// Names of the columns a nested-set table must provide.
///
/// Values are interpolated into SQL, so they are `'static` and never come
/// from user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeSchema {
    pub table: &'static str,
    pub id: &'static str,
    pub left: &'static str,
    pub right: &'static str,
    pub scope: &'static str,
}

impl TreeSchema {
    /// The blog category table.
    pub const CATEGORY: TreeSchema = TreeSchema {
        table: "category",
        id: "id",
        left: "lft",
        right: "rgt",
        scope: "blog_id",
    };
}

/// A row type the engine can list and position.
pub trait NestedRecord: for<'r> FromRow<'r, AnyRow> + Send + Unpin {
    /// Column list to select so that `FromRow` succeeds.
    fn select_list(schema: &TreeSchema) -> String;

    fn id(&self) -> i64;
    fn left(&self) -> i64;
    fn right(&self) -> i64;
}

/// The structural part of a node: its id and containment range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Bounds {
    pub id: i64,
    #[sqlx(rename = "lft")]
    pub left: i64,
    #[sqlx(rename = "rgt")]
    pub right: i64,
}

impl Bounds {
    /// Number of range integers occupied by the node and its descendants.
    pub fn width(&self) -> i64 {
        self.right - self.left + 1
    }

    /// Whether `other` lies strictly inside this node's range.
    pub fn contains(&self, other: &Bounds) -> bool {
        self.left < other.left && other.right < self.right
    }
}

impl NestedRecord for Bounds {
    fn select_list(schema: &TreeSchema) -> String {
        format!(
            "{} AS id, {} AS lft, {} AS rgt",
            schema.id, schema.left, schema.right
        )
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn left(&self) -> i64 {
        self.left
    }

    fn right(&self) -> i64 {
        self.right
    }
}

/// A listed node with its depth relative to the listing's start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Leveled<T> {
    pub node: T,
    pub level: i64,
}

/// Position allocated for a new node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub id: i64,
    pub left: i64,
    pub right: i64,
}

/// Domain fields of a node being inserted.
///
/// The engine allocates the id and range, then calls `insert` on the same
/// connection, inside its transaction.
#[async_trait]
pub trait NodeFields: Send + Sync {
    async fn insert(&self, conn: &mut AnyConnection, scope: &str, slot: Slot) -> AppResult<()>;
}

/// Where to put a node relative to a sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Before,
    After,
}

/// Listing order by left bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    /// Deepest, rightmost nodes first; every descendant precedes its ancestors.
    Desc,
}
