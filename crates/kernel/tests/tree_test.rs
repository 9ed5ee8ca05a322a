#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Nested-set engine integration tests.
//!
//! The engine runs against its own table with non-default column names, so
//! nothing here depends on the category model.

use async_trait::async_trait;
use sqlx::{AnyConnection, AnyPool};

use quill_kernel::error::{AppError, AppResult};
use quill_kernel::tree::{
    NestedRecord, NestedTree, NodeFields, Placement, Slot, SortOrder, TreeSchema,
};
use quill_test_utils::memory_pool;

const MENU: TreeSchema = TreeSchema {
    table: "menu_node",
    id: "id",
    left: "l",
    right: "r",
    scope: "menu",
};

#[derive(Debug, Clone, sqlx::FromRow)]
struct MenuNode {
    id: i64,
    label: String,
    #[sqlx(rename = "lft")]
    left: i64,
    #[sqlx(rename = "rgt")]
    right: i64,
}

impl NestedRecord for MenuNode {
    fn select_list(schema: &TreeSchema) -> String {
        format!(
            "{} AS id, label, {} AS lft, {} AS rgt",
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

struct Label(&'static str);

#[async_trait]
impl NodeFields for Label {
    async fn insert(&self, conn: &mut AnyConnection, scope: &str, slot: Slot) -> AppResult<()> {
        sqlx::query("INSERT INTO menu_node (id, menu, label, l, r) VALUES ($1, $2, $3, $4, $5)")
            .bind(slot.id)
            .bind(scope)
            .bind(self.0)
            .bind(slot.left)
            .bind(slot.right)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}

async fn menu_tree() -> (AnyPool, NestedTree) {
    let pool = memory_pool().await.unwrap();
    sqlx::query(
        "CREATE TABLE menu_node (
            id BIGINT PRIMARY KEY,
            menu TEXT NOT NULL,
            label TEXT NOT NULL,
            l BIGINT NOT NULL,
            r BIGINT NOT NULL
        )",
    )
    .execute(&pool)
    .await
    .unwrap();

    let tree = NestedTree::new(pool.clone(), MENU, "main");
    (pool, tree)
}

/// (label, left, right, level) of the whole scope in document order.
async fn outline(tree: &NestedTree) -> Vec<(String, i64, i64, i64)> {
    tree.children::<MenuNode>(0, SortOrder::Asc)
        .await
        .unwrap()
        .into_iter()
        .map(|l| (l.node.label, l.node.left, l.node.right, l.level))
        .collect()
}

fn row(label: &str, left: i64, right: i64, level: i64) -> (String, i64, i64, i64) {
    (label.to_string(), left, right, level)
}

async fn assert_consistent(tree: &NestedTree) {
    let violations = tree.verify().await.unwrap();
    assert!(violations.is_empty(), "range violations: {violations:?}");
}

#[tokio::test]
async fn first_node_starts_after_virtual_root() {
    let (_pool, tree) = menu_tree().await;
    let a = tree.add_node(&Label("a"), 0).await.unwrap();

    let listed = outline(&tree).await;
    assert_eq!(listed, vec![row("a", 2, 3, 1)]);
    assert!(tree.parent::<MenuNode>(a).await.unwrap().is_none());
}

#[tokio::test]
async fn add_node_opens_gap_under_parent() {
    let (_pool, tree) = menu_tree().await;
    let a = tree.add_node(&Label("a"), 0).await.unwrap();
    let _b = tree.add_node(&Label("b"), 0).await.unwrap();
    let c = tree.add_node(&Label("c"), a).await.unwrap();

    assert_eq!(
        outline(&tree).await,
        vec![row("a", 2, 5, 1), row("c", 3, 4, 2), row("b", 6, 7, 1)]
    );
    assert_eq!(tree.parent::<MenuNode>(c).await.unwrap().unwrap().id, a);
    assert_consistent(&tree).await;
}

#[tokio::test]
async fn children_of_start_node_are_relative() {
    let (_pool, tree) = menu_tree().await;
    let a = tree.add_node(&Label("a"), 0).await.unwrap();
    let b = tree.add_node(&Label("b"), a).await.unwrap();
    tree.add_node(&Label("c"), b).await.unwrap();
    tree.add_node(&Label("d"), 0).await.unwrap();

    let asc: Vec<(String, i64)> = tree
        .children::<MenuNode>(a, SortOrder::Asc)
        .await
        .unwrap()
        .into_iter()
        .map(|l| (l.node.label, l.level))
        .collect();
    assert_eq!(
        asc,
        vec![("a".into(), 0), ("b".into(), 1), ("c".into(), 2)]
    );

    let desc: Vec<String> = tree
        .children::<MenuNode>(a, SortOrder::Desc)
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.node.label)
        .collect();
    assert_eq!(desc, vec!["c", "b", "a"]);
}

#[tokio::test]
async fn parents_run_from_top_to_immediate_parent() {
    let (_pool, tree) = menu_tree().await;
    let a = tree.add_node(&Label("a"), 0).await.unwrap();
    let b = tree.add_node(&Label("b"), a).await.unwrap();
    let c = tree.add_node(&Label("c"), b).await.unwrap();

    let chain: Vec<String> = tree
        .parents::<MenuNode>(c)
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.label)
        .collect();
    assert_eq!(chain, vec!["a", "b"]);
    assert!(tree.parents::<MenuNode>(a).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_node_promotes_children() {
    let (_pool, tree) = menu_tree().await;
    let a = tree.add_node(&Label("a"), 0).await.unwrap();
    tree.add_node(&Label("b"), a).await.unwrap();
    tree.add_node(&Label("c"), a).await.unwrap();
    tree.add_node(&Label("d"), 0).await.unwrap();

    tree.delete_node(a).await.unwrap();

    assert_eq!(
        outline(&tree).await,
        vec![row("b", 2, 3, 1), row("c", 4, 5, 1), row("d", 6, 7, 1)]
    );
    assert_consistent(&tree).await;
}

#[tokio::test]
async fn delete_node_in_follows_the_callers_transaction() {
    let (pool, tree) = menu_tree().await;
    let a = tree.add_node(&Label("a"), 0).await.unwrap();
    tree.add_node(&Label("b"), a).await.unwrap();
    let before = outline(&tree).await;

    {
        let mut tx = pool.begin().await.unwrap();
        tree.delete_node_in(&mut tx, a).await.unwrap();
        // dropped without commit
    }
    assert_eq!(outline(&tree).await, before);

    let mut tx = pool.begin().await.unwrap();
    tree.delete_node_in(&mut tx, a).await.unwrap();
    tx.commit().await.unwrap();
    assert_eq!(outline(&tree).await, vec![row("b", 2, 3, 1)]);
}

#[tokio::test]
async fn delete_unknown_node_is_invalid_reference() {
    let (_pool, tree) = menu_tree().await;
    let err = tree.delete_node(99).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidReference(_)));
}

#[tokio::test]
async fn set_node_parent_moves_whole_subtree() {
    let (_pool, tree) = menu_tree().await;
    let a = tree.add_node(&Label("a"), 0).await.unwrap();
    let b = tree.add_node(&Label("b"), a).await.unwrap();
    tree.add_node(&Label("c"), b).await.unwrap();
    let d = tree.add_node(&Label("d"), 0).await.unwrap();

    tree.set_node_parent(b, d).await.unwrap();

    assert_eq!(
        outline(&tree).await,
        vec![
            row("a", 2, 3, 1),
            row("d", 4, 9, 1),
            row("b", 5, 8, 2),
            row("c", 6, 7, 3),
        ]
    );
    assert_consistent(&tree).await;
}

#[tokio::test]
async fn set_node_parent_to_top_level_appends() {
    let (_pool, tree) = menu_tree().await;
    let a = tree.add_node(&Label("a"), 0).await.unwrap();
    let b = tree.add_node(&Label("b"), a).await.unwrap();

    tree.set_node_parent(b, 0).await.unwrap();

    assert_eq!(
        outline(&tree).await,
        vec![row("a", 2, 3, 1), row("b", 4, 5, 1)]
    );
}

#[tokio::test]
async fn set_node_parent_rejects_cycles_without_writing() {
    let (_pool, tree) = menu_tree().await;
    let a = tree.add_node(&Label("a"), 0).await.unwrap();
    let b = tree.add_node(&Label("b"), a).await.unwrap();
    let c = tree.add_node(&Label("c"), b).await.unwrap();
    let before = outline(&tree).await;

    let err = tree.set_node_parent(a, c).await.unwrap_err();
    assert!(matches!(err, AppError::StructuralViolation(_)));

    let err = tree.set_node_parent(b, b).await.unwrap_err();
    assert!(matches!(err, AppError::StructuralViolation(_)));

    assert_eq!(outline(&tree).await, before);
}

#[tokio::test]
async fn set_node_position_reorders_siblings() {
    let (_pool, tree) = menu_tree().await;
    let a = tree.add_node(&Label("a"), 0).await.unwrap();
    let b = tree.add_node(&Label("b"), 0).await.unwrap();
    let c = tree.add_node(&Label("c"), 0).await.unwrap();

    tree.set_node_position(c, a, Placement::Before).await.unwrap();
    assert_eq!(
        outline(&tree).await,
        vec![row("c", 2, 3, 1), row("a", 4, 5, 1), row("b", 6, 7, 1)]
    );

    tree.set_node_position(c, b, Placement::After).await.unwrap();
    assert_eq!(
        outline(&tree).await,
        vec![row("a", 2, 3, 1), row("b", 4, 5, 1), row("c", 6, 7, 1)]
    );

    tree.set_node_position(a, a, Placement::After).await.unwrap();
    assert_consistent(&tree).await;
}

#[tokio::test]
async fn set_node_position_requires_siblings() {
    let (_pool, tree) = menu_tree().await;
    let a = tree.add_node(&Label("a"), 0).await.unwrap();
    let b = tree.add_node(&Label("b"), a).await.unwrap();
    let c = tree.add_node(&Label("c"), 0).await.unwrap();
    let before = outline(&tree).await;

    let err = tree
        .set_node_position(b, c, Placement::Before)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StructuralViolation(_)));
    assert_eq!(outline(&tree).await, before);
}

#[tokio::test]
async fn reset_order_flattens_in_document_order() {
    let (_pool, tree) = menu_tree().await;
    let a = tree.add_node(&Label("a"), 0).await.unwrap();
    let b = tree.add_node(&Label("b"), a).await.unwrap();
    tree.add_node(&Label("c"), b).await.unwrap();
    let d = tree.add_node(&Label("d"), 0).await.unwrap();

    tree.update_position(d, 20, 21).await.unwrap();
    assert!(!tree.verify().await.unwrap().is_empty());

    tree.reset_order().await.unwrap();
    assert_eq!(
        outline(&tree).await,
        vec![
            row("a", 2, 3, 1),
            row("b", 4, 5, 1),
            row("c", 6, 7, 1),
            row("d", 8, 9, 1),
        ]
    );
    assert!(tree.parent::<MenuNode>(b).await.unwrap().is_none());
    assert_consistent(&tree).await;

    let err = tree.update_position(42, 2, 3).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidReference(_)));
}

#[tokio::test]
async fn scopes_are_independent() {
    let (pool, tree) = menu_tree().await;
    let footer = NestedTree::new(pool.clone(), MENU, "footer");

    tree.add_node(&Label("a"), 0).await.unwrap();
    footer.add_node(&Label("x"), 0).await.unwrap();
    let y = footer.add_node(&Label("y"), 0).await.unwrap();

    assert_eq!(outline(&tree).await, vec![row("a", 2, 3, 1)]);
    assert_eq!(
        outline(&footer).await,
        vec![row("x", 2, 3, 1), row("y", 4, 5, 1)]
    );

    let err = tree.delete_node(y).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidReference(_)));
}

/// Deterministic pseudo-random sequence of structural edits; the ranges
/// must stay valid after every step.
#[tokio::test]
async fn ranges_stay_valid_under_mixed_edits() {
    let (_pool, tree) = menu_tree().await;
    let mut ids: Vec<i64> = Vec::new();
    let mut seed: u64 = 0x5eed;
    let mut next = |bound: usize| {
        seed = seed
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        usize::try_from(seed >> 33).unwrap() % bound
    };

    for step in 0..60 {
        let op = if ids.len() < 3 { 0 } else { next(5) };
        match op {
            0 | 1 => {
                let parent = if ids.is_empty() || next(3) == 0 {
                    0
                } else {
                    ids[next(ids.len())]
                };
                ids.push(tree.add_node(&Label("n"), parent).await.unwrap());
            }
            2 => {
                let id = ids.remove(next(ids.len()));
                tree.delete_node(id).await.unwrap();
            }
            3 => {
                let id = ids[next(ids.len())];
                let parent = ids[next(ids.len())];
                match tree.set_node_parent(id, parent).await {
                    Ok(()) | Err(AppError::StructuralViolation(_)) => {}
                    Err(e) => panic!("step {step}: unexpected error {e}"),
                }
            }
            _ => {
                let id = ids[next(ids.len())];
                let sibling = ids[next(ids.len())];
                match tree.set_node_position(id, sibling, Placement::After).await {
                    Ok(()) | Err(AppError::StructuralViolation(_)) => {}
                    Err(e) => panic!("step {step}: unexpected error {e}"),
                }
            }
        }

        let violations = tree.verify().await.unwrap();
        assert!(violations.is_empty(), "step {step}: {violations:?}");
    }

    assert_eq!(outline(&tree).await.len(), ids.len());
}
