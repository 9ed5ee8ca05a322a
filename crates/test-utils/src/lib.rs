//! Quill test utilities.
//!
//! Helpers for integration testing: an in-memory database, post fixtures,
//! and snapshots of category ranges for before/after comparisons.

use std::collections::BTreeMap;

use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;

/// Open a private in-memory SQLite database.
///
/// The pool holds exactly one connection that never expires, since every
/// new connection to `sqlite::memory:` would be a different, empty database.
pub async fn memory_pool() -> Result<AnyPool, sqlx::Error> {
    sqlx::any::install_default_drivers();

    AnyPoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
}

/// Create a test post with default values: a published `post` in `cat_id`.
pub fn test_post(blog_id: &str, cat_id: Option<i64>) -> TestPost {
    TestPost {
        blog_id: blog_id.to_string(),
        cat_id,
        post_type: "post".to_string(),
        status: 1,
        title: "Test post".to_string(),
    }
}

/// A post fixture builder.
#[derive(Debug, Clone)]
pub struct TestPost {
    pub blog_id: String,
    pub cat_id: Option<i64>,
    pub post_type: String,
    pub status: i64,
    pub title: String,
}

impl TestPost {
    /// Set the post type.
    pub fn with_type(mut self, post_type: &str) -> Self {
        self.post_type = post_type.to_string();
        self
    }

    /// Set as unpublished.
    pub fn unpublished(mut self) -> Self {
        self.status = 0;
        self
    }

    /// Insert the post and return its id.
    pub async fn insert(&self, pool: &AnyPool) -> Result<i64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let id: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) + 1 FROM post")
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO post (id, blog_id, cat_id, post_type, status, title, created) \
             VALUES ($1, $2, $3, $4, $5, $6, 0)",
        )
        .bind(id)
        .bind(&self.blog_id)
        .bind(self.cat_id)
        .bind(&self.post_type)
        .bind(self.status)
        .bind(&self.title)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(id)
    }
}

/// One category's range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeRow {
    pub id: i64,
    pub left: i64,
    pub right: i64,
}

/// Every category range of a blog, ordered by id.
pub async fn range_snapshot(pool: &AnyPool, blog_id: &str) -> Result<Vec<RangeRow>, sqlx::Error> {
    let rows: Vec<(i64, i64, i64)> =
        sqlx::query_as("SELECT id, lft, rgt FROM category WHERE blog_id = $1 ORDER BY id")
            .bind(blog_id)
            .fetch_all(pool)
            .await?;

    Ok(rows
        .into_iter()
        .map(|(id, left, right)| RangeRow { id, left, right })
        .collect())
}

/// Parent of every node, derived from the ranges alone: the innermost range
/// strictly containing it. Top-level nodes map to `None`.
pub fn parents_from_ranges(rows: &[RangeRow]) -> BTreeMap<i64, Option<i64>> {
    rows.iter()
        .map(|node| {
            let parent = rows
                .iter()
                .filter(|p| p.left < node.left && node.right < p.right)
                .max_by_key(|p| p.left)
                .map(|p| p.id);
            (node.id, parent)
        })
        .collect()
}

/// Ids in left-to-right (depth-first) order.
pub fn document_order(rows: &[RangeRow]) -> Vec<i64> {
    let mut sorted = rows.to_vec();
    sorted.sort_by_key(|r| r.left);
    sorted.into_iter().map(|r| r.id).collect()
}
