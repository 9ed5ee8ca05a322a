//! Category model: one row per node of a blog's category tree.
//!
//! Content edits (title, url, description, position) go through this model.
//! Structural changes to `lft`/`rgt` go through [`crate::tree::NestedTree`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{AnyConnection, AnyPool};

use crate::error::AppResult;
use crate::tree::{NestedRecord, NodeFields, Slot, TreeSchema};

const COLUMNS: &str = "id, blog_id, title, url, description, lft, rgt, position";

/// A category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    /// Unique identifier.
    pub id: i64,

    /// Blog this category belongs to.
    pub blog_id: String,

    /// Display title.
    pub title: String,

    /// URL path, unique within the blog (e.g. "news/sport").
    pub url: String,

    /// Optional description, already filtered for its text format.
    pub description: Option<String>,

    /// Left bound of the nested-set range.
    #[sqlx(rename = "lft")]
    pub left: i64,

    /// Right bound of the nested-set range.
    #[sqlx(rename = "rgt")]
    pub right: i64,

    /// Optional explicit ordering hint among siblings.
    pub position: Option<i64>,
}

impl NestedRecord for Category {
    fn select_list(_schema: &TreeSchema) -> String {
        COLUMNS.to_string()
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

/// Input for creating a category.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCategory {
    pub title: String,
    /// Slug; derived from the title when absent.
    pub url: Option<String>,
    pub description: Option<String>,
    pub position: Option<i64>,
}

/// Input for updating a category. `None` keeps the current value; a blank
/// `url` regenerates it from the parent's url and the title.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCategory {
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub position: Option<i64>,
}

/// The writable fields of a category as they are about to be saved.
///
/// Before-save taps receive this mutably.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryDraft {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub position: Option<i64>,
}

#[async_trait]
impl NodeFields for CategoryDraft {
    async fn insert(&self, conn: &mut AnyConnection, scope: &str, slot: Slot) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO category (id, blog_id, title, url, description, lft, rgt, position)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(slot.id)
        .bind(scope)
        .bind(&self.title)
        .bind(&self.url)
        .bind(&self.description)
        .bind(slot.left)
        .bind(slot.right)
        .bind(self.position)
        .execute(&mut *conn)
        .await
        .context("failed to insert category")?;

        Ok(())
    }
}

impl Category {
    /// Find a category of a blog by ID.
    pub async fn find_by_id(pool: &AnyPool, blog_id: &str, id: i64) -> Result<Option<Self>> {
        let sql = format!("SELECT {COLUMNS} FROM category WHERE blog_id = $1 AND id = $2");
        let category = sqlx::query_as::<_, Self>(&sql)
            .bind(blog_id)
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch category")?;

        Ok(category)
    }

    /// Find a category of a blog by its URL.
    pub async fn find_by_url(pool: &AnyPool, blog_id: &str, url: &str) -> Result<Option<Self>> {
        let sql = format!("SELECT {COLUMNS} FROM category WHERE blog_id = $1 AND url = $2");
        let category = sqlx::query_as::<_, Self>(&sql)
            .bind(blog_id)
            .bind(url)
            .fetch_optional(pool)
            .await
            .context("failed to fetch category by url")?;

        Ok(category)
    }

    /// All category URLs of a blog, optionally leaving one category out.
    pub async fn urls(
        pool: &AnyPool,
        blog_id: &str,
        exclude_id: Option<i64>,
    ) -> Result<Vec<String>> {
        let urls = match exclude_id {
            Some(id) => {
                sqlx::query_scalar::<_, String>(
                    "SELECT url FROM category WHERE blog_id = $1 AND id <> $2",
                )
                .bind(blog_id)
                .bind(id)
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_scalar::<_, String>("SELECT url FROM category WHERE blog_id = $1")
                    .bind(blog_id)
                    .fetch_all(pool)
                    .await
            }
        }
        .context("failed to list category urls")?;

        Ok(urls)
    }

    /// Save the content fields of a category. Returns false if no row matched.
    pub async fn update_fields(
        pool: &AnyPool,
        blog_id: &str,
        id: i64,
        draft: &CategoryDraft,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE category
            SET title = $1, url = $2, description = $3, position = $4
            WHERE blog_id = $5 AND id = $6
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.url)
        .bind(&draft.description)
        .bind(draft.position)
        .bind(blog_id)
        .bind(id)
        .execute(pool)
        .await
        .context("failed to update category")?;

        Ok(result.rows_affected() > 0)
    }
}
