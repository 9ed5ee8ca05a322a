//! Post model.
//!
//! Only the parts of a post the category store depends on: which category
//! it is filed under, its type, and whether it is published.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{AnyConnection, AnyPool};

use crate::category::DEFAULT_POST_TYPE;

/// Publication status: visible to anonymous readers.
pub const STATUS_PUBLISHED: i64 = 1;

/// Publication status: draft.
pub const STATUS_UNPUBLISHED: i64 = 0;

/// Post record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub blog_id: String,
    /// Category the post is filed under, if any.
    pub cat_id: Option<i64>,
    pub post_type: String,
    pub status: i64,
    pub title: String,
    /// Unix timestamp when created.
    pub created: i64,
}

/// Input for creating a post.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePost {
    pub blog_id: String,
    pub cat_id: Option<i64>,
    pub post_type: Option<String>,
    pub status: Option<i64>,
    pub title: String,
}

impl Post {
    /// Create a post.
    pub async fn create(pool: &AnyPool, input: CreatePost) -> Result<Self> {
        let now = chrono::Utc::now().timestamp();

        let mut tx = pool.begin().await.context("failed to start transaction")?;

        let id: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) + 1 FROM post")
            .fetch_one(&mut *tx)
            .await
            .context("failed to allocate post id")?;

        sqlx::query(
            r#"
            INSERT INTO post (id, blog_id, cat_id, post_type, status, title, created)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(&input.blog_id)
        .bind(input.cat_id)
        .bind(input.post_type.as_deref().unwrap_or(DEFAULT_POST_TYPE))
        .bind(input.status.unwrap_or(STATUS_UNPUBLISHED))
        .bind(&input.title)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("failed to insert post")?;

        tx.commit().await.context("failed to commit transaction")?;

        Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("failed to fetch created post"))
    }

    /// Find a post by ID.
    pub async fn find_by_id(pool: &AnyPool, id: i64) -> Result<Option<Self>> {
        let post = sqlx::query_as::<_, Self>(
            "SELECT id, blog_id, cat_id, post_type, status, title, created FROM post WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch post")?;

        Ok(post)
    }

    /// Number of posts directly filed under each category of a blog.
    ///
    /// `post_type` of `None` counts every type. Categories without posts are
    /// absent from the map.
    pub async fn count_by_category(
        pool: &AnyPool,
        blog_id: &str,
        post_type: Option<&str>,
        published_only: bool,
    ) -> Result<HashMap<i64, i64>> {
        let mut sql = String::from(
            "SELECT cat_id, COUNT(*) AS nb_post FROM post WHERE blog_id = $1 AND cat_id IS NOT NULL",
        );
        let mut next_bind = 2;
        if post_type.is_some() {
            sql.push_str(&format!(" AND post_type = ${next_bind}"));
            next_bind += 1;
        }
        if published_only {
            sql.push_str(&format!(" AND status = ${next_bind}"));
        }
        sql.push_str(" GROUP BY cat_id");

        let mut query = sqlx::query_as::<_, (i64, i64)>(&sql).bind(blog_id);
        if let Some(post_type) = post_type {
            query = query.bind(post_type);
        }
        if published_only {
            query = query.bind(STATUS_PUBLISHED);
        }

        let rows = query
            .fetch_all(pool)
            .await
            .context("failed to count posts by category")?;

        Ok(rows.into_iter().collect())
    }

    /// Number of posts of any type or status filed under one category.
    pub async fn count_for_category(
        conn: &mut AnyConnection,
        blog_id: &str,
        cat_id: i64,
    ) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM post WHERE blog_id = $1 AND cat_id = $2")
                .bind(blog_id)
                .bind(cat_id)
                .fetch_one(&mut *conn)
                .await
                .context("failed to count category posts")?;

        Ok(count)
    }

    /// Refile every post of category `from` under `to` (or under no
    /// category). Returns the number of posts moved.
    pub async fn change_category(
        pool: &AnyPool,
        blog_id: &str,
        from: i64,
        to: Option<i64>,
    ) -> Result<u64> {
        let result =
            sqlx::query("UPDATE post SET cat_id = $1 WHERE blog_id = $2 AND cat_id = $3")
                .bind(to)
                .bind(blog_id)
                .bind(from)
                .execute(pool)
                .await
                .context("failed to move posts between categories")?;

        Ok(result.rows_affected())
    }
}
