//! Blog model.
//!
//! A blog is the scope every category tree and post belongs to. Its
//! `version` is bumped after each category mutation so that readers holding
//! derived data know to refresh it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::AnyPool;
use tracing::debug;

/// Blog record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Blog {
    /// Machine name identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Invalidation counter.
    pub version: i64,

    /// Unix timestamp of the last bump.
    pub changed: i64,
}

impl Blog {
    /// Create a blog.
    pub async fn create(pool: &AnyPool, id: &str, name: &str) -> Result<Self> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query("INSERT INTO blog (id, name, version, changed) VALUES ($1, $2, 0, $3)")
            .bind(id)
            .bind(name)
            .bind(now)
            .execute(pool)
            .await
            .context("failed to create blog")?;

        Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("failed to fetch created blog"))
    }

    /// Find a blog by ID.
    pub async fn find_by_id(pool: &AnyPool, id: &str) -> Result<Option<Self>> {
        let blog = sqlx::query_as::<_, Self>(
            "SELECT id, name, version, changed FROM blog WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch blog")?;

        Ok(blog)
    }

    /// Bump the blog's version. Returns false when the blog is not registered.
    pub async fn touch(pool: &AnyPool, id: &str) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let result =
            sqlx::query("UPDATE blog SET version = version + 1, changed = $1 WHERE id = $2")
                .bind(now)
                .bind(id)
                .execute(pool)
                .await
                .context("failed to touch blog")?;

        let touched = result.rows_affected() > 0;
        debug!(blog_id = %id, touched, "blog version bumped");
        Ok(touched)
    }
}
