#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Every test gets its own in-memory database with the kernel migrations
//! applied and one registered blog, [`BLOG`].

#![allow(dead_code)]

use std::sync::Arc;

use sqlx::AnyPool;

use quill_kernel::category::CategoryDirectory;
use quill_kernel::db;
use quill_kernel::models::{Blog, CreateCategory};
use quill_kernel::permissions::UserContext;

/// Blog every fixture lives in.
pub const BLOG: &str = "default";

/// Fresh migrated database with [`BLOG`] registered.
pub async fn setup() -> AnyPool {
    let pool = quill_test_utils::memory_pool()
        .await
        .expect("failed to open in-memory database");
    db::run_migrations(&pool)
        .await
        .expect("failed to run migrations");
    Blog::create(&pool, BLOG, "Default blog")
        .await
        .expect("failed to create blog");
    pool
}

/// Directory acting as the site administrator.
pub fn admin(pool: &AnyPool) -> CategoryDirectory {
    as_user(pool, UserContext::system())
}

/// Directory acting as an anonymous visitor.
pub fn anonymous(pool: &AnyPool) -> CategoryDirectory {
    as_user(pool, UserContext::anonymous())
}

pub fn as_user(pool: &AnyPool, user: UserContext) -> CategoryDirectory {
    CategoryDirectory::new(pool.clone(), BLOG, Arc::new(user))
}

/// Create a category titled `title` under `parent` and return its id.
pub async fn add(dir: &CategoryDirectory, title: &str, parent: i64) -> i64 {
    dir.create_category(
        CreateCategory {
            title: title.to_string(),
            ..Default::default()
        },
        parent,
    )
    .await
    .expect("failed to create category")
    .id
}

/// Add `n` published posts to category `cat_id`.
pub async fn add_posts(pool: &AnyPool, cat_id: i64, n: usize) {
    for _ in 0..n {
        quill_test_utils::test_post(BLOG, Some(cat_id))
            .insert(pool)
            .await
            .expect("failed to insert post");
    }
}

/// Current version of [`BLOG`].
pub async fn blog_version(pool: &AnyPool) -> i64 {
    Blog::find_by_id(pool, BLOG)
        .await
        .unwrap()
        .expect("blog is registered")
        .version
}
