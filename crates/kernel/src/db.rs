//! Database connection pool management.
//!
//! The pool is an `Any` pool so the same code runs against PostgreSQL in
//! production and SQLite in tests; the driver is picked from the URL scheme.

use anyhow::{Context, Result};
use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;

use crate::config::Config;

/// Create a connection pool for the configured database URL.
pub async fn create_pool(config: &Config) -> Result<AnyPool> {
    sqlx::any::install_default_drivers();

    let pool = AnyPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    Ok(pool)
}

/// Apply the kernel's pending schema migrations.
pub async fn run_migrations(pool: &AnyPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("failed to apply migrations")?;

    Ok(())
}
