//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Context, Result, bail};

use crate::category::DEFAULT_POST_TYPE;

/// Text formats accepted for category descriptions.
const DESCRIPTION_FORMATS: &[&str] = &["filtered_html", "plain_text", "full_html"];

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL (`postgres://…` or `sqlite:…`).
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Text format applied to category descriptions on write
    /// (default: "filtered_html").
    pub description_format: String,

    /// Post type counted when a listing does not name one (default: "post").
    pub default_post_type: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let description_format = env::var("DESCRIPTION_FORMAT")
            .unwrap_or_else(|_| "filtered_html".to_string())
            .to_lowercase();
        if !DESCRIPTION_FORMATS.contains(&description_format.as_str()) {
            bail!(
                "DESCRIPTION_FORMAT must be one of {}, got '{description_format}'",
                DESCRIPTION_FORMATS.join(", ")
            );
        }

        let default_post_type =
            env::var("DEFAULT_POST_TYPE").unwrap_or_else(|_| DEFAULT_POST_TYPE.to_string());

        Ok(Self {
            database_url,
            database_max_connections,
            description_format,
            default_post_type,
        })
    }
}
