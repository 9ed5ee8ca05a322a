//! Quill kernel command-line tool.
//!
//! Operates on the category store as the site administrator.

mod cli;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use quill_kernel::config::Config;
use quill_kernel::db;

use crate::cli::{BlogCommand, CategoryCommand};

#[derive(Parser, Debug)]
#[command(name = "quill", version, about = "Quill blog category store")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending database migrations.
    Migrate,
    /// Manage blogs.
    #[command(subcommand)]
    Blog(BlogCommand),
    /// Manage a blog's categories.
    #[command(subcommand)]
    Category(CategoryCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;
    let pool = db::create_pool(&config)
        .await
        .context("failed to create database pool")?;

    match cli.command {
        Command::Migrate => {
            db::run_migrations(&pool).await?;
            info!("Migrations applied");
            println!("Migrations applied.");
        }
        Command::Blog(cmd) => cli::run_blog(&pool, cmd).await?,
        Command::Category(cmd) => cli::run_category(&pool, &config, cmd).await?,
    }

    Ok(())
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
