//! CLI command implementations.
//!
//! Commands run with the database pool only and, unless noted, act as the site
//! administrator.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Subcommand, ValueEnum};
use sqlx::AnyPool;

use quill_kernel::category::{CategoryDirectory, CategoryEntry, CategoryQuery};
use quill_kernel::config::Config;
use quill_kernel::models::{Blog, CreateCategory, UpdateCategory};
use quill_kernel::permissions::UserContext;
use quill_kernel::tree::Placement;

#[derive(Subcommand, Debug)]
pub enum BlogCommand {
    /// Register a blog.
    Create {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    /// List categories with post counts.
    List {
        #[arg(long)]
        blog: String,
        /// Post type to count (defaults to DEFAULT_POST_TYPE).
        #[arg(long)]
        post_type: Option<String>,
        #[arg(long)]
        level: Option<i64>,
        /// Only list the subtree under this category.
        #[arg(long, default_value_t = 0)]
        start: i64,
        /// List as an anonymous visitor sees it: published posts only,
        /// empty categories hidden.
        #[arg(long)]
        non_empty: bool,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Create a category.
    Add {
        #[arg(long)]
        blog: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        url: Option<String>,
        /// Parent category id (0 for top level).
        #[arg(long, default_value_t = 0)]
        parent: i64,
        #[arg(long)]
        description: Option<String>,
    },
    /// Edit a category's title, url, or description.
    Update {
        #[arg(long)]
        blog: String,
        #[arg(long)]
        id: i64,
        #[arg(long)]
        title: Option<String>,
        /// Pass an empty value to rebuild the url from the title.
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete an empty category.
    Delete {
        #[arg(long)]
        blog: String,
        #[arg(long)]
        id: i64,
    },
    /// Move a category under another parent.
    Move {
        #[arg(long)]
        blog: String,
        #[arg(long)]
        id: i64,
        /// New parent id (0 for top level).
        #[arg(long)]
        parent: i64,
    },
    /// Move a category next to a sibling.
    Order {
        #[arg(long)]
        blog: String,
        #[arg(long)]
        id: i64,
        #[arg(long)]
        sibling: i64,
        #[arg(long, value_enum)]
        placement: PlacementArg,
    },
    /// Move every category of a blog to the top level, in current order.
    ResetOrder {
        #[arg(long)]
        blog: String,
    },
    /// Report range problems in a blog's tree.
    Check {
        #[arg(long)]
        blog: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum PlacementArg {
    Before,
    After,
}

impl From<PlacementArg> for Placement {
    fn from(arg: PlacementArg) -> Self {
        match arg {
            PlacementArg::Before => Placement::Before,
            PlacementArg::After => Placement::After,
        }
    }
}

pub async fn run_blog(pool: &AnyPool, cmd: BlogCommand) -> Result<()> {
    match cmd {
        BlogCommand::Create { id, name } => {
            if Blog::find_by_id(pool, &id).await?.is_some() {
                bail!("blog '{id}' already exists");
            }
            let blog = Blog::create(pool, &id, &name).await?;
            println!("Blog '{}' ({}) created.", blog.id, blog.name);
        }
    }
    Ok(())
}

pub async fn run_category(pool: &AnyPool, config: &Config, cmd: CategoryCommand) -> Result<()> {
    match cmd {
        CategoryCommand::List {
            blog,
            post_type,
            level,
            start,
            non_empty,
            json,
        } => {
            let user = if non_empty {
                UserContext::anonymous()
            } else {
                UserContext::system()
            };
            let dir = open_directory(pool, config, &blog, user).await?;
            let mut query = CategoryQuery::new()
                .post_type(post_type.unwrap_or_else(|| config.default_post_type.clone()))
                .start(start)
                .without_empty(non_empty);
            if let Some(level) = level {
                query = query.level(level);
            }
            let entries = dir.list_categories(&query).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                print_entries(&entries);
            }
        }
        CategoryCommand::Add {
            blog,
            title,
            url,
            parent,
            description,
        } => {
            let dir = directory(pool, config, &blog).await?;
            let input = CreateCategory {
                title,
                url,
                description,
                position: None,
            };
            let category = dir.create_category(input, parent).await?;
            println!("Category {} created at '{}'.", category.id, category.url);
        }
        CategoryCommand::Update {
            blog,
            id,
            title,
            url,
            description,
        } => {
            let dir = directory(pool, config, &blog).await?;
            let input = UpdateCategory {
                title,
                url,
                description,
                position: None,
            };
            let category = dir.update_category(id, input).await?;
            println!("Category {} updated, url '{}'.", category.id, category.url);
        }
        CategoryCommand::Delete { blog, id } => {
            directory(pool, config, &blog)
                .await?
                .delete_category(id)
                .await?;
            println!("Category {id} deleted.");
        }
        CategoryCommand::Move { blog, id, parent } => {
            directory(pool, config, &blog)
                .await?
                .set_category_parent(id, parent)
                .await?;
            println!("Category {id} moved under {parent}.");
        }
        CategoryCommand::Order {
            blog,
            id,
            sibling,
            placement,
        } => {
            directory(pool, config, &blog)
                .await?
                .set_category_position(id, sibling, placement.into())
                .await?;
            println!("Category {id} placed {placement:?} {sibling}.");
        }
        CategoryCommand::ResetOrder { blog } => {
            directory(pool, config, &blog)
                .await?
                .reset_categories_order()
                .await?;
            println!("Category order of '{blog}' reset.");
        }
        CategoryCommand::Check { blog } => {
            let violations = directory(pool, config, &blog).await?.check_ranges().await?;
            if violations.is_empty() {
                println!("Category tree of '{blog}' is consistent.");
                return Ok(());
            }
            for v in &violations {
                println!("  {v}");
            }
            bail!("{} range problem(s) found in '{blog}'", violations.len());
        }
    }
    Ok(())
}

async fn directory(pool: &AnyPool, config: &Config, blog: &str) -> Result<CategoryDirectory> {
    open_directory(pool, config, blog, UserContext::system()).await
}

async fn open_directory(
    pool: &AnyPool,
    config: &Config,
    blog: &str,
    user: UserContext,
) -> Result<CategoryDirectory> {
    Blog::find_by_id(pool, blog)
        .await?
        .with_context(|| format!("blog '{blog}' not found"))?;

    Ok(CategoryDirectory::new(pool.clone(), blog, Arc::new(user))
        .with_description_format(&config.description_format))
}

fn print_entries(entries: &[CategoryEntry]) {
    if entries.is_empty() {
        println!("No categories found.");
        return;
    }

    println!(
        "{:<6} {:<40} {:<32} {:>6} {:>6}",
        "ID", "TITLE", "URL", "POSTS", "TOTAL"
    );
    println!("{}", "-".repeat(94));

    let base = entries.iter().map(|e| e.level).min().unwrap_or(0);
    for e in entries {
        let indent = "  ".repeat(usize::try_from(e.level - base).unwrap_or(0));
        println!(
            "{:<6} {:<40} {:<32} {:>6} {:>6}",
            e.category.id,
            format!("{indent}{}", e.category.title),
            e.category.url,
            e.nb_post,
            e.nb_total
        );
    }
}
