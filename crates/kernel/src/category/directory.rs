//! Category directory: the blog-level category API.
//!
//! Combines the nested-set engine, post-count roll-up, URL resolution,
//! permission checks, and taps. Every write is checked against
//! [`MANAGE_CATEGORIES`] before anything is read or written, and bumps the
//! blog version once it succeeds.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use sqlx::AnyPool;
use tracing::{debug, info, warn};

use super::aggregate::roll_up;
use super::query::CategoryQuery;
use super::url::{child_url, disambiguate, slugify, tidy_url};
use crate::content::FilterPipeline;
use crate::error::{AppError, AppResult};
use crate::models::{Blog, Category, CategoryDraft, CreateCategory, Post, UpdateCategory};
use crate::permissions::{MANAGE_CATEGORIES, PermissionChecker};
use crate::tap::{TapDispatcher, TapRegistry};
use crate::tree::{NestedTree, Placement, RangeViolation, SortOrder, TreeSchema};

/// A listed category with its level and post counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryEntry {
    #[serde(flatten)]
    pub category: Category,
    pub level: i64,
    pub nb_post: i64,
    pub nb_total: i64,
}

/// Category operations for one blog, on behalf of one caller.
pub struct CategoryDirectory {
    pool: AnyPool,
    blog_id: String,
    tree: NestedTree,
    permissions: Arc<dyn PermissionChecker>,
    taps: TapDispatcher,
    descriptions: FilterPipeline,
}

impl CategoryDirectory {
    /// Create a directory for `blog_id`. Descriptions default to filtered HTML.
    pub fn new(
        pool: AnyPool,
        blog_id: impl Into<String>,
        permissions: Arc<dyn PermissionChecker>,
    ) -> Self {
        let blog_id = blog_id.into();
        Self {
            tree: NestedTree::new(pool.clone(), TreeSchema::CATEGORY, blog_id.clone()),
            pool,
            blog_id,
            permissions,
            taps: TapDispatcher::default(),
            descriptions: FilterPipeline::filtered_html(),
        }
    }

    /// Run the handlers of `registry` around creates and updates.
    pub fn with_taps(mut self, registry: Arc<TapRegistry>) -> Self {
        self.taps = TapDispatcher::new(registry);
        self
    }

    /// Text format applied to descriptions on write.
    pub fn with_description_format(mut self, format: &str) -> Self {
        self.descriptions = FilterPipeline::for_format(format);
        self
    }

    pub fn blog_id(&self) -> &str {
        &self.blog_id
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Posts filed directly under each category. Anonymous callers only
    /// count published posts.
    pub async fn post_counts(&self, post_type: Option<&str>) -> AppResult<HashMap<i64, i64>> {
        let published_only = !self.permissions.is_authenticated();
        let counts =
            Post::count_by_category(&self.pool, &self.blog_id, post_type, published_only).await?;
        Ok(counts)
    }

    /// List categories depth-first with their post counts.
    pub async fn list_categories(&self, query: &CategoryQuery) -> AppResult<Vec<CategoryEntry>> {
        let counts = self.post_counts(query.post_type.as_deref()).await?;
        let nodes = self
            .tree
            .children::<Category>(query.start, SortOrder::Desc)
            .await?;
        let listed = nodes.len();

        let drop_empty = query.drops_empty(self.permissions.is_authenticated());
        let mut entries: Vec<CategoryEntry> = roll_up(nodes, &counts)
            .into_iter()
            .rev()
            .filter(|t| !drop_empty || t.nb_total > 0)
            .map(|t| CategoryEntry {
                category: t.node,
                level: t.level,
                nb_post: t.nb_post,
                nb_total: t.nb_total,
            })
            .collect();

        if let Some(id) = query.cat_id {
            entries.retain(|e| e.category.id == id);
        } else if let Some(url) = &query.cat_url {
            entries.retain(|e| &e.category.url == url);
        }
        if let Some(level) = query.level {
            entries.retain(|e| e.level == level);
        }

        debug!(
            blog_id = %self.blog_id,
            start = query.start,
            listed,
            returned = entries.len(),
            "categories listed"
        );
        Ok(entries)
    }

    /// One category with its counts, whether or not it holds posts.
    pub async fn get_category(&self, id: i64) -> AppResult<Option<CategoryEntry>> {
        let query = CategoryQuery::new().without_empty(false).cat_id(id);
        Ok(self.list_categories(&query).await?.into_iter().next())
    }

    /// One category by URL with its counts, whether or not it holds posts.
    pub async fn get_category_by_url(&self, url: &str) -> AppResult<Option<CategoryEntry>> {
        let query = CategoryQuery::new().without_empty(false).cat_url(url);
        Ok(self.list_categories(&query).await?.into_iter().next())
    }

    /// Direct children of `id`, or the top-level categories when `id` is 0.
    pub async fn first_children(&self, id: i64) -> AppResult<Vec<CategoryEntry>> {
        let query = CategoryQuery::new().start(id).level(1);
        self.list_categories(&query).await
    }

    /// Parent of `id`, or `None` for a top-level category.
    pub async fn category_parent(&self, id: i64) -> AppResult<Option<Category>> {
        self.tree.parent::<Category>(id).await
    }

    /// Ancestors of `id`, outermost first.
    pub async fn category_parents(&self, id: i64) -> AppResult<Vec<Category>> {
        self.tree.parents::<Category>(id).await
    }

    /// Whether the category at `url` is `parent_url` or lies beneath it.
    /// An unknown `parent_url` contains nothing.
    pub async fn is_in_subtree(&self, url: &str, parent_url: &str) -> AppResult<bool> {
        let Some(parent) = Category::find_by_url(&self.pool, &self.blog_id, parent_url).await?
        else {
            return Ok(false);
        };

        let subtree = self
            .tree
            .children::<Category>(parent.id, SortOrder::Asc)
            .await?;
        Ok(subtree.iter().any(|l| l.node.url == url))
    }

    /// Make `candidate` unique within the blog, ignoring `exclude_id`'s own url.
    pub async fn resolve_url(&self, candidate: &str, exclude_id: Option<i64>) -> AppResult<String> {
        if candidate.is_empty() {
            return Err(AppError::MissingOrEmptyValue("url"));
        }
        let existing = Category::urls(&self.pool, &self.blog_id, exclude_id).await?;
        disambiguate(candidate, existing.iter().map(String::as_str))
    }

    /// Range problems in the blog's tree, if any.
    pub async fn check_ranges(&self) -> AppResult<Vec<RangeViolation>> {
        self.tree.verify().await
    }

    // -------------------------------------------------------------------------
    // Content writes
    // -------------------------------------------------------------------------

    /// Create a category as the last child of `parent_id` (0 for top level).
    pub async fn create_category(
        &self,
        input: CreateCategory,
        parent_id: i64,
    ) -> AppResult<Category> {
        self.require_manage().await?;

        let title = required_title(&input.title)?;
        let parent_url = if parent_id == 0 {
            None
        } else {
            let parent = Category::find_by_id(&self.pool, &self.blog_id, parent_id)
                .await?
                .ok_or_else(|| AppError::not_found("category", parent_id))?;
            Some(parent.url)
        };

        let slug = match input.url.as_deref().map(tidy_url) {
            Some(url) if !url.is_empty() => url,
            _ => required_slug(&title)?,
        };
        let mut draft = CategoryDraft {
            title,
            url: child_url(parent_url.as_deref(), &slug),
            description: self.descriptions.description(input.description.as_deref()),
            position: input.position,
        };

        self.taps.before_create(&self.blog_id, &mut draft).await?;
        draft.title = required_title(&draft.title)?;
        draft.url = self.resolve_url(&tidy_url(&draft.url), None).await?;

        let id = self.tree.add_node(&draft, parent_id).await?;
        let category = Category::find_by_id(&self.pool, &self.blog_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("category", id))?;

        self.touch().await?;
        self.taps.after_create(&category).await;

        info!(
            blog_id = %self.blog_id,
            id,
            parent_id,
            url = %category.url,
            "category created"
        );
        Ok(category)
    }

    /// Update a category's content fields. Its position in the tree is
    /// untouched.
    ///
    /// A blank `url` is rebuilt from the parent's url and the title. The
    /// resulting url is always checked for uniqueness.
    pub async fn update_category(&self, id: i64, input: UpdateCategory) -> AppResult<Category> {
        self.require_manage().await?;

        let current = Category::find_by_id(&self.pool, &self.blog_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("category", id))?;

        let title = required_title(input.title.as_deref().unwrap_or(&current.title))?;
        let url = match input.url.as_deref() {
            None => current.url.clone(),
            Some(url) if url.trim().is_empty() => {
                let parent = self.tree.parent::<Category>(id).await?;
                let slug = required_slug(&title)?;
                child_url(parent.as_ref().map(|p| p.url.as_str()), &slug)
            }
            Some(url) => url.to_string(),
        };
        let description = match input.description.as_deref() {
            None => current.description.clone(),
            Some(text) => self.descriptions.description(Some(text)),
        };

        let mut draft = CategoryDraft {
            title,
            url,
            description,
            position: input.position.or(current.position),
        };

        self.taps
            .before_update(&self.blog_id, id, &mut draft)
            .await?;
        draft.title = required_title(&draft.title)?;
        draft.url = self.resolve_url(&tidy_url(&draft.url), Some(id)).await?;

        if !Category::update_fields(&self.pool, &self.blog_id, id, &draft).await? {
            return Err(AppError::not_found("category", id));
        }
        let category = Category::find_by_id(&self.pool, &self.blog_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("category", id))?;

        self.touch().await?;
        self.taps.after_update(&category).await;

        info!(blog_id = %self.blog_id, id, url = %category.url, "category updated");
        Ok(category)
    }

    /// Delete a category, promoting its children to its parent.
    ///
    /// Refused while any post is still filed under it.
    pub async fn delete_category(&self, id: i64) -> AppResult<()> {
        self.require_manage().await?;

        let mut tx = self.pool.begin().await?;
        let posts = Post::count_for_category(&mut *tx, &self.blog_id, id).await?;
        if posts > 0 {
            warn!(blog_id = %self.blog_id, id, posts, "refusing to delete category with posts");
            return Err(AppError::InvalidReference(format!(
                "category {id} still has {posts} post(s)"
            )));
        }

        self.tree.delete_node_in(&mut tx, id).await?;
        tx.commit().await?;
        self.touch().await?;

        info!(blog_id = %self.blog_id, id, "category deleted");
        Ok(())
    }

    /// Refile every post of `from` under `to`, or under no category.
    /// Returns the number of posts moved.
    pub async fn change_posts_category(&self, from: i64, to: Option<i64>) -> AppResult<u64> {
        self.require_manage().await?;

        for id in std::iter::once(from).chain(to) {
            if Category::find_by_id(&self.pool, &self.blog_id, id)
                .await?
                .is_none()
            {
                return Err(AppError::not_found("category", id));
            }
        }

        let moved = Post::change_category(&self.pool, &self.blog_id, from, to).await?;
        self.touch().await?;

        info!(blog_id = %self.blog_id, from, to, moved, "posts refiled");
        Ok(moved)
    }

    // -------------------------------------------------------------------------
    // Structural writes
    // -------------------------------------------------------------------------

    /// Flatten the blog's tree: every category becomes top-level, keeping
    /// the current left-to-right order, numbered without gaps.
    pub async fn reset_categories_order(&self) -> AppResult<()> {
        self.require_manage().await?;
        self.tree.reset_order().await?;
        self.touch().await
    }

    /// Assign a range to a category verbatim. For import tooling that has
    /// already computed a valid numbering.
    pub async fn update_category_position(&self, id: i64, left: i64, right: i64) -> AppResult<()> {
        self.require_manage().await?;
        self.tree.update_position(id, left, right).await?;
        self.touch().await
    }

    /// Move a category (with its subtree) under `parent_id`, or to the top
    /// level when `parent_id` is 0.
    pub async fn set_category_parent(&self, id: i64, parent_id: i64) -> AppResult<()> {
        self.require_manage().await?;
        self.tree.set_node_parent(id, parent_id).await?;
        self.touch().await
    }

    /// Move a category next to one of its siblings.
    pub async fn set_category_position(
        &self,
        id: i64,
        sibling_id: i64,
        placement: Placement,
    ) -> AppResult<()> {
        self.require_manage().await?;
        self.tree
            .set_node_position(id, sibling_id, placement)
            .await?;
        self.touch().await
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    async fn require_manage(&self) -> AppResult<()> {
        if self
            .permissions
            .check(MANAGE_CATEGORIES, &self.blog_id)
            .await
        {
            return Ok(());
        }

        warn!(blog_id = %self.blog_id, capability = MANAGE_CATEGORIES, "permission denied");
        Err(AppError::permission_denied(MANAGE_CATEGORIES, &self.blog_id))
    }

    async fn touch(&self) -> AppResult<()> {
        if !Blog::touch(&self.pool, &self.blog_id).await? {
            debug!(blog_id = %self.blog_id, "blog not registered, version not bumped");
        }
        Ok(())
    }
}

fn required_title(title: &str) -> AppResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::MissingOrEmptyValue("title"));
    }
    Ok(title.to_string())
}

/// Slug of `title`; a title with no letters or digits yields no url.
fn required_slug(title: &str) -> AppResult<String> {
    let slug = slugify(title);
    if slug.is_empty() {
        return Err(AppError::MissingOrEmptyValue("url"));
    }
    Ok(slug)
}
