//! Parameters for category listings.

use serde::{Deserialize, Serialize};

/// Post type counted when the caller does not choose one.
pub const DEFAULT_POST_TYPE: &str = "post";

/// Filters for [`super::CategoryDirectory::list_categories`].
///
/// Counting always covers the subtree under `start`; `cat_id`, `cat_url`
/// and `level` only narrow what is returned afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryQuery {
    /// Post type to count. `None` counts every type.
    pub post_type: Option<String>,

    /// Subtree root; 0 lists the whole blog.
    pub start: i64,

    /// Drop categories without posts in their subtree. Defaults to true for
    /// anonymous callers; authenticated callers always see every category.
    pub without_empty: Option<bool>,

    /// Return only this category.
    pub cat_id: Option<i64>,

    /// Return only the category with this URL. Ignored when `cat_id` is set.
    pub cat_url: Option<String>,

    /// Return only categories at this level.
    pub level: Option<i64>,
}

impl Default for CategoryQuery {
    fn default() -> Self {
        Self {
            post_type: Some(DEFAULT_POST_TYPE.to_string()),
            start: 0,
            without_empty: None,
            cat_id: None,
            cat_url: None,
            level: None,
        }
    }
}

impl CategoryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post_type(mut self, post_type: impl Into<String>) -> Self {
        self.post_type = Some(post_type.into());
        self
    }

    /// Count posts of every type.
    pub fn any_post_type(mut self) -> Self {
        self.post_type = None;
        self
    }

    pub fn start(mut self, id: i64) -> Self {
        self.start = id;
        self
    }

    pub fn without_empty(mut self, without_empty: bool) -> Self {
        self.without_empty = Some(without_empty);
        self
    }

    pub fn cat_id(mut self, id: i64) -> Self {
        self.cat_id = Some(id);
        self
    }

    pub fn cat_url(mut self, url: impl Into<String>) -> Self {
        self.cat_url = Some(url.into());
        self
    }

    pub fn level(mut self, level: i64) -> Self {
        self.level = Some(level);
        self
    }

    /// Whether empty categories are dropped for a caller.
    pub fn drops_empty(&self, authenticated: bool) -> bool {
        !authenticated && self.without_empty.unwrap_or(true)
    }
}
