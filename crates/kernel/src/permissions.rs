//! Permission checking.
//!
//! The category store consults a [`PermissionChecker`] before every write and
//! asks it whether the caller is authenticated before counting unpublished
//! posts. [`UserContext`] is the in-process implementation.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

/// Capability required to create, edit, move, or delete categories.
pub const MANAGE_CATEGORIES: &str = "manage categories";

/// Capability that grants everything on every blog.
pub const ADMINISTER_SITE: &str = "administer site";

/// Answers capability questions for the current caller.
#[async_trait]
pub trait PermissionChecker: Send + Sync {
    /// Whether the caller is logged in. Anonymous callers only see
    /// published content.
    fn is_authenticated(&self) -> bool;

    /// Whether the caller holds `capability` on blog `scope_id`.
    async fn check(&self, capability: &str, scope_id: &str) -> bool;
}

/// The caller of a request.
#[derive(Debug, Clone)]
pub struct UserContext {
    /// User name (None for anonymous).
    pub id: Option<String>,
    /// Whether the user is authenticated.
    pub authenticated: bool,
    /// Capabilities held on every blog.
    pub permissions: Vec<String>,
    /// Capabilities held per blog.
    grants: HashMap<String, HashSet<String>>,
}

impl UserContext {
    /// Create context for anonymous user.
    pub fn anonymous() -> Self {
        Self {
            id: None,
            authenticated: false,
            permissions: Vec::new(),
            grants: HashMap::new(),
        }
    }

    /// Create context for authenticated user.
    pub fn authenticated(id: impl Into<String>, permissions: Vec<String>) -> Self {
        Self {
            id: Some(id.into()),
            authenticated: true,
            permissions,
            grants: HashMap::new(),
        }
    }

    /// Site administrator, used by command-line tooling.
    pub fn system() -> Self {
        Self::authenticated("system", vec![ADMINISTER_SITE.to_string()])
    }

    /// Grant a capability on one blog.
    pub fn grant(mut self, scope_id: impl Into<String>, capability: impl Into<String>) -> Self {
        self.grants
            .entry(scope_id.into())
            .or_default()
            .insert(capability.into());
        self
    }

    /// Check if user has a specific site-wide permission.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    /// Check if user is admin.
    pub fn is_admin(&self) -> bool {
        self.has_permission(ADMINISTER_SITE)
    }
}

impl Default for UserContext {
    fn default() -> Self {
        Self::anonymous()
    }
}

#[async_trait]
impl PermissionChecker for UserContext {
    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    async fn check(&self, capability: &str, scope_id: &str) -> bool {
        if self.is_admin() || self.has_permission(capability) {
            return true;
        }

        self.grants
            .get(scope_id)
            .is_some_and(|caps| caps.contains(capability))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn anonymous_holds_nothing() {
        let user = UserContext::anonymous();
        assert!(!user.is_authenticated());
        assert!(!user.check(MANAGE_CATEGORIES, "default").await);
    }

    #[tokio::test]
    async fn admin_holds_everything() {
        let user = UserContext::system();
        assert!(user.is_authenticated());
        assert!(user.check(MANAGE_CATEGORIES, "any-blog").await);
    }

    #[tokio::test]
    async fn grants_are_per_blog() {
        let user = UserContext::authenticated("editor", Vec::new()).grant("news", MANAGE_CATEGORIES);
        assert!(user.check(MANAGE_CATEGORIES, "news").await);
        assert!(!user.check(MANAGE_CATEGORIES, "photos").await);
    }

    #[tokio::test]
    async fn site_wide_permission_applies_to_every_blog() {
        let user = UserContext::authenticated("editor", vec![MANAGE_CATEGORIES.to_string()]);
        assert!(user.check(MANAGE_CATEGORIES, "news").await);
        assert!(user.check(MANAGE_CATEGORIES, "photos").await);
        assert!(!user.is_admin());
    }
}
