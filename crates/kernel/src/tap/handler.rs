//! Tap names and the handler trait.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Category, CategoryDraft};

/// Category extension points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tap {
    BeforeCreate,
    AfterCreate,
    BeforeUpdate,
    AfterUpdate,
}

impl Tap {
    /// Stable name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BeforeCreate => "tap_category_before_create",
            Self::AfterCreate => "tap_category_after_create",
            Self::BeforeUpdate => "tap_category_before_update",
            Self::AfterUpdate => "tap_category_after_update",
        }
    }
}

/// Reacts to category writes. Every method defaults to doing nothing.
///
/// Before-taps may rewrite the draft or refuse the write by returning an
/// error. After-tap errors are logged and do not undo the write.
#[async_trait]
pub trait CategoryTaps: Send + Sync {
    /// Handler name for logs and errors.
    fn name(&self) -> &str;

    async fn before_create(&self, _blog_id: &str, _draft: &mut CategoryDraft) -> Result<()> {
        Ok(())
    }

    async fn after_create(&self, _category: &Category) -> Result<()> {
        Ok(())
    }

    async fn before_update(
        &self,
        _blog_id: &str,
        _id: i64,
        _draft: &mut CategoryDraft,
    ) -> Result<()> {
        Ok(())
    }

    async fn after_update(&self, _category: &Category) -> Result<()> {
        Ok(())
    }
}
