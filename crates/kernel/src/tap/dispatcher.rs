//! Tap dispatcher - invokes category taps in weight order.
//!
//! Before-taps run in sequence on the same draft; the first error aborts the
//! write. After-tap errors are logged and skipped, allowing other handlers
//! to continue.

use std::sync::Arc;

use tracing::{debug, error};

use super::{Tap, TapRegistry};
use crate::error::{AppError, AppResult};
use crate::models::{Category, CategoryDraft};

/// Dispatcher for invoking category taps.
#[derive(Debug, Clone, Default)]
pub struct TapDispatcher {
    registry: Arc<TapRegistry>,
}

impl TapDispatcher {
    /// Create a new tap dispatcher.
    pub fn new(registry: Arc<TapRegistry>) -> Self {
        Self { registry }
    }

    /// Get the tap registry for handler introspection.
    pub fn registry(&self) -> &TapRegistry {
        &self.registry
    }

    /// Run `before_create` handlers. Handlers may rewrite `draft`.
    pub async fn before_create(&self, blog_id: &str, draft: &mut CategoryDraft) -> AppResult<()> {
        let tap = Tap::BeforeCreate;
        let handlers = self.registry.handlers();
        for h in &handlers {
            h.handler
                .before_create(blog_id, draft)
                .await
                .map_err(|e| rejected(tap, h.handler.name(), &e))?;
        }

        debug!(tap = tap.name(), handlers = handlers.len(), "dispatch complete");
        Ok(())
    }

    /// Run `before_update` handlers. Handlers may rewrite `draft`.
    pub async fn before_update(
        &self,
        blog_id: &str,
        id: i64,
        draft: &mut CategoryDraft,
    ) -> AppResult<()> {
        let tap = Tap::BeforeUpdate;
        let handlers = self.registry.handlers();
        for h in &handlers {
            h.handler
                .before_update(blog_id, id, draft)
                .await
                .map_err(|e| rejected(tap, h.handler.name(), &e))?;
        }

        debug!(tap = tap.name(), handlers = handlers.len(), "dispatch complete");
        Ok(())
    }

    /// Run `after_create` handlers.
    pub async fn after_create(&self, category: &Category) {
        let tap = Tap::AfterCreate;
        let handlers = self.registry.handlers();
        let mut failed = 0;
        for h in &handlers {
            if let Err(e) = h.handler.after_create(category).await {
                failed += 1;
                error!(
                    handler = %h.handler.name(),
                    tap = tap.name(),
                    category = category.id,
                    error = %e,
                    "tap invocation failed"
                );
            }
        }

        debug!(tap = tap.name(), handlers = handlers.len(), failed, "dispatch complete");
    }

    /// Run `after_update` handlers.
    pub async fn after_update(&self, category: &Category) {
        let tap = Tap::AfterUpdate;
        let handlers = self.registry.handlers();
        let mut failed = 0;
        for h in &handlers {
            if let Err(e) = h.handler.after_update(category).await {
                failed += 1;
                error!(
                    handler = %h.handler.name(),
                    tap = tap.name(),
                    category = category.id,
                    error = %e,
                    "tap invocation failed"
                );
            }
        }

        debug!(tap = tap.name(), handlers = handlers.len(), failed, "dispatch complete");
    }
}

fn rejected(tap: Tap, handler: &str, e: &anyhow::Error) -> AppError {
    debug!(tap = tap.name(), handler = %handler, error = %e, "tap rejected write");
    AppError::TapRejected {
        tap: tap.name(),
        handler: handler.to_string(),
        message: e.to_string(),
    }
}
