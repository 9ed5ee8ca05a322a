//! Tap registry - holds category tap handlers in weight order.
//!
//! Lower weight = higher priority, called first. Handlers with equal weight
//! run in registration order.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::CategoryTaps;

/// A registered tap handler with its priority.
#[derive(Clone)]
pub struct TapHandler {
    pub handler: Arc<dyn CategoryTaps>,
    /// Weight for ordering (lower = higher priority).
    pub weight: i32,
}

impl fmt::Debug for TapHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TapHandler")
            .field("handler", &self.handler.name())
            .field("weight", &self.weight)
            .finish()
    }
}

/// Registry of category tap handlers.
///
/// Handlers can be added while directories sharing the registry are in use.
#[derive(Debug, Default)]
pub struct TapRegistry {
    handlers: RwLock<Vec<TapHandler>>,
}

impl TapRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler.
    pub fn register(&self, handler: Arc<dyn CategoryTaps>, weight: i32) {
        let mut handlers = self.handlers.write();
        handlers.push(TapHandler { handler, weight });
        handlers.sort_by_key(|h| h.weight);
    }

    /// Snapshot of the handlers, in weight order.
    pub fn handlers(&self) -> Vec<TapHandler> {
        self.handlers.read().clone()
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }
}
