//! Tap system for category extension points.
//!
//! Taps are named extension points that handlers can implement. When a tap is invoked,
//! all registered handlers are called in weight order (lower = higher priority).

mod dispatcher;
mod handler;
mod registry;

pub use dispatcher::TapDispatcher;
pub use handler::{CategoryTaps, Tap};
pub use registry::{TapHandler, TapRegistry};
