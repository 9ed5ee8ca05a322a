//! Content helpers shared by the category store.

pub mod filter;

pub use filter::{FilterPipeline, TextFilter};
