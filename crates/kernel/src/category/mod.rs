//! Blog categories: listing with post counts, URL management, and
//! permission-checked tree edits.

pub mod aggregate;
pub mod directory;
pub mod query;
pub mod url;

pub use aggregate::{Tally, roll_up};
pub use directory::{CategoryDirectory, CategoryEntry};
pub use query::{CategoryQuery, DEFAULT_POST_TYPE};
