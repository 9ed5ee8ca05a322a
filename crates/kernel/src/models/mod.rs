//! Database models.

pub mod blog;
pub mod category;
pub mod post;

pub use blog::Blog;
pub use category::{Category, CategoryDraft, CreateCategory, UpdateCategory};
pub use post::{CreatePost, Post};
