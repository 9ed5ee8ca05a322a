//! Quill Kernel Library
//!
//! The hierarchical category store of the Quill blogging platform: a
//! nested-set tree per blog, post-count roll-ups, URL management, and
//! permission-checked edits. The `quill` binary wraps it in an operator CLI.

pub mod category;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod models;
pub mod permissions;
pub mod tap;
pub mod tree;
