//! Application error types.
//!
//! Expected domain failures (permissions, validation, structural conflicts)
//! are typed variants; storage and unexpected failures are wrapped.

use thiserror::Error;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    /// The caller lacks the capability for this operation on this blog.
    #[error("permission denied: '{capability}' required on blog '{blog_id}'")]
    PermissionDenied {
        capability: &'static str,
        blog_id: String,
    },

    /// The operation targets a row that does not exist, or one that is
    /// still referenced by content.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// A required value is missing after every fallback was applied.
    #[error("missing or empty value: {0}")]
    MissingOrEmptyValue(&'static str),

    /// The requested mutation would break the tree structure.
    #[error("structural violation: {0}")]
    StructuralViolation(String),

    /// A before-save tap refused the write.
    #[error("tap '{tap}' handler '{handler}' rejected the change: {message}")]
    TapRejected {
        tap: &'static str,
        handler: String,
        message: String,
    },

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a permission denied error.
    pub fn permission_denied(capability: &'static str, blog_id: impl Into<String>) -> Self {
        Self::PermissionDenied {
            capability,
            blog_id: blog_id.into(),
        }
    }

    /// Create an invalid reference error for a missing row.
    pub fn not_found(entity: &str, id: i64) -> Self {
        Self::InvalidReference(format!("{entity} {id} does not exist"))
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;
