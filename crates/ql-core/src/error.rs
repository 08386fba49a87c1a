//! # AppError
//!
//! Centralized error handling for the Quill ecosystem.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all ql-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Group, User, Post)
    #[error("{0} not found: {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., empty text, invalid image)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Security/Auth failure (e.g., bad credentials, expired session)
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Infrastructure failure (e.g., DB down, disk full)
    #[error("internal service error: {0}")]
    Internal(String),

    /// Resource already exists (e.g., duplicate username or group slug)
    #[error("conflict: {0}")]
    Conflict(String),
}

impl AppError {
    pub fn not_found(kind: &str, key: impl ToString) -> Self {
        AppError::NotFound(kind.to_string(), key.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Plugins attach context; keep the whole chain.
        AppError::Internal(format!("{err:#}"))
    }
}

/// A specialized Result type for Quill logic.
pub type Result<T> = std::result::Result<T, AppError>;
