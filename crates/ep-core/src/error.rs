//! # AppError
//!
//! Centralized error handling for Event Pocket.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all ep-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Comment)
    #[error("{0} not found")]
    NotFound(String),

    /// Validation failure (e.g., post too long, invalid file type)
    #[error("{0}")]
    ValidationError(String),

    /// Fingerprint mismatch or an expired edit window
    #[error("{0}")]
    Forbidden(String),

    /// Infrastructure failure (e.g., DB down, disk full)
    #[error("{0}")]
    Internal(String),
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// A specialized Result type for Event Pocket logic.
pub type Result<T> = std::result::Result<T, AppError>;
