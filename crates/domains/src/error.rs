//! # AppError
//!
//! Centralized error handling for the shop backend.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all domain operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing, malformed, expired or tampered credentials. Deliberately
    /// carries no hint of which of those it was.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Resource absent or owned by someone else; the two are
    /// indistinguishable to the caller.
    #[error("{0} not found with ID {1}")]
    NotFound(&'static str, String),

    /// Validation failure (e.g., non-positive price, oversized image)
    #[error("{0}")]
    Validation(String),

    /// Infrastructure failure (e.g., DB down, storage write failed)
    #[error("internal service error: {0}")]
    Internal(String),
}

/// A specialized Result type for shop logic.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        AppError::NotFound(kind, id.to_string())
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        AppError::Internal(err.to_string())
    }
}
