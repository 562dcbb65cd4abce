//! # AppError
//!
//! Centralized error handling for the Advanced Posts pipeline.
//! Maps catalog, criteria and feed failures to actionable error types.

use thiserror::Error;

/// Why an external feed could not be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedErrorKind {
    /// Connection refused, DNS failure, timeout or non-success status
    Unreachable,
    /// The feed parsed but carries no items
    Empty,
    /// The body is not a valid RSS/Atom document
    Malformed,
}

impl std::fmt::Display for FeedErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FeedErrorKind::Unreachable => "unreachable",
            FeedErrorKind::Empty => "empty",
            FeedErrorKind::Malformed => "malformed",
        };
        f.write_str(s)
    }
}

/// The primary error type for all cbx-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., taxonomy, post type)
    #[error("{0} not found: {1}")]
    NotFound(String, String),

    /// Rejected input (e.g., limit outside 1..100, malformed post type)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// The local content store could not be queried
    #[error("fetch error: {0}")]
    Fetch(String),

    /// An external feed could not be retrieved or used
    #[error("feed error ({kind}): {reason}")]
    Feed { kind: FeedErrorKind, reason: String },

    /// Resource already exists (e.g., duplicate block name)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Anything else (template failure, invariant breach)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn feed(kind: FeedErrorKind, reason: impl Into<String>) -> Self {
        AppError::Feed { kind, reason: reason.into() }
    }

    /// Only store outages and unreachable feeds are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Fetch(_)
                | AppError::Feed { kind: FeedErrorKind::Unreachable, .. }
        )
    }
}

/// A specialized Result type for cbx-core logic.
pub type Result<T> = std::result::Result<T, AppError>;
