//! Core error type.

use thiserror::Error;

/// Errors surfaced by the core data model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CoreError {
    /// A matcher failed user-driven validation (matching itself never
    /// raises; it degrades to a zero score).
    #[error("invalid matcher: {0}")]
    InvalidMatcher(String),

    /// A `mockd://` URI failed to parse.
    #[error(transparent)]
    Uri(#[from] crate::uri::UriError),
}
