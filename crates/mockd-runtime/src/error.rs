//! Runtime client error type.

use thiserror::Error;

/// Result alias for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors from the control-plane client and its cache.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RuntimeError {
    /// The control plane could not be reached.
    #[error("control plane at {url} is unreachable: {detail}")]
    Unreachable { url: String, detail: String },

    /// The control plane answered with an unexpected status.
    #[error("control plane returned {status}: {detail}")]
    Status { status: u16, detail: String },

    /// A response body failed to decode.
    #[error("failed to decode control-plane response: {0}")]
    Decode(String),

    /// The runtime has not registered yet.
    #[error("runtime is not registered with the control plane")]
    NotRegistered,

    /// Cache I/O failure.
    #[error("deployment cache error: {0}")]
    Cache(#[from] std::io::Error),
}
