//! # mockd-core
//!
//! Shared data model for the mockd mock-endpoint server.
//!
//! This crate holds the declarative types the rest of the workspace agrees
//! on: mock definitions and their HTTP matchers, the TLS client identity
//! attached to inbound requests, deployment snapshots pushed from the
//! control plane, and the `mockd://` addressing scheme. It deliberately
//! contains no I/O and no matching logic; scoring lives in `mockd-matcher`
//! and everything network-shaped lives in `mockd-mcp` / `mockd-runtime`.

#![warn(missing_debug_implementations, rust_2018_idioms, clippy::all)]
#![forbid(unsafe_code)]

mod deployment;
mod error;
mod identity;
mod mock;
mod uri;

pub use deployment::Deployment;
pub use error::CoreError;
pub use identity::{ClientIdentity, IssuerIdentity, SubjectAltNames, normalize_fingerprint};
pub use mock::{HttpMatcher, JsonPathExpectation, Mock, MockKind, MtlsMatcher};
pub use uri::{MockdUri, UriError, VersionKind};

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
