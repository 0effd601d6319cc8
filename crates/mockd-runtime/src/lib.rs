//! # mockd-runtime
//!
//! Control-plane client for remote mockd runtimes.
//!
//! A runtime registers itself with the control plane, then heartbeats on a
//! fixed interval; each heartbeat response may carry deploy/undeploy
//! commands which are applied to an in-memory deployment index and
//! mirrored to a disk cache so a restart without connectivity still serves
//! the last known deployments.

#![warn(missing_debug_implementations, rust_2018_idioms, clippy::all)]
#![forbid(unsafe_code)]

mod cache;
mod client;
mod error;
mod index;
pub mod wire;

pub use cache::DeploymentCache;
pub use client::{RuntimeClient, RuntimeConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use index::DeploymentIndex;
