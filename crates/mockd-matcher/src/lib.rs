//! # mockd-matcher
//!
//! The scoring-based request matcher.
//!
//! Each candidate mock's [`HttpMatcher`](mockd_core::HttpMatcher) is scored
//! against an incoming request across independent dimensions (method, path,
//! headers, query, body, JSONPath conditions, mTLS identity). Weights are
//! chosen so that more specific criteria always beat less specific ones;
//! the composite scorer short-circuits on any failed required dimension,
//! while the near-miss analyzer re-evaluates everything to explain *why* a
//! mock did not win.
//!
//! Everything in this crate is pure and reentrant: matchers take borrowed
//! inputs, never block, and treat every internal error (invalid regex,
//! malformed JSON body) as "this mock does not match".

#![warn(missing_debug_implementations, rust_2018_idioms, clippy::all)]
#![forbid(unsafe_code)]

mod body;
mod fields;
mod identity;
mod jsonpath;
mod mtls;
mod near_miss;
mod path;
pub mod score;
mod scorer;

pub use identity::{IdentityError, attach_identity, identity_from_der, identity_from_extensions};
pub use near_miss::{DEFAULT_TOP_N, FieldResult, NearMiss, analyze_near_misses};
pub use scorer::{MatchResult, MockRequest, match_score, select_best};
