//! The `mockd://` addressing scheme.
//!
//! `mockd://<workspace>/<collection>[@<version>]` names a collection of
//! mocks inside a workspace, optionally pinned to a version. A version that
//! looks like `v<digit>…` is a semantic version; any other non-empty
//! version is a branch name.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const SCHEME: &str = "mockd://";
const WORKSPACE_MIN: usize = 3;
const WORKSPACE_MAX: usize = 63;

/// Classification of the optional version component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionKind {
    Semantic,
    Branch,
}

/// Errors produced while parsing a `mockd://` URI.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum UriError {
    #[error("URI must start with {SCHEME}")]
    BadScheme,
    #[error("workspace slug {0:?} is invalid: 3-63 chars of [a-z0-9-], no leading/trailing dash")]
    BadWorkspace(String),
    #[error("collection is missing")]
    MissingCollection,
    #[error("collection contains an empty segment")]
    EmptyCollectionSegment,
    #[error("version is empty")]
    EmptyVersion,
}

/// A parsed `mockd://workspace/collection[@version]` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockdUri {
    workspace: String,
    collection: String,
    version: Option<String>,
}

impl MockdUri {
    /// Parse a `mockd://` URI, validating every component.
    pub fn parse(input: &str) -> Result<Self, UriError> {
        let rest = input.strip_prefix(SCHEME).ok_or(UriError::BadScheme)?;

        let (workspace, rest) = rest.split_once('/').ok_or(UriError::MissingCollection)?;
        if !is_valid_workspace(workspace) {
            return Err(UriError::BadWorkspace(workspace.to_string()));
        }

        let (collection, version) = match rest.rsplit_once('@') {
            Some((collection, version)) => {
                if version.is_empty() {
                    return Err(UriError::EmptyVersion);
                }
                (collection, Some(version.to_string()))
            }
            None => (rest, None),
        };

        if collection.is_empty() {
            return Err(UriError::MissingCollection);
        }
        if collection.split('/').any(str::is_empty) {
            return Err(UriError::EmptyCollectionSegment);
        }

        Ok(Self {
            workspace: workspace.to_string(),
            collection: collection.to_string(),
            version,
        })
    }

    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// How the version component should be interpreted, if present.
    pub fn version_kind(&self) -> Option<VersionKind> {
        self.version.as_deref().map(|v| {
            let mut chars = v.chars();
            if chars.next() == Some('v') && chars.next().is_some_and(|c| c.is_ascii_digit()) {
                VersionKind::Semantic
            } else {
                VersionKind::Branch
            }
        })
    }
}

impl fmt::Display for MockdUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}{}/{}", self.workspace, self.collection)?;
        if let Some(version) = &self.version {
            write!(f, "@{version}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for MockdUri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn is_valid_workspace(slug: &str) -> bool {
    let len = slug.len();
    if !(WORKSPACE_MIN..=WORKSPACE_MAX).contains(&len) {
        return false;
    }
    let bytes = slug.as_bytes();
    let inner_ok = bytes
        .iter()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-');
    inner_ok && bytes[0] != b'-' && bytes[len - 1] != b'-'
}
