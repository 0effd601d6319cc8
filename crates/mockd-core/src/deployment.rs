//! Deployment snapshots pushed from the control plane.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A runtime-local binding of a mock version to a URL path.
///
/// `url_path` is unique within a runtime's active set: deploying to an
/// occupied path evicts the previous deployment. `id` is unique outright.
/// Both invariants are enforced by the runtime's deployment index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: String,
    pub mock_id: String,
    pub mock_version: String,
    pub url_path: String,
    /// Opaque mock content as shipped by the control plane.
    #[serde(default)]
    pub content: Value,
    pub deployed_at: DateTime<Utc>,
}

impl Deployment {
    pub fn new(
        id: impl Into<String>,
        mock_id: impl Into<String>,
        mock_version: impl Into<String>,
        url_path: impl Into<String>,
        content: Value,
    ) -> Self {
        Self {
            id: id.into(),
            mock_id: mock_id.into(),
            mock_version: mock_version.into(),
            url_path: url_path.into(),
            content,
            deployed_at: Utc::now(),
        }
    }
}
