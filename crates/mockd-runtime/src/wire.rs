//! Control-plane wire formats (JSON, camelCase).

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Deserializes a `null` JSON value the same as a missing field, then
/// falls through to the field's `Default`.
fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let opt = Option::<T>::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

/// Registration request: `POST /api/v1/runtimes/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub url: String,
    #[serde(
        default,
        deserialize_with = "deserialize_null_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub labels: BTreeMap<String, String>,
}

/// Registration response (201).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub id: String,
    /// Rotated auth token to adopt, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(
        default,
        deserialize_with = "deserialize_null_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// One active deployment, as summarized in a heartbeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSummary {
    pub mock_id: String,
    pub version: String,
    pub path: String,
}

/// Heartbeat request: `POST /api/v1/runtimes/{id}/heartbeat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRequest {
    pub status: String,
    pub version: String,
    #[serde(default)]
    pub deployments: Vec<DeploymentSummary>,
}

/// Heartbeat response: zero or more commands to apply in order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatResponse {
    #[serde(default)]
    pub commands: Vec<Command>,
}

/// A control-plane command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Command {
    #[serde(rename_all = "camelCase")]
    Deploy {
        deployment_id: String,
        mock_id: String,
        mock_version: String,
        url_path: String,
        #[serde(default)]
        content: Value,
    },
    #[serde(rename_all = "camelCase")]
    Undeploy { deployment_id: String },
}

/// Full deployment listing: `GET /api/v1/runtimes/{id}/deployments`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullResponse {
    #[serde(default)]
    pub deployments: Vec<PulledDeployment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PulledDeployment {
    pub id: String,
    pub mock_id: String,
    pub version: String,
    pub url_path: String,
    #[serde(default)]
    pub content: Value,
}

/// Response to `GET /api/v1/pull?uri=<mockd-uri>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PulledCollection {
    pub collection: String,
    pub version: String,
    #[serde(default)]
    pub content: Value,
}
