//! Mock definitions and their declarative matchers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::CoreError;

/// Protocol family a mock belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MockKind {
    Http,
    #[serde(rename = "websocket")]
    WebSocket,
    #[serde(rename = "graphql")]
    GraphQl,
    Grpc,
    Soap,
    Mqtt,
    #[serde(rename = "oauth")]
    OAuth,
}

impl MockKind {
    /// Wire name used in URIs and admin payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::WebSocket => "websocket",
            Self::GraphQl => "graphql",
            Self::Grpc => "grpc",
            Self::Soap => "soap",
            Self::Mqtt => "mqtt",
            Self::OAuth => "oauth",
        }
    }
}

/// A registered mock: how to match a request, and the opaque response the
/// executor (out of scope here) will render when it wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mock {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_kind")]
    pub kind: MockKind,
    #[serde(default)]
    pub matcher: HttpMatcher,
    /// Opaque response description. The core never interprets this.
    #[serde(default)]
    pub response: Value,
}

fn default_kind() -> MockKind {
    MockKind::Http
}

impl Mock {
    /// Convenience constructor for an HTTP mock.
    pub fn http(id: impl Into<String>, matcher: HttpMatcher) -> Self {
        Self {
            id: id.into(),
            name: None,
            kind: MockKind::Http,
            matcher,
            response: Value::Null,
        }
    }
}

/// One JSONPath condition: either a literal value the path must yield, or a
/// bare existence requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonPathExpectation {
    /// `{"exists": true|false}`
    Exists {
        exists: bool,
    },
    Literal(Value),
}

impl JsonPathExpectation {
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn exists(exists: bool) -> Self {
        Self::Exists { exists }
    }
}

/// Declarative HTTP request matcher.
///
/// Every field is optional; an empty matcher matches nothing useful (it
/// scores zero). `path` and `path_pattern` are mutually exclusive: a matcher
/// carrying both never matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpMatcher {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_pattern: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub query_params: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_equals: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_contains: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_pattern: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub body_json_path: BTreeMap<String, JsonPathExpectation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtls: Option<MtlsMatcher>,
}

impl HttpMatcher {
    /// Whether any body criterion (including JSONPath conditions) is set.
    pub fn has_body_criteria(&self) -> bool {
        self.body_equals.is_some()
            || self.body_contains.is_some()
            || self.body_pattern.is_some()
            || !self.body_json_path.is_empty()
    }

    /// Validate the matcher for user-facing surfaces.
    ///
    /// Matching itself degrades silently (an invalid matcher scores zero);
    /// this is the descriptive counterpart for validation endpoints.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.path.is_some() && self.path_pattern.is_some() {
            return Err(CoreError::InvalidMatcher(
                "path and pathPattern are mutually exclusive".into(),
            ));
        }
        if let Some(pattern) = &self.path_pattern {
            if pattern.is_empty() {
                return Err(CoreError::InvalidMatcher("pathPattern must not be empty".into()));
            }
        }
        if let Some(method) = &self.method {
            if method.is_empty() || !method.bytes().all(|b| b.is_ascii_alphabetic()) {
                return Err(CoreError::InvalidMatcher(format!(
                    "invalid HTTP method {method:?}"
                )));
            }
        }
        Ok(())
    }
}

/// mTLS criteria. All specified criteria must match the client certificate
/// for the block to contribute any score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MtlsMatcher {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub common_name_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizational_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer_common_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub san_dns: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub san_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub san_ip: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub require_client_auth: bool,
}

impl MtlsMatcher {
    /// Whether any criterion is specified at all.
    pub fn is_empty(&self) -> bool {
        self.fingerprint.is_none()
            && self.common_name.is_none()
            && self.common_name_pattern.is_none()
            && self.organizational_unit.is_none()
            && self.organization.is_none()
            && self.issuer_common_name.is_none()
            && self.san_dns.is_none()
            && self.san_email.is_none()
            && self.san_ip.is_none()
            && !self.require_client_auth
    }
}
