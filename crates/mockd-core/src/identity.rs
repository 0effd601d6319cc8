//! TLS client identity attached to inbound requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Issuer of the client certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerIdentity {
    #[serde(default)]
    pub common_name: String,
    #[serde(default)]
    pub organization: Vec<String>,
}

/// Subject alternative names carried by the client certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubjectAltNames {
    pub dns: Vec<String>,
    pub email: Vec<String>,
    pub ip: Vec<String>,
    pub uri: Vec<String>,
}

/// Identity extracted from a verified (or unverified) peer certificate at
/// TLS handshake time. Attached to the request context and read-only from
/// then on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientIdentity {
    #[serde(default)]
    pub common_name: String,
    #[serde(default)]
    pub organization: Vec<String>,
    #[serde(default)]
    pub organizational_unit: Vec<String>,
    #[serde(default)]
    pub country: Vec<String>,
    #[serde(default)]
    pub serial_number: String,
    #[serde(default)]
    pub issuer: IssuerIdentity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_after: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sans: SubjectAltNames,
    /// SHA-256 over the DER certificate, lowercase hex, no separators.
    #[serde(default)]
    pub fingerprint: String,
    /// Whether the certificate chain verified against the configured roots.
    #[serde(default)]
    pub verified: bool,
}

/// Normalize a certificate fingerprint for comparison.
///
/// Strips a `sha256:` prefix (any case), drops `:` separators, and
/// lowercases. Idempotent: `normalize_fingerprint(normalize_fingerprint(s))
/// == normalize_fingerprint(s)`.
pub fn normalize_fingerprint(fingerprint: &str) -> String {
    let trimmed = fingerprint.trim();
    let without_prefix = trimmed
        .strip_prefix("sha256:")
        .or_else(|| trimmed.strip_prefix("SHA256:"))
        .unwrap_or(trimmed);
    without_prefix
        .chars()
        .filter(|c| *c != ':')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_normalization_strips_prefix_and_colons() {
        assert_eq!(normalize_fingerprint("sha256:AB:CD:EF"), "abcdef");
        assert_eq!(normalize_fingerprint("SHA256:ab:cd:ef"), "abcdef");
        assert_eq!(normalize_fingerprint("ABCDEF"), "abcdef");
    }

    #[test]
    fn fingerprint_normalization_is_idempotent() {
        let once = normalize_fingerprint("sha256:AB:CD");
        assert_eq!(normalize_fingerprint(&once), once);
    }

    #[test]
    fn identity_serializes_camel_case() {
        let identity = ClientIdentity {
            common_name: "client.internal".into(),
            fingerprint: "abcd".into(),
            verified: true,
            ..Default::default()
        };
        let wire = serde_json::to_value(&identity).unwrap();
        assert_eq!(wire["commonName"], "client.internal");
        assert_eq!(wire["verified"], true);
    }
}
