//! Score weights for every match dimension.
//!
//! Totals are sums of these constants, so distinct values double as a
//! coarse trace of which dimensions fired. Within a family, more specific
//! criteria carry strictly greater weight.

/// Full-body byte equality.
pub const BODY_EQUALS: u32 = 25;
/// Body matched a regex.
pub const BODY_PATTERN: u32 = 22;
/// Body contained a substring.
pub const BODY_CONTAINS: u32 = 20;
/// No body criterion of any kind was specified.
pub const BODY_NO_CRITERIA: u32 = 1;

/// Exact path string equality.
pub const PATH_EXACT: u32 = 15;
/// Path matched a regex pattern.
pub const PATH_PATTERN: u32 = 14;
/// Path matched a `{name}` segment template.
pub const PATH_NAMED_PARAMS: u32 = 12;
/// Path matched a wildcard (`/*` suffix or glob).
pub const PATH_WILDCARD: u32 = 10;

/// Method equality.
pub const METHOD: u32 = 10;
/// One matching header.
pub const HEADER: u32 = 10;
/// One matching query parameter.
pub const QUERY_PARAM: u32 = 5;
/// One satisfied JSONPath condition.
pub const JSON_PATH_CONDITION: u32 = 15;

/// Certificate fingerprint equality.
pub const MTLS_FINGERPRINT: u32 = 50;
/// Subject common name equality.
pub const MTLS_CN: u32 = 15;
/// Subject common name regex.
pub const MTLS_CN_PATTERN: u32 = 12;
/// Organizational unit membership.
pub const MTLS_OU: u32 = 10;
/// Organization membership.
pub const MTLS_O: u32 = 10;
/// Issuer common name equality.
pub const MTLS_ISSUER: u32 = 10;
/// SAN DNS entry (wildcards allowed).
pub const MTLS_SAN_DNS: u32 = 10;
/// SAN email entry.
pub const MTLS_SAN_EMAIL: u32 = 10;
/// SAN IP entry.
pub const MTLS_SAN_IP: u32 = 10;
/// A verified client certificate is present.
pub const MTLS_REQUIRE_AUTH: u32 = 5;

// Specificity ordering within families is part of the scoring contract.
const _: () = {
    assert!(BODY_EQUALS > BODY_PATTERN);
    assert!(BODY_PATTERN > BODY_CONTAINS);
    assert!(BODY_CONTAINS > BODY_NO_CRITERIA);
    assert!(PATH_EXACT > PATH_PATTERN);
    assert!(PATH_PATTERN > PATH_NAMED_PARAMS);
    assert!(PATH_NAMED_PARAMS > PATH_WILDCARD);
};
