//! mTLS criteria matching against the extracted client identity.
//!
//! Semantics are all-or-nothing: every specified criterion must match or
//! the whole block contributes zero. Matched criteria accumulate their
//! individual weights, so a fingerprint pin dominates softer subject
//! checks.

use mockd_core::{ClientIdentity, MtlsMatcher, normalize_fingerprint};
use regex::Regex;

use crate::score;

/// Score the mTLS block against the request identity.
///
/// `None` when any specified criterion fails, including the case where the
/// matcher specifies criteria but no client certificate was presented.
pub(crate) fn match_mtls(matcher: &MtlsMatcher, identity: Option<&ClientIdentity>) -> Option<u32> {
    if matcher.is_empty() {
        return Some(0);
    }
    let identity = identity?;

    let mut total = 0;

    if let Some(expected) = &matcher.fingerprint {
        if normalize_fingerprint(expected) != normalize_fingerprint(&identity.fingerprint) {
            return None;
        }
        total += score::MTLS_FINGERPRINT;
    }

    if let Some(expected) = &matcher.common_name {
        if *expected != identity.common_name {
            return None;
        }
        total += score::MTLS_CN;
    }

    if let Some(pattern) = &matcher.common_name_pattern {
        let re = Regex::new(pattern).ok()?;
        if !re.is_match(&identity.common_name) {
            return None;
        }
        total += score::MTLS_CN_PATTERN;
    }

    if let Some(expected) = &matcher.organizational_unit {
        if !identity.organizational_unit.iter().any(|ou| ou == expected) {
            return None;
        }
        total += score::MTLS_OU;
    }

    if let Some(expected) = &matcher.organization {
        if !identity.organization.iter().any(|o| o == expected) {
            return None;
        }
        total += score::MTLS_O;
    }

    if let Some(expected) = &matcher.issuer_common_name {
        if *expected != identity.issuer.common_name {
            return None;
        }
        total += score::MTLS_ISSUER;
    }

    if let Some(expected) = &matcher.san_dns {
        if !identity.sans.dns.iter().any(|d| dns_name_matches(d, expected)) {
            return None;
        }
        total += score::MTLS_SAN_DNS;
    }

    if let Some(expected) = &matcher.san_email {
        if !identity.sans.email.iter().any(|e| e == expected) {
            return None;
        }
        total += score::MTLS_SAN_EMAIL;
    }

    if let Some(expected) = &matcher.san_ip {
        if !identity.sans.ip.iter().any(|ip| ip == expected) {
            return None;
        }
        total += score::MTLS_SAN_IP;
    }

    if matcher.require_client_auth {
        if !identity.verified {
            return None;
        }
        total += score::MTLS_REQUIRE_AUTH;
    }

    Some(total)
}

/// Maximum achievable score for the criteria actually specified.
pub(crate) fn max_mtls_score(matcher: &MtlsMatcher) -> u32 {
    let mut max = 0;
    if matcher.fingerprint.is_some() {
        max += score::MTLS_FINGERPRINT;
    }
    if matcher.common_name.is_some() {
        max += score::MTLS_CN;
    }
    if matcher.common_name_pattern.is_some() {
        max += score::MTLS_CN_PATTERN;
    }
    if matcher.organizational_unit.is_some() {
        max += score::MTLS_OU;
    }
    if matcher.organization.is_some() {
        max += score::MTLS_O;
    }
    if matcher.issuer_common_name.is_some() {
        max += score::MTLS_ISSUER;
    }
    if matcher.san_dns.is_some() {
        max += score::MTLS_SAN_DNS;
    }
    if matcher.san_email.is_some() {
        max += score::MTLS_SAN_EMAIL;
    }
    if matcher.san_ip.is_some() {
        max += score::MTLS_SAN_IP;
    }
    if matcher.require_client_auth {
        max += score::MTLS_REQUIRE_AUTH;
    }
    max
}

/// A certificate SAN matches the expected name either exactly or, for a
/// wildcard certificate entry (`*.example.com`), by single-label expansion.
fn dns_name_matches(cert_name: &str, expected: &str) -> bool {
    if cert_name.eq_ignore_ascii_case(expected) {
        return true;
    }
    if let Some(domain) = cert_name.strip_prefix("*.") {
        if let Some(rest) = expected
            .split_once('.')
            .map(|(_, rest)| rest)
        {
            return rest.eq_ignore_ascii_case(domain);
        }
    }
    false
}
