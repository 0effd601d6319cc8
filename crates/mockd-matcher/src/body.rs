//! Body matching: byte equality, substring, and regex criteria.
//!
//! The three criteria combine as a logical AND. When no body criterion of
//! any kind is specified (including JSONPath conditions) the body dimension
//! reports the minimal "no requirement" score.

use mockd_core::HttpMatcher;
use regex::Regex;

use crate::score;

/// Score the plain body criteria of a matcher against the request body.
///
/// Returns `None` when any specified criterion fails. An invalid regex
/// fails the pattern criterion without raising.
pub(crate) fn match_body(matcher: &HttpMatcher, body: &[u8]) -> Option<u32> {
    if !matcher.has_body_criteria() {
        return Some(score::BODY_NO_CRITERIA);
    }

    let mut total = 0;

    if let Some(expected) = &matcher.body_equals {
        if expected.as_bytes() != body {
            return None;
        }
        total += score::BODY_EQUALS;
    }

    if let Some(needle) = &matcher.body_contains {
        let text = std::str::from_utf8(body).ok()?;
        if !text.contains(needle.as_str()) {
            return None;
        }
        total += score::BODY_CONTAINS;
    }

    if let Some(pattern) = &matcher.body_pattern {
        let re = Regex::new(pattern).ok()?;
        let text = std::str::from_utf8(body).ok()?;
        if !re.is_match(text) {
            return None;
        }
        total += score::BODY_PATTERN;
    }

    Some(total)
}

/// Whether any of the three plain body criteria is present (JSONPath is
/// scored separately).
pub(crate) fn has_plain_criteria(matcher: &HttpMatcher) -> bool {
    matcher.body_equals.is_some() || matcher.body_contains.is_some() || matcher.body_pattern.is_some()
}

/// Maximum achievable plain-body score, for near-miss ceilings.
pub(crate) fn max_body_score(matcher: &HttpMatcher) -> u32 {
    let mut max = 0;
    if matcher.body_equals.is_some() {
        max += score::BODY_EQUALS;
    }
    if matcher.body_contains.is_some() {
        max += score::BODY_CONTAINS;
    }
    if matcher.body_pattern.is_some() {
        max += score::BODY_PATTERN;
    }
    max
}
