//! Composite scoring: one weighted score per (matcher, request) pair.

use std::collections::HashMap;

use mockd_core::{ClientIdentity, HttpMatcher, Mock};
use serde_json::Value;
use tracing::trace;

use crate::{body, fields, jsonpath, mtls, path};

/// An inbound request as seen by the matcher: protocol listeners read the
/// body up front so scoring stays pure and reentrant.
#[derive(Debug, Clone, Default)]
pub struct MockRequest {
    pub method: String,
    pub path: String,
    /// Header name/value pairs; names compare case-insensitively.
    pub headers: Vec<(String, String)>,
    /// Decoded query parameters in request order.
    pub query: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub identity: Option<ClientIdentity>,
}

impl MockRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_identity(mut self, identity: ClientIdentity) -> Self {
        self.identity = Some(identity);
        self
    }
}

/// Result of scoring one matcher against one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchResult {
    pub score: u32,
    pub matched: bool,
    pub path_captures: HashMap<String, String>,
    pub json_path_captures: HashMap<String, Value>,
}

impl MatchResult {
    fn no_match() -> Self {
        Self::default()
    }
}

/// Score a matcher against a request, short-circuiting on the first failed
/// required dimension. Cheap dimensions are evaluated first.
pub fn match_score(matcher: &HttpMatcher, request: &MockRequest) -> MatchResult {
    // path and pathPattern together never match
    if matcher.path.is_some() && matcher.path_pattern.is_some() {
        return MatchResult::no_match();
    }

    let mut total = 0u32;
    let mut path_captures = HashMap::new();
    let mut json_path_captures = HashMap::new();

    if let Some(expected) = &matcher.method {
        if !fields::match_method(expected, &request.method) {
            return MatchResult::no_match();
        }
        total += crate::score::METHOD;
    }

    if let Some(pattern) = &matcher.path {
        match path::match_path(pattern, &request.path) {
            Some(m) => {
                total += m.score;
                path_captures.extend(m.captures);
            }
            None => return MatchResult::no_match(),
        }
    }

    if let Some(pattern) = &matcher.path_pattern {
        match path::match_path_pattern(pattern, &request.path) {
            Some(m) => {
                total += m.score;
                path_captures.extend(m.captures);
            }
            None => return MatchResult::no_match(),
        }
    }

    for (name, expected) in &matcher.headers {
        match fields::header_value(&request.headers, name) {
            Some(actual) if fields::match_header_value(expected, actual) => {
                total += crate::score::HEADER;
            }
            _ => return MatchResult::no_match(),
        }
    }

    for (name, expected) in &matcher.query_params {
        match fields::query_value(&request.query, name) {
            Some(actual) if actual == expected => total += crate::score::QUERY_PARAM,
            _ => return MatchResult::no_match(),
        }
    }

    if body::has_plain_criteria(matcher) {
        match body::match_body(matcher, &request.body) {
            Some(score) => total += score,
            None => return MatchResult::no_match(),
        }
    }

    if !matcher.body_json_path.is_empty() {
        match jsonpath::match_json_path(&matcher.body_json_path, &request.body) {
            Some(outcome) => {
                total += outcome.score;
                json_path_captures.extend(outcome.captures);
            }
            None => return MatchResult::no_match(),
        }
    }

    if let Some(criteria) = &matcher.mtls {
        if !criteria.is_empty() {
            match mtls::match_mtls(criteria, request.identity.as_ref()) {
                Some(score) => total += score,
                None => return MatchResult::no_match(),
            }
        }
    }

    MatchResult {
        matched: total > 0,
        score: total,
        path_captures,
        json_path_captures,
    }
}

/// Scan candidates in order; the highest positive score wins and ties keep
/// the earliest candidate.
pub fn select_best<'a>(
    mocks: impl IntoIterator<Item = &'a Mock>,
    request: &MockRequest,
) -> Option<(&'a Mock, MatchResult)> {
    let mut best: Option<(&Mock, MatchResult)> = None;

    for mock in mocks {
        let result = match_score(&mock.matcher, request);
        trace!(mock = %mock.id, score = result.score, "scored candidate");
        if !result.matched {
            continue;
        }
        match &best {
            Some((_, current)) if result.score <= current.score => {}
            _ => best = Some((mock, result)),
        }
    }

    best
}
