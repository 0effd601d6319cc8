//! Near-miss diagnostics: why did a candidate not win?
//!
//! Unlike the composite scorer this path never short-circuits. Every
//! specified dimension is evaluated and recorded, so a failed mock still
//! reports which criteria it did satisfy and how close it came.

use mockd_core::{ClientIdentity, Mock, MtlsMatcher};
use serde::Serialize;

use crate::scorer::MockRequest;
use crate::{body, fields, jsonpath, mtls, path, score};

/// How many near misses to keep by default.
pub const DEFAULT_TOP_N: usize = 3;

/// Per-dimension evaluation record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldResult {
    pub field: String,
    pub matched: bool,
    /// Score earned; contributes to the near-miss score only when matched.
    pub score: u32,
    /// Ceiling for this dimension; always contributes to the max.
    pub max_score: u32,
    pub expected: String,
    pub actual: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// One candidate that scored above zero but was not selected.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearMiss {
    pub mock_id: String,
    pub score: u32,
    pub max_possible_score: u32,
    /// `floor(100 * score / max_possible_score)`, 0 when nothing was specified.
    pub match_percentage: u32,
    pub reason: String,
    pub fields: Vec<FieldResult>,
}

/// Evaluate every candidate without short-circuiting and keep the closest
/// `top_n` (positive score only), sorted by score then percentage.
pub fn analyze_near_misses<'a>(
    mocks: impl IntoIterator<Item = &'a Mock>,
    request: &MockRequest,
    top_n: usize,
) -> Vec<NearMiss> {
    let mut misses: Vec<NearMiss> = mocks
        .into_iter()
        .filter_map(|mock| {
            let miss = analyze_one(mock, request);
            (miss.score > 0).then_some(miss)
        })
        .collect();

    misses.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(b.match_percentage.cmp(&a.match_percentage))
    });
    misses.truncate(top_n);
    misses
}

fn analyze_one(mock: &Mock, request: &MockRequest) -> NearMiss {
    let matcher = &mock.matcher;
    let mut fields_out: Vec<FieldResult> = Vec::new();
    let both_paths = matcher.path.is_some() && matcher.path_pattern.is_some();

    if let Some(expected) = &matcher.method {
        let matched = fields::match_method(expected, &request.method);
        fields_out.push(FieldResult {
            field: "method".into(),
            matched,
            score: if matched { score::METHOD } else { 0 },
            max_score: score::METHOD,
            expected: expected.clone(),
            actual: request.method.clone(),
            details: None,
        });
    }

    if let Some(pattern) = &matcher.path {
        let result = (!both_paths).then(|| path::match_path(pattern, &request.path)).flatten();
        fields_out.push(FieldResult {
            field: "path".into(),
            matched: result.is_some(),
            score: result.map_or(0, |m| m.score),
            max_score: path::max_path_score(pattern),
            expected: pattern.clone(),
            actual: request.path.clone(),
            details: both_paths.then(|| "path and pathPattern are mutually exclusive".to_string()),
        });
    }

    if let Some(pattern) = &matcher.path_pattern {
        let result = (!both_paths)
            .then(|| path::match_path_pattern(pattern, &request.path))
            .flatten();
        fields_out.push(FieldResult {
            field: "pathPattern".into(),
            matched: result.is_some(),
            score: result.map_or(0, |m| m.score),
            max_score: score::PATH_PATTERN,
            expected: pattern.clone(),
            actual: request.path.clone(),
            details: both_paths.then(|| "path and pathPattern are mutually exclusive".to_string()),
        });
    }

    for (name, expected) in &matcher.headers {
        let actual = fields::header_value(&request.headers, name);
        let matched = actual.is_some_and(|a| fields::match_header_value(expected, a));
        fields_out.push(FieldResult {
            field: format!("header {name}"),
            matched,
            score: if matched { score::HEADER } else { 0 },
            max_score: score::HEADER,
            expected: expected.clone(),
            actual: actual.unwrap_or("(absent)").to_string(),
            details: None,
        });
    }

    for (name, expected) in &matcher.query_params {
        let actual = fields::query_value(&request.query, name);
        let matched = actual == Some(expected.as_str());
        fields_out.push(FieldResult {
            field: format!("query {name}"),
            matched,
            score: if matched { score::QUERY_PARAM } else { 0 },
            max_score: score::QUERY_PARAM,
            expected: expected.clone(),
            actual: actual.unwrap_or("(absent)").to_string(),
            details: None,
        });
    }

    if body::has_plain_criteria(matcher) {
        let earned = body::match_body(matcher, &request.body);
        fields_out.push(FieldResult {
            field: "body".into(),
            matched: earned.is_some(),
            score: earned.unwrap_or(0),
            max_score: body::max_body_score(matcher),
            expected: describe_body_criteria(matcher),
            actual: body_snippet(&request.body),
            details: None,
        });
    }

    if !matcher.body_json_path.is_empty() {
        let (matched_count, total) = jsonpath::condition_tally(&matcher.body_json_path, &request.body);
        let matched = matched_count == total;
        fields_out.push(FieldResult {
            field: "bodyJsonPath".into(),
            matched,
            score: matched_count * score::JSON_PATH_CONDITION,
            max_score: total * score::JSON_PATH_CONDITION,
            expected: matcher
                .body_json_path
                .keys()
                .cloned()
                .collect::<Vec<_>>()
                .join(", "),
            actual: format!("{matched_count} of {total} conditions satisfied"),
            details: None,
        });
    }

    if let Some(criteria) = &matcher.mtls {
        if !criteria.is_empty() {
            let earned = mtls::match_mtls(criteria, request.identity.as_ref());
            fields_out.push(FieldResult {
                field: "mtls".into(),
                matched: earned.is_some(),
                score: earned.unwrap_or(0),
                max_score: mtls::max_mtls_score(criteria),
                expected: describe_mtls_criteria(criteria),
                actual: describe_identity(request.identity.as_ref()),
                details: None,
            });
        }
    }

    let total: u32 = fields_out.iter().filter(|f| f.matched).map(|f| f.score).sum();
    let max_possible: u32 = fields_out.iter().map(|f| f.max_score).sum();
    let percentage = if max_possible > 0 {
        total * 100 / max_possible
    } else {
        0
    };

    NearMiss {
        mock_id: mock.id.clone(),
        score: total,
        max_possible_score: max_possible,
        match_percentage: percentage,
        reason: build_reason(&fields_out),
        fields: fields_out,
    }
}

fn build_reason(fields: &[FieldResult]) -> String {
    let matched: Vec<&str> = fields.iter().filter(|f| f.matched).map(|f| f.field.as_str()).collect();
    let failed: Vec<&FieldResult> = fields.iter().filter(|f| !f.matched).collect();

    if failed.is_empty() {
        return "all criteria matched".into();
    }

    let first = failed[0];
    let failure = format!(
        "{} expected {}, got {}",
        first.field, first.expected, first.actual
    );

    if matched.is_empty() {
        failure
    } else {
        format!("{} matched, but {}", matched.join(" and "), failure)
    }
}

fn describe_body_criteria(matcher: &mockd_core::HttpMatcher) -> String {
    let mut parts = Vec::new();
    if matcher.body_equals.is_some() {
        parts.push("equals");
    }
    if matcher.body_contains.is_some() {
        parts.push("contains");
    }
    if matcher.body_pattern.is_some() {
        parts.push("pattern");
    }
    parts.join("+")
}

fn describe_mtls_criteria(criteria: &MtlsMatcher) -> String {
    let mut parts = Vec::new();
    if criteria.fingerprint.is_some() {
        parts.push("fingerprint");
    }
    if criteria.common_name.is_some() {
        parts.push("commonName");
    }
    if criteria.common_name_pattern.is_some() {
        parts.push("commonNamePattern");
    }
    if criteria.organizational_unit.is_some() {
        parts.push("organizationalUnit");
    }
    if criteria.organization.is_some() {
        parts.push("organization");
    }
    if criteria.issuer_common_name.is_some() {
        parts.push("issuerCommonName");
    }
    if criteria.san_dns.is_some() {
        parts.push("sanDns");
    }
    if criteria.san_email.is_some() {
        parts.push("sanEmail");
    }
    if criteria.san_ip.is_some() {
        parts.push("sanIp");
    }
    if criteria.require_client_auth {
        parts.push("requireClientAuth");
    }
    parts.join(", ")
}

fn describe_identity(identity: Option<&ClientIdentity>) -> String {
    match identity {
        None => "no client certificate".into(),
        Some(id) => format!("CN={} fingerprint={}", id.common_name, id.fingerprint),
    }
}

fn body_snippet(body: &[u8]) -> String {
    const LIMIT: usize = 120;
    match std::str::from_utf8(body) {
        Ok(text) if text.len() <= LIMIT => text.to_string(),
        Ok(text) => {
            let mut end = LIMIT;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}…", &text[..end])
        }
        Err(_) => format!("({} bytes of binary data)", body.len()),
    }
}

#[cfg(test)]
mod tests {
    use mockd_core::HttpMatcher;
    use pretty_assertions::assert_eq;

    use super::*;

    fn mock(id: &str, method: &str, path: &str) -> Mock {
        Mock::http(
            id,
            HttpMatcher {
                method: Some(method.into()),
                path: Some(path.into()),
                ..Default::default()
            },
        )
    }

    #[test]
    fn near_misses_rank_by_score() {
        let m1 = mock("m1", "POST", "/api/users");
        let m2 = mock("m2", "GET", "/api/other");
        let request = MockRequest::new("POST", "/api/other");

        let misses = analyze_near_misses([&m1, &m2].into_iter(), &request, DEFAULT_TOP_N);
        assert_eq!(misses.len(), 2);
        // m2: path matched (15), method failed; m1: method matched (10), path failed
        assert_eq!(misses[0].mock_id, "m2");
        assert_eq!(misses[0].score, 15);
        assert_eq!(misses[1].mock_id, "m1");
        assert_eq!(misses[1].score, 10);
    }

    #[test]
    fn reason_names_matched_then_failed_fields() {
        let candidate = Mock::http(
            "m",
            HttpMatcher {
                method: Some("GET".into()),
                path: Some("/api/users".into()),
                headers: [("X-Tenant".to_string(), "acme".to_string())]
                    .into_iter()
                    .collect(),
                ..Default::default()
            },
        );
        let request = MockRequest::new("GET", "/api/users").with_header("X-Tenant", "globex");

        let misses = analyze_near_misses(std::iter::once(&candidate), &request, 3);
        assert_eq!(
            misses[0].reason,
            "method and path matched, but header X-Tenant expected acme, got globex"
        );
    }

    #[test]
    fn percentage_is_floored() {
        let m1 = mock("m1", "POST", "/api/users");
        let request = MockRequest::new("POST", "/api/other");
        let misses = analyze_near_misses(std::iter::once(&m1), &request, 3);
        // 10 of 25 => 40%
        assert_eq!(misses[0].match_percentage, 40);
        assert_eq!(misses[0].max_possible_score, 25);
    }

    #[test]
    fn zero_scores_are_dropped() {
        let m = mock("m", "DELETE", "/nope");
        let request = MockRequest::new("GET", "/api");
        assert!(analyze_near_misses(std::iter::once(&m), &request, 3).is_empty());
    }

    #[test]
    fn missing_certificate_reports_consistent_text() {
        let candidate = Mock::http(
            "m",
            HttpMatcher {
                method: Some("GET".into()),
                mtls: Some(MtlsMatcher {
                    common_name: Some("client".into()),
                    require_client_auth: true,
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        let request = MockRequest::new("GET", "/");
        let misses = analyze_near_misses(std::iter::once(&candidate), &request, 3);
        let mtls_field = misses[0].fields.iter().find(|f| f.field == "mtls").unwrap();
        assert_eq!(mtls_field.actual, "no client certificate");
        assert_eq!(mtls_field.expected, "commonName, requireClientAuth");
        assert!(!mtls_field.matched);
    }

    #[test]
    fn json_path_tally_is_partial() {
        let candidate = Mock::http(
            "m",
            HttpMatcher {
                method: Some("POST".into()),
                body_json_path: [
                    ("$.a".to_string(), mockd_core::JsonPathExpectation::literal(1)),
                    ("$.b".to_string(), mockd_core::JsonPathExpectation::literal(2)),
                ]
                .into_iter()
                .collect(),
                ..Default::default()
            },
        );
        let request = MockRequest::new("POST", "/").with_body(&br#"{"a":1,"b":999}"#[..]);
        let misses = analyze_near_misses(std::iter::once(&candidate), &request, 3);
        let field = misses[0].fields.iter().find(|f| f.field == "bodyJsonPath").unwrap();
        assert!(!field.matched);
        assert_eq!(field.score, score::JSON_PATH_CONDITION);
        assert_eq!(field.max_score, 2 * score::JSON_PATH_CONDITION);
        // unmatched dimension score is excluded from the total
        assert_eq!(misses[0].score, score::METHOD);
    }
}
