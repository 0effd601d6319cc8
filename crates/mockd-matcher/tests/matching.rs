//! End-to-end matching scenarios and property tests.

use mockd_core::{HttpMatcher, JsonPathExpectation, Mock, MtlsMatcher, normalize_fingerprint};
use mockd_matcher::{MockRequest, analyze_near_misses, match_score, select_best};
use proptest::prelude::*;

fn http_mock(id: &str, matcher: HttpMatcher) -> Mock {
    Mock::http(id, matcher)
}

#[test]
fn exact_http_match_wins_over_wildcard() {
    let exact = http_mock(
        "a",
        HttpMatcher {
            method: Some("GET".into()),
            path: Some("/api/users".into()),
            ..Default::default()
        },
    );
    let wildcard = http_mock(
        "b",
        HttpMatcher {
            method: Some("GET".into()),
            path: Some("/api/*".into()),
            ..Default::default()
        },
    );

    let request = MockRequest::new("GET", "/api/users");
    let (winner, result) = select_best([&exact, &wildcard].into_iter(), &request).unwrap();
    assert_eq!(winner.id, "a");
    assert_eq!(result.score, 25);
    assert_eq!(match_score(&wildcard.matcher, &request).score, 20);
}

#[test]
fn body_regex_and_json_path_are_anded() {
    let matcher = HttpMatcher {
        body_pattern: Some(r#""email":\s*"[^"]+""#.into()),
        body_json_path: [("$.status".to_string(), JsonPathExpectation::literal("active"))]
            .into_iter()
            .collect(),
        ..Default::default()
    };

    let ok = MockRequest::new("POST", "/x")
        .with_body(&br#"{"email":"a@b","status":"active"}"#[..]);
    assert_eq!(match_score(&matcher, &ok).score, 37);

    let bad = MockRequest::new("POST", "/x")
        .with_body(&br#"{"email":"a@b","status":"inactive"}"#[..]);
    assert_eq!(match_score(&matcher, &bad).score, 0);
}

#[test]
fn near_miss_ordering_scenario() {
    let m1 = http_mock(
        "m1",
        HttpMatcher {
            method: Some("POST".into()),
            path: Some("/api/users".into()),
            ..Default::default()
        },
    );
    let m2 = http_mock(
        "m2",
        HttpMatcher {
            method: Some("GET".into()),
            path: Some("/api/other".into()),
            ..Default::default()
        },
    );

    // the happy path still selects m1 outright
    let ok = MockRequest::new("POST", "/api/users");
    assert_eq!(select_best([&m1, &m2].into_iter(), &ok).unwrap().0.id, "m1");

    // against POST /api/other nothing matches; m2 (path, 15) ranks above m1 (method, 10)
    let miss = MockRequest::new("POST", "/api/other");
    assert!(select_best([&m1, &m2].into_iter(), &miss).is_none());
    let misses = analyze_near_misses([&m1, &m2].into_iter(), &miss, 3);
    assert_eq!(misses[0].mock_id, "m2");
    assert_eq!(misses[0].score, 15);
    assert_eq!(misses[1].mock_id, "m1");
    assert_eq!(misses[1].score, 10);
}

#[test]
fn fingerprint_matches_across_formats_scenario() {
    let fingerprint = "ab".repeat(32);
    let identity = mockd_core::ClientIdentity {
        fingerprint: fingerprint.clone(),
        verified: true,
        ..Default::default()
    };

    let colon_form = fingerprint
        .as_bytes()
        .chunks(2)
        .map(|c| std::str::from_utf8(c).unwrap().to_uppercase())
        .collect::<Vec<_>>()
        .join(":");

    for accepted in [format!("sha256:{colon_form}"), fingerprint.to_uppercase()] {
        let matcher = HttpMatcher {
            mtls: Some(MtlsMatcher {
                fingerprint: Some(accepted),
                ..Default::default()
            }),
            ..Default::default()
        };
        let request = MockRequest::new("GET", "/").with_identity(identity.clone());
        assert_eq!(match_score(&matcher, &request).score, 50);
    }

    let rejected = HttpMatcher {
        mtls: Some(MtlsMatcher {
            fingerprint: Some("00".repeat(32)),
            ..Default::default()
        }),
        ..Default::default()
    };
    let request = MockRequest::new("GET", "/").with_identity(identity);
    assert_eq!(match_score(&rejected, &request).score, 0);
}

proptest! {
    /// Adding one more satisfied criterion strictly increases the score.
    #[test]
    fn score_is_monotonic_in_satisfied_criteria(
        path in "/[a-z]{1,8}/[a-z]{1,8}",
        header in "[A-Za-z0-9-]{1,12}",
        value in "[a-z0-9]{1,12}",
    ) {
        let base = HttpMatcher {
            path: Some(path.clone()),
            ..Default::default()
        };
        let extended = HttpMatcher {
            path: Some(path.clone()),
            headers: [(header.clone(), value.clone())].into_iter().collect(),
            ..Default::default()
        };

        let request = MockRequest::new("GET", &path).with_header(&header, &value);
        let base_score = match_score(&base, &request).score;
        let extended_score = match_score(&extended, &request).score;
        prop_assert!(extended_score > base_score);
    }

    /// Scoring is a pure function of its inputs.
    #[test]
    fn scoring_is_deterministic(
        method in "(GET|POST|PUT|DELETE)",
        path in "/[a-z]{1,10}",
        body in "[ -~]{0,40}",
    ) {
        let matcher = HttpMatcher {
            method: Some(method.clone()),
            path: Some(path.clone()),
            body_contains: (!body.is_empty()).then(|| body.clone()),
            ..Default::default()
        };
        let request = MockRequest::new(&method, &path).with_body(body.into_bytes());

        let first = match_score(&matcher, &request);
        let second = match_score(&matcher, &request);
        prop_assert_eq!(first, second);
    }

    /// Named regex captures round-trip the substring they matched.
    #[test]
    fn regex_captures_round_trip(id in "[0-9]{1,8}", name in "[a-z]{1,8}") {
        let matcher = HttpMatcher {
            path_pattern: Some(r"^/api/(?P<name>[a-z]+)/(?P<id>[0-9]+)$".into()),
            ..Default::default()
        };
        let request = MockRequest::new("GET", format!("/api/{name}/{id}"));
        let result = match_score(&matcher, &request);
        prop_assert!(result.matched);
        prop_assert_eq!(&result.path_captures["name"], &name);
        prop_assert_eq!(&result.path_captures["id"], &id);
    }

    /// Fingerprint normalization is idempotent.
    #[test]
    fn fingerprint_normalization_idempotent(raw in "(sha256:)?[0-9a-fA-F:]{0,80}") {
        let once = normalize_fingerprint(&raw);
        prop_assert_eq!(normalize_fingerprint(&once), once.clone());
    }

    /// A matcher carrying both path forms never matches anything.
    #[test]
    fn path_forms_are_mutually_exclusive(path in "/[a-z]{1,10}") {
        let matcher = HttpMatcher {
            path: Some(path.clone()),
            path_pattern: Some(format!("^{path}$")),
            ..Default::default()
        };
        let request = MockRequest::new("GET", &path);
        prop_assert_eq!(match_score(&matcher, &request).score, 0);
    }
}
