//! JSONPath condition matching over JSON request bodies.

use std::collections::{BTreeMap, HashMap};

use jsonpath_rust::JsonPathQuery;
use mockd_core::JsonPathExpectation;
use serde_json::Value;

use crate::score;

/// Outcome of a fully-satisfied JSONPath condition group.
#[derive(Debug, Clone, Default)]
pub(crate) struct JsonPathOutcome {
    pub score: u32,
    pub captures: HashMap<String, Value>,
}

/// Evaluate every JSONPath condition against the body.
///
/// All conditions must succeed or the whole group fails. A body that does
/// not parse as JSON fails the group without error, as does an invalid
/// path expression.
pub(crate) fn match_json_path(
    conditions: &BTreeMap<String, JsonPathExpectation>,
    body: &[u8],
) -> Option<JsonPathOutcome> {
    if conditions.is_empty() {
        return Some(JsonPathOutcome::default());
    }

    let document: Value = serde_json::from_slice(body).ok()?;

    let mut matched = 0u32;
    let mut captures = HashMap::new();

    for (path, expectation) in conditions {
        let found = evaluate(&document, path)?;

        match expectation {
            JsonPathExpectation::Exists { exists: false } => {
                if !found.is_empty() {
                    return None;
                }
            }
            JsonPathExpectation::Exists { exists: true } => {
                let first = found.first()?.clone();
                captures.insert(sanitize_capture_key(path), first);
            }
            JsonPathExpectation::Literal(expected) => {
                let hit = found.iter().find(|node| json_equal(node, expected))?;
                captures.insert(sanitize_capture_key(path), hit.clone());
            }
        }
        matched += 1;
    }

    Some(JsonPathOutcome {
        score: score::JSON_PATH_CONDITION * matched,
        captures,
    })
}

/// Count satisfied conditions independently, for near-miss breakdowns.
///
/// Unlike [`match_json_path`] this never short-circuits: every condition is
/// evaluated even after a failure.
pub(crate) fn condition_tally(
    conditions: &BTreeMap<String, JsonPathExpectation>,
    body: &[u8],
) -> (u32, u32) {
    let total = conditions.len() as u32;
    let Ok(document) = serde_json::from_slice::<Value>(body) else {
        return (0, total);
    };

    let mut matched = 0;
    for (path, expectation) in conditions {
        let Some(found) = evaluate(&document, path) else {
            continue;
        };
        let ok = match expectation {
            JsonPathExpectation::Exists { exists } => *exists == !found.is_empty(),
            JsonPathExpectation::Literal(expected) => {
                found.iter().any(|node| json_equal(node, expected))
            }
        };
        if ok {
            matched += 1;
        }
    }
    (matched, total)
}

/// Run one path expression; `None` means the expression itself is invalid.
fn evaluate(document: &Value, path: &str) -> Option<Vec<Value>> {
    match document.clone().path(path) {
        Ok(Value::Array(items)) => Some(items),
        // Some engine versions report "nothing found" as a bare null.
        Ok(Value::Null) => Some(Vec::new()),
        Ok(other) => Some(vec![other]),
        Err(_) => None,
    }
}

/// JSON-aware equality: numbers compare numerically across integer and
/// float representations; strings, booleans, and nulls compare strictly;
/// arrays and objects recurse.
pub(crate) fn json_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => match (l.as_f64(), r.as_f64()) {
            (Some(lf), Some(rf)) => lf == rf,
            _ => l == r,
        },
        (Value::Array(l), Value::Array(r)) => {
            l.len() == r.len() && l.iter().zip(r).all(|(a, b)| json_equal(a, b))
        }
        (Value::Object(l), Value::Object(r)) => {
            l.len() == r.len()
                && l.iter()
                    .all(|(k, lv)| r.get(k).is_some_and(|rv| json_equal(lv, rv)))
        }
        _ => left == right,
    }
}

/// Collapse JSONPath syntax characters into `_` to form a capture key.
pub(crate) fn sanitize_capture_key(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut last_was_sep = false;
    for c in path.chars() {
        if matches!(c, '$' | '.' | '[' | ']' | '*' | '@' | '?' | '(' | ')' | ',' | ' ') {
            if !last_was_sep {
                out.push('_');
                last_was_sep = true;
            }
        } else {
            out.push(c);
            last_was_sep = false;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use mockd_core::JsonPathExpectation;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn conditions(
        entries: &[(&str, JsonPathExpectation)],
    ) -> BTreeMap<String, JsonPathExpectation> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn literal_condition_matches_and_captures() {
        let conds = conditions(&[("$.status", JsonPathExpectation::literal("active"))]);
        let outcome = match_json_path(&conds, br#"{"status":"active"}"#).unwrap();
        assert_eq!(outcome.score, score::JSON_PATH_CONDITION);
        assert_eq!(outcome.captures["_status"], json!("active"));
    }

    #[test]
    fn literal_mismatch_fails_the_group() {
        let conds = conditions(&[
            ("$.status", JsonPathExpectation::literal("active")),
            ("$.email", JsonPathExpectation::exists(true)),
        ]);
        assert!(match_json_path(&conds, br#"{"status":"inactive","email":"a@b"}"#).is_none());
    }

    #[test]
    fn exists_semantics() {
        let present = conditions(&[("$.token", JsonPathExpectation::exists(true))]);
        let absent = conditions(&[("$.token", JsonPathExpectation::exists(false))]);

        assert!(match_json_path(&present, br#"{"token":"t"}"#).is_some());
        assert!(match_json_path(&present, br#"{}"#).is_none());
        assert!(match_json_path(&absent, br#"{}"#).is_some());
        assert!(match_json_path(&absent, br#"{"token":"t"}"#).is_none());
    }

    #[test]
    fn non_json_body_fails_silently() {
        let conds = conditions(&[("$.a", JsonPathExpectation::exists(true))]);
        assert!(match_json_path(&conds, b"not json").is_none());
    }

    #[test]
    fn numbers_compare_numerically() {
        assert!(json_equal(&json!(1), &json!(1.0)));
        assert!(json_equal(&json!(2.5), &json!(2.5)));
        assert!(!json_equal(&json!(1), &json!(2)));
        assert!(!json_equal(&json!("1"), &json!(1)));
    }

    #[test]
    fn score_multiplies_per_condition() {
        let conds = conditions(&[
            ("$.a", JsonPathExpectation::literal(1)),
            ("$.b", JsonPathExpectation::literal(2)),
        ]);
        let outcome = match_json_path(&conds, br#"{"a":1,"b":2}"#).unwrap();
        assert_eq!(outcome.score, 2 * score::JSON_PATH_CONDITION);
    }

    #[test]
    fn capture_keys_are_sanitized() {
        assert_eq!(sanitize_capture_key("$.user.name"), "_user_name");
        assert_eq!(sanitize_capture_key("$.items[0].id"), "_items_0_id");
        assert_eq!(sanitize_capture_key("$..book[?(@.price)]"), "_book_price");
    }
}
