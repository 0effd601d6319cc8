//! Method, header, and query-parameter matching.

/// Case-insensitive ASCII method comparison.
pub(crate) fn match_method(expected: &str, actual: &str) -> bool {
    expected.eq_ignore_ascii_case(actual)
}

/// Match one header value against an expected value or pattern.
///
/// Patterns support `*suffix`, `prefix*`, and `*middle*`; anything else is
/// an exact comparison.
pub(crate) fn match_header_value(expected: &str, actual: &str) -> bool {
    if let Some(middle) = expected
        .strip_prefix('*')
        .and_then(|rest| rest.strip_suffix('*'))
    {
        actual.contains(middle)
    } else if let Some(suffix) = expected.strip_prefix('*') {
        actual.ends_with(suffix)
    } else if let Some(prefix) = expected.strip_suffix('*') {
        actual.starts_with(prefix)
    } else {
        expected == actual
    }
}

/// Case-insensitive header lookup over a borrowed name/value list.
pub(crate) fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Exact query-parameter lookup; first occurrence wins.
pub(crate) fn query_value<'a>(query: &'a [(String, String)], name: &str) -> Option<&'a str> {
    query
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_matching_ignores_case() {
        assert!(match_method("get", "GET"));
        assert!(match_method("POST", "post"));
        assert!(!match_method("GET", "POST"));
    }

    #[test]
    fn header_patterns() {
        assert!(match_header_value("application/json", "application/json"));
        assert!(match_header_value("*json", "application/json"));
        assert!(match_header_value("application/*", "application/json"));
        assert!(match_header_value("*cation*", "application/json"));
        assert!(!match_header_value("*xml", "application/json"));
        assert!(!match_header_value("text/*", "application/json"));
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        assert_eq!(header_value(&headers, "content-type"), Some("application/json"));
        assert_eq!(header_value(&headers, "CONTENT-TYPE"), Some("application/json"));
        assert_eq!(header_value(&headers, "accept"), None);
    }

    #[test]
    fn query_lookup_is_exact_and_first_wins() {
        let query = vec![
            ("page".to_string(), "1".to_string()),
            ("page".to_string(), "2".to_string()),
        ];
        assert_eq!(query_value(&query, "page"), Some("1"));
        assert_eq!(query_value(&query, "Page"), None);
    }
}
