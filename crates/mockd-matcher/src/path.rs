//! Path matching: exact, `{name}` templates, wildcards, and regex patterns.

use std::collections::HashMap;

use regex::Regex;

use crate::score;

/// Outcome of a successful path match.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct PathMatch {
    pub score: u32,
    pub captures: HashMap<String, String>,
}

/// Match a literal/template/wildcard path pattern against a request path.
///
/// Attempts, in order of specificity:
/// 1. exact string equality
/// 2. `{name}` segment templates (equal segment count, named captures)
/// 3. trailing `/*` prefix wildcard (remaining segments captured by ordinal)
/// 4. generic `*` glob anywhere in the pattern
pub(crate) fn match_path(pattern: &str, path: &str) -> Option<PathMatch> {
    if pattern == path {
        return Some(PathMatch {
            score: score::PATH_EXACT,
            captures: HashMap::new(),
        });
    }

    if pattern.contains('{')
        && let Some(m) = match_named_params(pattern, path)
    {
        return Some(m);
    }

    if let Some(prefix) = pattern.strip_suffix("/*")
        && let Some(m) = match_trailing_wildcard(prefix, path)
    {
        return Some(m);
    }

    if pattern.contains('*') && glob_match(pattern, path) {
        return Some(PathMatch {
            score: score::PATH_WILDCARD,
            captures: HashMap::new(),
        });
    }

    None
}

/// Match a regex path pattern, extracting named capture groups.
///
/// An invalid pattern never raises; it simply does not match.
pub(crate) fn match_path_pattern(pattern: &str, path: &str) -> Option<PathMatch> {
    let re = Regex::new(pattern).ok()?;
    let caps = re.captures(path)?;

    let mut captures = HashMap::new();
    for name in re.capture_names().flatten() {
        if let Some(m) = caps.name(name) {
            captures.insert(name.to_string(), m.as_str().to_string());
        }
    }
    Some(PathMatch {
        score: score::PATH_PATTERN,
        captures,
    })
}

/// The maximum score a path literal can reach, for near-miss reporting.
///
/// A pattern containing `{` reports the named-params ceiling even when it
/// also contains `*`.
pub(crate) fn max_path_score(pattern: &str) -> u32 {
    if pattern.contains('{') {
        score::PATH_NAMED_PARAMS
    } else if pattern.contains('*') {
        score::PATH_WILDCARD
    } else {
        score::PATH_EXACT
    }
}

fn match_named_params(pattern: &str, path: &str) -> Option<PathMatch> {
    let pattern_segments = split_segments(pattern);
    let path_segments = split_segments(path);
    if pattern_segments.len() != path_segments.len() {
        return None;
    }

    let mut captures = HashMap::new();
    for (expected, actual) in pattern_segments.iter().zip(&path_segments) {
        if let Some(name) = expected
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
        {
            captures.insert(name.to_string(), (*actual).to_string());
        } else if expected != actual {
            return None;
        }
    }
    Some(PathMatch {
        score: score::PATH_NAMED_PARAMS,
        captures,
    })
}

fn match_trailing_wildcard(prefix: &str, path: &str) -> Option<PathMatch> {
    let remainder = if path == prefix {
        ""
    } else {
        path.strip_prefix(prefix)?.strip_prefix('/')?
    };

    let mut captures = HashMap::new();
    for (i, segment) in remainder.split('/').filter(|s| !s.is_empty()).enumerate() {
        captures.insert(i.to_string(), segment.to_string());
    }
    Some(PathMatch {
        score: score::PATH_WILDCARD,
        captures,
    })
}

/// Segment-agnostic `*` walk: each literal chunk must appear in order, the
/// first chunk anchored at the start and the last at the end.
fn glob_match(pattern: &str, text: &str) -> bool {
    let chunks: Vec<&str> = pattern.split('*').collect();
    let mut rest = text;

    for (i, chunk) in chunks.iter().enumerate() {
        if chunk.is_empty() {
            continue;
        }
        if i == 0 {
            rest = match rest.strip_prefix(chunk) {
                Some(r) => r,
                None => return false,
            };
        } else if i == chunks.len() - 1 {
            return rest.ends_with(chunk);
        } else {
            match rest.find(chunk) {
                Some(idx) => rest = &rest[idx + chunk.len()..],
                None => return false,
            }
        }
    }

    // Pattern ended with `*` (or consumed everything exactly).
    pattern.ends_with('*') || rest.is_empty()
}

fn split_segments(s: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = s.split('/').collect();
    while segments.first() == Some(&"") {
        segments.remove(0);
    }
    while segments.last() == Some(&"") {
        segments.pop();
    }
    segments
}
