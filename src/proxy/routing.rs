//! Specificity-based route matching for the HTTP forwarder.
//!
//! [`match_route`] scores each configured route against the request
//! path and method: exact segments score highest, parameterized
//! segments (`:param`) lower, wildcard prefixes (`/prefix/*`) and the
//! catch-all (`/*`) lowest. The highest-scoring match wins and its
//! captured parameters are returned. [`strip_wildcard_prefix`] drops the
//! matched prefix for routes configured with `strip_prefix`.

use std::collections::HashMap;

use crate::config::model::Route;

type Params = HashMap<String, String>;

/// Pick the most specific route for `path` and `method`. Ties go to the
/// route declared first.
#[must_use]
pub fn match_route(routes: &[Route], path: &str, method: &str) -> Option<(usize, Params)> {
    let request = segments(path);

    routes
        .iter()
        .enumerate()
        .filter(|(_, route)| method_matches(&route.methods, method))
        .filter_map(|(idx, route)| score(&route.path, &request).map(|(s, params)| (s, idx, params)))
        .fold(None, |best: Option<(u32, usize, Params)>, candidate| {
            if best.as_ref().is_some_and(|b| b.0 >= candidate.0) {
                best
            } else {
                Some(candidate)
            }
        })
        .map(|(_, idx, params)| (idx, params))
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Specificity of `route_path` against the request segments: 10 per
/// literal segment, 5 per `:param`, 0 for the catch-all.
#[allow(clippy::cast_possible_truncation)]
fn score(route_path: &str, request: &[&str]) -> Option<(u32, Params)> {
    if route_path == "/*" || route_path == "*" {
        return Some((0, Params::new()));
    }

    if let Some(prefix) = route_path.strip_suffix("/*") {
        let prefix = segments(prefix);
        let covered = request.len() >= prefix.len()
            && prefix.iter().zip(request).all(|(r, q)| r == q);
        return covered.then(|| (prefix.len() as u32 * 10, Params::new()));
    }

    let pattern = segments(route_path);
    if pattern.len() != request.len() {
        return None;
    }

    let mut params = Params::new();
    let mut total = 0;
    for (expected, actual) in pattern.iter().zip(request) {
        if let Some(name) = expected.strip_prefix(':') {
            params.insert(name.to_string(), (*actual).to_string());
            total += 5;
        } else if expected == actual {
            total += 10;
        } else {
            return None;
        }
    }
    Some((total, params))
}

fn method_matches(methods: &[String], method: &str) -> bool {
    methods
        .iter()
        .any(|m| m == "*" || m.eq_ignore_ascii_case(method))
}

/// Remove the literal prefix of a `/prefix/*` route from `path`.
///
/// Returns `path` untouched when the route is not a wildcard prefix or
/// the prefix does not end on a segment boundary.
#[must_use]
pub fn strip_wildcard_prefix<'a>(route_path: &str, path: &'a str) -> &'a str {
    let Some(prefix) = route_path.strip_suffix('*') else {
        return path;
    };
    let prefix = prefix.trim_end_matches('/');
    match path.strip_prefix(prefix) {
        Some("") => "/",
        Some(rest) if rest.starts_with('/') => rest,
        _ => path,
    }
}

/// Substitute `:param` placeholders in an upstream URL template.
/// Sorts params by key length descending to prevent partial replacement
/// (e.g., `:userId` is replaced before `:user`).
#[must_use]
pub fn substitute_params(url_template: &str, params: &HashMap<String, String>) -> String {
    let mut result = url_template.to_string();
    let mut sorted_entries: Vec<(&str, &str)> = params
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    sorted_entries.sort_by_key(|(k, _)| std::cmp::Reverse(k.len()));

    for (key, value) in sorted_entries {
        result = result.replace(&format!(":{key}"), value);
    }
    result
}
