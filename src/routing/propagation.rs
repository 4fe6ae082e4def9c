//! Query-string encoding of path captures.
//!
//! Captures normally travel with the `MatchResult`. This module provides the
//! query-channel encoding (reserved `__capture_` keys) and, more importantly,
//! `strip`, which the rewriter runs last so no reserved key is ever forwarded.

use url::form_urlencoded;

use crate::routing::Captures;

/// Prefix reserved for synthetic capture parameters.
pub const CAPTURE_PREFIX: &str = "__capture_";

fn is_reserved(key: &str) -> bool {
    key.starts_with(CAPTURE_PREFIX)
}

fn encode<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Merge one reserved key per capture into `query`.
///
/// A reserved key already present under the same name is replaced.
///
/// The dispatcher hands captures to the director inside `MatchResult`, so it
/// never calls this; only `strip` runs per request. `inject` and `extract`
/// serve callers that can carry match state in nothing but the URL, such as
/// a second proxy hop re-routing on captures taken by the first.
pub fn inject(query: Option<&str>, captures: &Captures) -> String {
    let reserved: Vec<(String, &str)> = captures
        .iter()
        .map(|(name, value)| (format!("{CAPTURE_PREFIX}{name}"), value))
        .collect();

    let original: Vec<(String, String)> = query
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();

    let kept = original
        .iter()
        .filter(|(key, _)| !reserved.iter().any(|(r, _)| r == key))
        .map(|(key, value)| (key.as_str(), value.as_str()));
    let added = reserved.iter().map(|(key, value)| (key.as_str(), *value));

    encode(kept.chain(added))
}

/// Read reserved keys back into captures, in query order.
///
/// Counterpart of `inject`; not on the dispatch path for the same reason.
pub fn extract(query: Option<&str>) -> Captures {
    let Some(query) = query else {
        return Captures::new();
    };
    form_urlencoded::parse(query.as_bytes())
        .filter_map(|(key, value)| {
            key.strip_prefix(CAPTURE_PREFIX)
                .map(|name| (name.to_string(), value.into_owned()))
        })
        .collect()
}

/// Remove every reserved key from `query`.
///
/// A query without reserved keys is returned untouched; a query left empty
/// after stripping becomes `None`.
pub fn strip(query: Option<&str>) -> Option<String> {
    let query = query?;
    let pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();

    if !pairs.iter().any(|(key, _)| is_reserved(key)) {
        return Some(query.to_string()).filter(|q| !q.is_empty());
    }

    let kept: Vec<_> = pairs
        .iter()
        .filter(|(key, _)| !is_reserved(key))
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();

    if kept.is_empty() {
        None
    } else {
        Some(encode(kept))
    }
}
