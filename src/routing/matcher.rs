//! Path pattern matching.
//!
//! # Responsibilities
//! - Compile a route's path regex once, at startup
//! - Search a request path (unanchored) and extract named captures
//!
//! # Design Decisions
//! - Captures are returned in pattern-declaration order
//! - A named group that did not participate yields an empty value
//! - A pattern without named groups still matches, with no captures

use regex::Regex;

/// Ordered `(name, value)` pairs extracted from a named-group match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures(Vec<(String, String)>);

impl Captures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Value of the first capture with this name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Captures {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(n, v)| (n.into(), v.into())).collect())
    }
}

/// A compiled path pattern.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    regex: Regex,
    names: Vec<String>,
}

impl PathMatcher {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(pattern)?;
        let names = regex.capture_names().flatten().map(String::from).collect();
        Ok(Self { regex, names })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Named capture group names, in declaration order.
    pub fn capture_names(&self) -> &[String] {
        &self.names
    }

    /// Search `path`; on a match return its named captures.
    pub fn captures(&self, path: &str) -> Option<Captures> {
        let found = self.regex.captures(path)?;
        Some(
            self.names
                .iter()
                .map(|name| {
                    let value = found.name(name).map_or("", |m| m.as_str());
                    (name.as_str(), value)
                })
                .collect(),
        )
    }
}
