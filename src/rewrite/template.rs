//! Path template resolution.
//!
//! Two substitution sources exist:
//! - path captures from the route match (`PathTemplate::resolve`)
//! - groups of a query-override regex match (`expand_matches`)

use regex::Regex;

use crate::routing::Captures;

const MARKER: char = '$';

/// A target path, possibly containing `$name` / `${name}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate(String);

impl PathTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// Build from optional config, treating an empty string as unset.
    pub fn from_config(template: Option<&str>) -> Option<Self> {
        template.filter(|t| !t.is_empty()).map(Self::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_interpolated(&self) -> bool {
        self.0.contains(MARKER)
    }

    /// Resolve placeholders against path captures.
    ///
    /// Templates without the marker are returned verbatim. Substitution is a
    /// single left-to-right pass, so a substituted value is never scanned for
    /// further placeholders. `$name` binds to the longest capture name that
    /// follows the marker; unknown placeholders are kept as written.
    pub fn resolve(&self, captures: &Captures) -> String {
        if !self.is_interpolated() {
            return self.0.clone();
        }

        let mut names: Vec<&str> = captures.iter().map(|(name, _)| name).collect();
        names.sort_by_key(|name| std::cmp::Reverse(name.len()));

        let mut out = String::with_capacity(self.0.len());
        let mut rest = self.0.as_str();
        while let Some(pos) = rest.find(MARKER) {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            match placeholder(after, &names, captures) {
                Some((value, consumed)) => {
                    out.push_str(value);
                    rest = &after[consumed..];
                }
                None => {
                    out.push(MARKER);
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// Resolve the placeholder that starts right after a `$`, returning the
/// substituted value and how many bytes of `after` it consumed.
fn placeholder<'c>(
    after: &str,
    names: &[&str],
    captures: &'c Captures,
) -> Option<(&'c str, usize)> {
    if let Some(braced) = after.strip_prefix('{') {
        let end = braced.find('}')?;
        let value = captures.get(&braced[..end])?;
        return Some((value, end + 2));
    }
    let name = names.iter().find(|name| after.starts_with(**name))?;
    Some((captures.get(name)?, name.len()))
}

/// Expand `template` once per non-overlapping match of `regex` in `haystack`
/// and concatenate the results. Group references follow the regex crate's
/// `$name`, `${name}` and `$1` syntax.
pub fn expand_matches(regex: &Regex, haystack: &str, template: &str) -> String {
    let mut out = String::new();
    for found in regex.captures_iter(haystack) {
        found.expand(template, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(pairs: &[(&str, &str)]) -> Captures {
        pairs.iter().copied().collect()
    }

    #[test]
    fn interpolates_named_capture() {
        let template = PathTemplate::new("/anything/newthing$cap");
        assert_eq!(template.resolve(&caps(&[("cap", "foobar")])), "/anything/newthingfoobar");
    }

    #[test]
    fn template_without_marker_is_verbatim() {
        let template = PathTemplate::new("/anything/beepboop");
        assert!(!template.is_interpolated());
        assert_eq!(template.resolve(&caps(&[("cap", "boop")])), "/anything/beepboop");
        assert_eq!(template.resolve(&Captures::new()), "/anything/beepboop");
    }

    #[test]
    fn replaces_every_occurrence() {
        let template = PathTemplate::new("/$id/copy/$id");
        assert_eq!(template.resolve(&caps(&[("id", "7")])), "/7/copy/7");
    }

    #[test]
    fn longest_name_wins() {
        let template = PathTemplate::new("/$capital/$cap");
        let resolved = template.resolve(&caps(&[("cap", "x"), ("capital", "paris")]));
        assert_eq!(resolved, "/paris/x");
    }

    #[test]
    fn braced_placeholder_allows_adjacent_text() {
        let template = PathTemplate::new("/v${version}beta");
        assert_eq!(template.resolve(&caps(&[("version", "2")])), "/v2beta");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let template = PathTemplate::new("/$a/$b");
        let resolved = template.resolve(&caps(&[("a", "$b"), ("b", "two")]));
        assert_eq!(resolved, "/$b/two");
    }

    #[test]
    fn unknown_placeholder_is_kept() {
        let template = PathTemplate::new("/price/$usd/${eur}");
        assert_eq!(template.resolve(&caps(&[("cap", "x")])), "/price/$usd/${eur}");
    }

    #[test]
    fn empty_config_template_is_unset() {
        assert_eq!(PathTemplate::from_config(Some("")), None);
        assert_eq!(PathTemplate::from_config(None), None);
        assert_eq!(
            PathTemplate::from_config(Some("/a")),
            Some(PathTemplate::new("/a"))
        );
    }

    #[test]
    fn expands_named_regex_group() {
        let regex = Regex::new(r"integralist(?P<cap>\d{1,3})$").unwrap();
        let path = expand_matches(&regex, "integralist123", "/anything/newthing$cap");
        assert_eq!(path, "/anything/newthing123");
    }

    #[test]
    fn expands_positional_groups_per_match() {
        let regex = Regex::new(r"(\d)").unwrap();
        assert_eq!(expand_matches(&regex, "a1b2", "/n$1"), "/n1/n2");
    }

    #[test]
    fn no_match_expands_to_empty() {
        let regex = Regex::new(r"\d").unwrap();
        assert_eq!(expand_matches(&regex, "abc", "/n$0"), "");
    }
}
