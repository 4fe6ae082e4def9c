//! Compiled override rules.
//!
//! An override is "active" when at least one of its conditions is fully
//! specified. Misconfigured parts (partial upstream, bad regex) degrade to
//! "never fires" instead of failing startup.

use std::sync::Arc;

use axum::http::HeaderMap;
use regex::Regex;

use crate::config::{MatchType, OverrideConfig};
use crate::rewrite::template::{expand_matches, PathTemplate};
use crate::routing::{Upstream, UpstreamRegistry};

/// Literal header equality condition.
#[derive(Debug, Clone)]
pub struct HeaderCondition {
    pub name: String,
    pub value: String,
}

impl HeaderCondition {
    /// Case-sensitive comparison of the first header value.
    pub fn matches(&self, headers: &HeaderMap) -> bool {
        headers
            .get(self.name.as_str())
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == self.value)
    }
}

/// How a query parameter value is compared.
#[derive(Debug, Clone)]
pub enum QueryMatch {
    Literal(String),
    Regex(Regex),
}

/// What a firing query condition does to the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    pub path: Option<String>,
}

impl QueryMatch {
    /// Compare `value`; when the condition fires, compute the new path.
    ///
    /// Literal matches use the template verbatim. Regex matches are
    /// unanchored and expand the template with the match's own groups.
    pub fn evaluate(&self, value: &str, template: Option<&PathTemplate>) -> Option<QueryOutcome> {
        match self {
            QueryMatch::Literal(expected) => (value == expected).then(|| QueryOutcome {
                path: template.map(|t| t.as_str().to_string()),
            }),
            QueryMatch::Regex(regex) => regex.is_match(value).then(|| QueryOutcome {
                path: template.map(|t| expand_matches(regex, value, t.as_str())),
            }),
        }
    }
}

/// Query parameter condition.
#[derive(Debug, Clone)]
pub struct QueryCondition {
    pub param: String,
    pub matcher: QueryMatch,
}

/// A compiled, active override.
#[derive(Debug, Clone)]
pub struct Override {
    pub header: Option<HeaderCondition>,
    pub query: Option<QueryCondition>,
    pub upstream: Option<Arc<Upstream>>,
    pub path_template: Option<PathTemplate>,
}

impl Override {
    /// Compile an override, returning `None` when no condition is usable.
    pub fn compile(route: &str, config: &OverrideConfig, registry: &UpstreamRegistry) -> Option<Self> {
        let header = config
            .header
            .as_ref()
            .filter(|h| !h.name.is_empty() && !h.value.is_empty())
            .map(|h| HeaderCondition {
                name: h.name.clone(),
                value: h.value.clone(),
            });

        let query = config
            .query
            .as_ref()
            .filter(|q| !q.param.is_empty() && !q.value.is_empty())
            .and_then(|q| {
                let matcher = match q.match_type {
                    MatchType::Literal => QueryMatch::Literal(q.value.clone()),
                    MatchType::Regex => match Regex::new(&q.value) {
                        Ok(regex) => QueryMatch::Regex(regex),
                        Err(e) => {
                            tracing::warn!(
                                route = %route,
                                pattern = %q.value,
                                error = %e,
                                "Query override regex does not compile; condition disabled"
                            );
                            return None;
                        }
                    },
                };
                Some(QueryCondition {
                    param: q.param.clone(),
                    matcher,
                })
            });

        if header.is_none() && query.is_none() {
            tracing::debug!(route = %route, "Override has no usable condition; ignoring it");
            return None;
        }

        Some(Self {
            header,
            query,
            upstream: config.upstream.as_deref().and_then(|name| registry.get(name)),
            path_template: PathTemplate::from_config(config.modify_path.as_deref()),
        })
    }

    /// The re-targeting upstream, if fully populated.
    pub fn target(&self) -> Option<&Upstream> {
        self.upstream.as_deref().filter(|u| u.is_complete())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HeaderMatchConfig, QueryMatchConfig, UpstreamConfig};
    use axum::http::HeaderValue;

    fn registry() -> UpstreamRegistry {
        UpstreamRegistry::from_config(&[
            UpstreamConfig::new("integralist", "integralist.co.uk"),
            UpstreamConfig::new("nameless-host", ""),
        ])
    }

    fn query(value: &str, match_type: MatchType) -> Option<QueryMatchConfig> {
        Some(QueryMatchConfig {
            param: "s".into(),
            value: value.into(),
            match_type,
        })
    }

    #[test]
    fn header_condition_is_case_sensitive_on_value() {
        let condition = HeaderCondition {
            name: "X-BF-Testing".into(),
            value: "integralist".into(),
        };
        let mut headers = HeaderMap::new();
        headers.insert("x-bf-testing", HeaderValue::from_static("integralist"));
        assert!(condition.matches(&headers));

        headers.insert("x-bf-testing", HeaderValue::from_static("Integralist"));
        assert!(!condition.matches(&headers));
        assert!(!condition.matches(&HeaderMap::new()));
    }

    #[test]
    fn literal_uses_template_verbatim() {
        let matcher = QueryMatch::Literal("integralist".into());
        let template = PathTemplate::new("/about/$cap");
        assert_eq!(
            matcher.evaluate("integralist", Some(&template)),
            Some(QueryOutcome { path: Some("/about/$cap".into()) })
        );
        assert_eq!(matcher.evaluate("integralist123", Some(&template)), None);
        assert_eq!(
            matcher.evaluate("integralist", None),
            Some(QueryOutcome { path: None })
        );
    }

    #[test]
    fn regex_expands_its_own_groups() {
        let matcher = QueryMatch::Regex(Regex::new(r"integralist(?P<cap>\d{1,3})$").unwrap());
        let template = PathTemplate::new("/anything/newthing$cap");
        assert_eq!(
            matcher.evaluate("integralist123", Some(&template)),
            Some(QueryOutcome { path: Some("/anything/newthing123".into()) })
        );
        assert_eq!(matcher.evaluate("integralistabc", Some(&template)), None);
    }

    #[test]
    fn regex_match_is_unanchored() {
        let matcher = QueryMatch::Regex(Regex::new("beta").unwrap());
        assert!(matcher.evaluate("pre-beta-2", None).is_some());
    }

    #[test]
    fn override_without_conditions_is_inactive() {
        let config = OverrideConfig {
            header: Some(HeaderMatchConfig { name: "X-A".into(), value: String::new() }),
            query: query("", MatchType::Literal),
            modify_path: Some("/x".into()),
            ..Default::default()
        };
        assert!(Override::compile("r", &config, &registry()).is_none());
    }

    #[test]
    fn bad_regex_disables_query_condition() {
        let config = OverrideConfig {
            query: query("integralist(", MatchType::Regex),
            ..Default::default()
        };
        assert!(Override::compile("r", &config, &registry()).is_none());

        let config = OverrideConfig {
            header: Some(HeaderMatchConfig { name: "X-A".into(), value: "1".into() }),
            query: query("integralist(", MatchType::Regex),
            ..Default::default()
        };
        let compiled = Override::compile("r", &config, &registry()).unwrap();
        assert!(compiled.header.is_some());
        assert!(compiled.query.is_none());
    }

    #[test]
    fn partial_upstream_is_not_a_target() {
        let config = OverrideConfig {
            query: query("x", MatchType::Literal),
            upstream: Some("nameless-host".into()),
            ..Default::default()
        };
        let compiled = Override::compile("r", &config, &registry()).unwrap();
        assert!(compiled.upstream.is_some());
        assert!(compiled.target().is_none());

        let config = OverrideConfig {
            upstream: Some("integralist".into()),
            ..config
        };
        let compiled = Override::compile("r", &config, &registry()).unwrap();
        assert_eq!(compiled.target().map(|u| u.host.as_str()), Some("integralist.co.uk"));
    }
}
