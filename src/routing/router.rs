//! Route lookup.
//!
//! # Responsibilities
//! - Compile configured routes into an ordered table
//! - Look up the first route whose pattern matches a request path
//! - Return the matched route with its captures, or an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) regex scan in declaration order; order is part of the contract
//! - Invalid patterns are fatal at startup

use std::sync::Arc;

use thiserror::Error;

use crate::config::ProxyConfig;
use crate::rewrite::template::PathTemplate;
use crate::routing::matcher::{Captures, PathMatcher};
use crate::routing::overrides::Override;
use crate::routing::upstream::{Upstream, UpstreamRegistry};

/// Errors raised while building the route table.
#[derive(Debug, Error)]
pub enum RouteTableError {
    #[error("route '{route}' has an invalid path pattern: {source}")]
    InvalidPattern {
        route: String,
        #[source]
        source: regex::Error,
    },

    #[error("route '{route}' references unknown upstream '{upstream}'")]
    UnknownUpstream { route: String, upstream: String },
}

/// A compiled route.
#[derive(Debug)]
pub struct Route {
    pub name: String,
    pub matcher: PathMatcher,
    pub upstream: Arc<Upstream>,
    pub path_template: Option<PathTemplate>,
    pub override_rule: Option<Override>,
}

/// The route selected for a request, with the captures its pattern produced.
#[derive(Debug)]
pub struct MatchResult<'a> {
    pub route: &'a Route,
    pub captures: Captures,
}

/// Ordered, immutable route table.
#[derive(Debug)]
pub struct RouteTable {
    routes: Vec<Route>,
    upstreams: UpstreamRegistry,
}

impl RouteTable {
    /// Compile every route in the configuration, preserving declaration order.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, RouteTableError> {
        let upstreams = UpstreamRegistry::from_config(&config.upstreams);
        let mut routes = Vec::with_capacity(config.routes.len());

        for route in &config.routes {
            let name = route.display_name().to_string();

            let matcher = PathMatcher::new(&route.path).map_err(|source| {
                RouteTableError::InvalidPattern {
                    route: name.clone(),
                    source,
                }
            })?;

            let upstream = upstreams.get(&route.upstream).ok_or_else(|| {
                RouteTableError::UnknownUpstream {
                    route: name.clone(),
                    upstream: route.upstream.clone(),
                }
            })?;

            let override_rule = route
                .override_rule
                .as_ref()
                .and_then(|o| Override::compile(&name, o, &upstreams));

            tracing::debug!(
                route = %name,
                upstream = %upstream.name,
                captures = ?matcher.capture_names(),
                has_override = override_rule.is_some(),
                "Route compiled"
            );

            routes.push(Route {
                name,
                matcher,
                upstream,
                path_template: PathTemplate::from_config(route.modify_path.as_deref()),
                override_rule,
            });
        }

        Ok(Self { routes, upstreams })
    }

    /// First route whose pattern matches `path`.
    pub fn match_path(&self, path: &str) -> Option<MatchResult<'_>> {
        self.routes.iter().find_map(|route| {
            route
                .matcher
                .captures(path)
                .map(|captures| MatchResult { route, captures })
        })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn upstreams(&self) -> &UpstreamRegistry {
        &self.upstreams
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
