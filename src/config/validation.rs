//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference existing upstreams)
//! - Validate value ranges (timeouts > 0, bind address parses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Path patterns are compiled (and rejected) by the route table, not here
//! - Override targets with an empty host are allowed; the override simply
//!   never re-targets

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::HeaderName;
use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid listener bind address '{0}'")]
    BindAddress(String),

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("invalid rewrite.testing_header '{0}'")]
    TestingHeader(String),

    #[error("upstream #{0} has an empty name")]
    EmptyUpstreamName(usize),

    #[error("upstream '{0}' is defined more than once")]
    DuplicateUpstream(String),

    #[error("route #{0} has an empty path pattern")]
    EmptyPath(usize),

    #[error("route '{route}' references unknown upstream '{upstream}'")]
    UnknownUpstream { route: String, upstream: String },

    #[error("route '{route}' forwards to upstream '{upstream}' which has no host")]
    UpstreamWithoutHost { route: String, upstream: String },

    #[error("route '{route}' override references unknown upstream '{upstream}'")]
    UnknownOverrideUpstream { route: String, upstream: String },
}

/// Validate a parsed configuration, collecting every error found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }
    if HeaderName::from_bytes(config.rewrite.testing_header.as_bytes()).is_err() {
        errors.push(ValidationError::TestingHeader(config.rewrite.testing_header.clone()));
    }

    let mut names = HashSet::new();
    for (i, upstream) in config.upstreams.iter().enumerate() {
        if upstream.name.is_empty() {
            errors.push(ValidationError::EmptyUpstreamName(i));
        } else if !names.insert(upstream.name.as_str()) {
            errors.push(ValidationError::DuplicateUpstream(upstream.name.clone()));
        }
    }

    for (i, route) in config.routes.iter().enumerate() {
        if route.path.is_empty() {
            errors.push(ValidationError::EmptyPath(i));
        }

        match config.upstreams.iter().find(|u| u.name == route.upstream) {
            None => errors.push(ValidationError::UnknownUpstream {
                route: route.display_name().to_string(),
                upstream: route.upstream.clone(),
            }),
            Some(u) if u.host.is_empty() => errors.push(ValidationError::UpstreamWithoutHost {
                route: route.display_name().to_string(),
                upstream: route.upstream.clone(),
            }),
            Some(_) => {}
        }

        let target = route.override_rule.as_ref().and_then(|o| o.upstream.as_ref());
        if let Some(target) = target {
            if !names.contains(target.as_str()) {
                errors.push(ValidationError::UnknownOverrideUpstream {
                    route: route.display_name().to_string(),
                    upstream: target.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
