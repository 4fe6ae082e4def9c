//! Diagnostic header names.
//!
//! Written onto the outbound request while rewriting and mirrored onto the
//! client response, so callers can see which routing decisions were taken.

use axum::http::HeaderName;

pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_ORIGIN_HOST: HeaderName = HeaderName::from_static("x-origin-host");
pub const X_ROUTER_UPSTREAM: HeaderName = HeaderName::from_static("x-router-upstream");
pub const X_ROUTER_UPSTREAM_ORIGINAL_HOST: HeaderName =
    HeaderName::from_static("x-router-upstream-originalhost");
pub const X_ROUTER_UPSTREAM_ORIGINAL_PATH: HeaderName =
    HeaderName::from_static("x-router-upstream-originalpath");
pub const X_ROUTER_UPSTREAM_ORIGINAL_PATH_MODIFIED: HeaderName =
    HeaderName::from_static("x-router-upstream-originalpathmodified");
pub const X_ROUTER_UPSTREAM_OVERRIDE: HeaderName =
    HeaderName::from_static("x-router-upstream-override");
pub const X_ROUTER_UPSTREAM_OVERRIDE_HOST: HeaderName =
    HeaderName::from_static("x-router-upstream-overridehost");
pub const X_ROUTER_UPSTREAM_OVERRIDE_PATH: HeaderName =
    HeaderName::from_static("x-router-upstream-overridepath");

/// Every diagnostic header, in the order they are mirrored.
pub const DIAGNOSTIC_HEADERS: [HeaderName; 9] = [
    X_FORWARDED_HOST,
    X_ORIGIN_HOST,
    X_ROUTER_UPSTREAM,
    X_ROUTER_UPSTREAM_ORIGINAL_HOST,
    X_ROUTER_UPSTREAM_ORIGINAL_PATH,
    X_ROUTER_UPSTREAM_ORIGINAL_PATH_MODIFIED,
    X_ROUTER_UPSTREAM_OVERRIDE,
    X_ROUTER_UPSTREAM_OVERRIDE_HOST,
    X_ROUTER_UPSTREAM_OVERRIDE_PATH,
];
