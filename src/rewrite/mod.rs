//! Request rewriting (the director).
//!
//! # Data Flow
//! ```text
//! OutboundRequest (snapshot of the inbound request) + MatchResult
//!     → record_original   (diagnostic headers, before any mutation)
//!     → force_scheme      (https unless test mode is honored)
//!     → target_upstream   (authority + Host header)
//!     → modify_path       (route path template)
//!     → apply_override    (header phase, then query phase)
//!     → strip_captures    (no reserved capture key leaves the proxy)
//!     → OutboundRequest, ready to forward
//! ```
//!
//! # Design Decisions
//! - Each step is a plain `fn(OutboundRequest, &RewriteContext) -> OutboundRequest`
//!   and the steps run in a fixed order
//! - No network I/O happens here
//! - When both override phases fire, the query phase has the last word
//! - `path` is percent-decoded; it is re-encoded only if a step changed it

pub mod headers;
pub mod template;

use std::borrow::Cow;

use axum::http::header::HOST;
use axum::http::request::Parts;
use axum::http::uri::{Scheme, Uri};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use url::form_urlencoded;

use crate::config::RewriteConfig;
use crate::routing::{propagation, Captures, MatchResult, Route, Upstream};

use self::headers::*;

/// Percent-decode a request path. Paths that do not decode to UTF-8 are
/// returned as received.
pub fn decode_path(raw: &str) -> Cow<'_, str> {
    urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
}

/// Percent-encode a decoded path, leaving `/` and the other characters a
/// path segment may carry literally.
pub fn encode_path(path: &str) -> Cow<'_, str> {
    let literal = |c: char| c.is_ascii_alphanumeric() || "/-._~!$&'()*+,;=:@".contains(c);
    if path.chars().all(literal) {
        return Cow::Borrowed(path);
    }

    let mut out = String::with_capacity(path.len() + 8);
    let mut buf = [0u8; 4];
    for c in path.chars() {
        if literal(c) {
            out.push(c);
        } else {
            out.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
        }
    }
    Cow::Owned(out)
}

/// The mutable view of a request as it is being rewritten.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub scheme: Scheme,
    pub host: String,
    /// Upstream the request is currently aimed at.
    pub upstream: String,
    /// Decoded path.
    pub path: String,
    /// Path exactly as received, reused on the wire while `path` is unchanged.
    pub raw_path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
}

impl OutboundRequest {
    /// Snapshot an inbound request.
    pub fn from_parts(parts: &Parts) -> Self {
        let host = parts
            .headers
            .get(HOST)
            .and_then(|h| h.to_str().ok())
            .map(String::from)
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_default();

        let raw_path = parts.uri.path();
        Self {
            scheme: parts.uri.scheme().cloned().unwrap_or(Scheme::HTTP),
            host,
            upstream: String::new(),
            path: decode_path(raw_path).into_owned(),
            raw_path: raw_path.to_string(),
            query: parts.uri.query().map(String::from),
            headers: parts.headers.clone(),
        }
    }

    /// First value of a query parameter, decoded.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// Path is sent in its received encoding unless a step rewrote it.
    pub fn path_and_query(&self) -> String {
        let path = if decode_path(&self.raw_path) == self.path {
            Cow::Borrowed(self.raw_path.as_str())
        } else {
            encode_path(&self.path)
        };

        let mut out = String::with_capacity(path.len() + 1);
        if !path.starts_with('/') {
            out.push('/');
        }
        out.push_str(&path);
        if let Some(query) = &self.query {
            out.push('?');
            out.push_str(query);
        }
        out
    }

    /// Absolute URI for the upstream request.
    pub fn uri(&self) -> Result<Uri, axum::http::Error> {
        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.host.as_str())
            .path_and_query(self.path_and_query())
            .build()
    }
}

/// Everything a rewrite step may read besides the request itself.
#[derive(Debug)]
pub struct RewriteContext<'a> {
    pub route: &'a Route,
    pub captures: &'a Captures,
    pub testing_header: Option<&'a HeaderName>,
}

pub type RewriteStep = fn(OutboundRequest, &RewriteContext<'_>) -> OutboundRequest;

/// The rewrite pipeline, in execution order.
pub const STEPS: [RewriteStep; 6] = [
    record_original,
    force_scheme,
    target_upstream,
    modify_path,
    apply_override,
    strip_captures,
];

/// Applies the rewrite pipeline to matched requests.
#[derive(Debug, Clone, Default)]
pub struct Director {
    testing_header: Option<HeaderName>,
}

impl Director {
    pub fn new(config: &RewriteConfig) -> Self {
        let testing_header = if config.honor_testing_header {
            match HeaderName::from_bytes(config.testing_header.as_bytes()) {
                Ok(name) => {
                    tracing::warn!(
                        header = %name,
                        "Test-mode header is honored; upstream TLS can be bypassed by clients"
                    );
                    Some(name)
                }
                Err(_) => {
                    tracing::warn!(
                        header = %config.testing_header,
                        "Invalid test-mode header name; test mode stays disabled"
                    );
                    None
                }
            }
        } else {
            None
        };
        Self { testing_header }
    }

    pub fn rewrite(&self, request: OutboundRequest, matched: &MatchResult<'_>) -> OutboundRequest {
        let ctx = RewriteContext {
            route: matched.route,
            captures: &matched.captures,
            testing_header: self.testing_header.as_ref(),
        };
        STEPS.iter().fold(request, |req, step| step(req, &ctx))
    }
}

fn set_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => {
            tracing::debug!(header = %name, value = %value, "Value not representable as a header; skipped");
        }
    }
}

fn retarget(req: &mut OutboundRequest, target: &Upstream) {
    req.host = target.host.clone();
    req.upstream = target.name.clone();
    set_header(&mut req.headers, HOST, &target.host);
}

/// Override re-targeting. Only the header phase names the new upstream.
fn record_retarget(req: &mut OutboundRequest, target: &Upstream, name_it: bool) {
    retarget(req, target);
    if name_it {
        set_header(&mut req.headers, X_ROUTER_UPSTREAM_OVERRIDE, &target.name);
    }
    set_header(&mut req.headers, X_ROUTER_UPSTREAM_OVERRIDE_HOST, &target.host);
}

fn record_override_path(req: &mut OutboundRequest, path: String) {
    req.path = path;
    set_header(&mut req.headers, X_ROUTER_UPSTREAM_OVERRIDE_PATH, &req.path);
}

/// Record the original host and path before anything is mutated. Router
/// diagnostics sent by the client are discarded first; `X-Forwarded-Host`
/// is appended to so an upstream proxy chain survives.
pub fn record_original(mut req: OutboundRequest, ctx: &RewriteContext<'_>) -> OutboundRequest {
    for name in DIAGNOSTIC_HEADERS.iter().filter(|n| **n != X_FORWARDED_HOST) {
        req.headers.remove(name);
    }

    let upstream = &ctx.route.upstream;
    set_header(&mut req.headers, X_ROUTER_UPSTREAM, &upstream.name);
    set_header(&mut req.headers, X_ROUTER_UPSTREAM_ORIGINAL_HOST, &upstream.host);
    set_header(&mut req.headers, X_ROUTER_UPSTREAM_ORIGINAL_PATH, &req.path);
    match HeaderValue::from_str(&req.host) {
        Ok(value) => {
            req.headers.append(X_FORWARDED_HOST, value);
        }
        Err(_) => {
            tracing::debug!(value = %req.host, "Host not representable as a header; skipped");
        }
    }
    set_header(&mut req.headers, X_ORIGIN_HOST, &upstream.host);
    req
}

/// Upstreams are reached over TLS unless honored test mode says otherwise.
pub fn force_scheme(mut req: OutboundRequest, ctx: &RewriteContext<'_>) -> OutboundRequest {
    let testing = ctx
        .testing_header
        .and_then(|name| req.headers.get(name))
        .is_some_and(|v| v.as_bytes() == b"true");
    req.scheme = if testing { Scheme::HTTP } else { Scheme::HTTPS };
    req
}

/// Upstreams validate the Host header, so authority and Host move together.
pub fn target_upstream(mut req: OutboundRequest, ctx: &RewriteContext<'_>) -> OutboundRequest {
    retarget(&mut req, &ctx.route.upstream);
    req
}

pub fn modify_path(mut req: OutboundRequest, ctx: &RewriteContext<'_>) -> OutboundRequest {
    if let Some(template) = &ctx.route.path_template {
        req.path = template.resolve(ctx.captures);
        set_header(&mut req.headers, X_ROUTER_UPSTREAM_ORIGINAL_PATH_MODIFIED, &req.path);
    }
    req
}

pub fn apply_override(mut req: OutboundRequest, ctx: &RewriteContext<'_>) -> OutboundRequest {
    let Some(rule) = &ctx.route.override_rule else {
        return req;
    };

    if let Some(header) = rule.header.as_ref().filter(|h| h.matches(&req.headers)) {
        tracing::debug!(route = %ctx.route.name, header = %header.name, "Header override fired");
        if let Some(template) = &rule.path_template {
            record_override_path(&mut req, template.resolve(ctx.captures));
        }
        if let Some(target) = rule.target() {
            record_retarget(&mut req, target, true);
        }
    }

    if let Some(query) = &rule.query {
        // an absent parameter reads as empty
        let value = req.query_param(&query.param).unwrap_or_default();
        let outcome = query.matcher.evaluate(&value, rule.path_template.as_ref());
        if let Some(outcome) = outcome {
            tracing::debug!(route = %ctx.route.name, param = %query.param, "Query override fired");
            if let Some(target) = rule.target() {
                record_retarget(&mut req, target, false);
            }
            if let Some(path) = outcome.path {
                record_override_path(&mut req, path);
            }
        }
    }

    req
}

pub fn strip_captures(mut req: OutboundRequest, _ctx: &RewriteContext<'_>) -> OutboundRequest {
    req.query = propagation::strip(req.query.as_deref());
    req
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        HeaderMatchConfig, MatchType, OverrideConfig, ProxyConfig, QueryMatchConfig, RouteConfig,
        UpstreamConfig,
    };
    use crate::routing::RouteTable;
    use axum::body::Body;
    use axum::http::Request;

    fn inbound(uri: &str, headers: &[(&str, &str)]) -> OutboundRequest {
        let mut builder = Request::builder().uri(uri).header("host", "proxy.local:9001");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (parts, _) = builder.body(Body::empty()).unwrap().into_parts();
        OutboundRequest::from_parts(&parts)
    }

    fn rewrite(table: &RouteTable, director: &Director, req: OutboundRequest) -> OutboundRequest {
        let path = req.path.clone();
        let matched = table.match_path(&path).expect("route should match");
        director.rewrite(req, &matched)
    }

    fn header<'a>(req: &'a OutboundRequest, name: &HeaderName) -> Option<&'a str> {
        req.headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn builtin() -> RouteTable {
        RouteTable::from_config(&ProxyConfig::default()).unwrap()
    }

    #[test]
    fn standard_route_passes_through() {
        let out = rewrite(&builtin(), &Director::default(), inbound("/anything/standard", &[]));

        assert_eq!(out.scheme, Scheme::HTTPS);
        assert_eq!(out.host, "httpbin.org");
        assert_eq!(header(&out, &HOST), Some("httpbin.org"));
        assert_eq!(out.path_and_query(), "/anything/standard");
        assert_eq!(header(&out, &X_ROUTER_UPSTREAM), Some("httpbin"));
        assert_eq!(header(&out, &X_FORWARDED_HOST), Some("proxy.local:9001"));
        assert_eq!(header(&out, &X_ROUTER_UPSTREAM_ORIGINAL_PATH), Some("/anything/standard"));
        assert_eq!(header(&out, &X_ROUTER_UPSTREAM_ORIGINAL_PATH_MODIFIED), None);
        assert_eq!(header(&out, &X_ROUTER_UPSTREAM_OVERRIDE_HOST), None);
    }

    #[test]
    fn header_override_interpolates_path_captures() {
        let req = inbound("/anything/foobar", &[("X-BF-Testing", "integralist")]);
        let out = rewrite(&builtin(), &Director::default(), req);

        assert_eq!(out.host, "httpbin.org");
        assert_eq!(out.path, "/anything/newthingfoobar");
        assert_eq!(header(&out, &X_ROUTER_UPSTREAM_OVERRIDE_PATH), Some("/anything/newthingfoobar"));
        assert_eq!(header(&out, &X_ROUTER_UPSTREAM_OVERRIDE), None);
    }

    #[test]
    fn header_override_needs_exact_value() {
        let req = inbound("/anything/foobar", &[("X-BF-Testing", "INTEGRALIST")]);
        let out = rewrite(&builtin(), &Director::default(), req);
        assert_eq!(out.path, "/anything/foobar");
    }

    #[test]
    fn header_override_retargets_upstream() {
        let req = inbound("/anything/integralist", &[("X-BF-Testing", "integralist")]);
        let out = rewrite(&builtin(), &Director::default(), req);

        assert_eq!(out.host, "integralist.co.uk");
        assert_eq!(header(&out, &HOST), Some("integralist.co.uk"));
        assert_eq!(out.path, "/about");
        assert_eq!(header(&out, &X_ROUTER_UPSTREAM), Some("httpbin"));
        assert_eq!(header(&out, &X_ROUTER_UPSTREAM_OVERRIDE), Some("integralist"));
        assert_eq!(header(&out, &X_ROUTER_UPSTREAM_OVERRIDE_HOST), Some("integralist.co.uk"));
    }

    #[test]
    fn route_template_then_override_template() {
        let out = rewrite(&builtin(), &Director::default(), inbound("/double-checks", &[]));
        assert_eq!(out.path, "/anything/toplevel-modified-double-checks");

        let req = inbound("/double-checks", &[("X-BF-Testing", "integralist")]);
        let out = rewrite(&builtin(), &Director::default(), req);
        assert_eq!(out.path, "/anything/override-modified-double-checks");
        assert_eq!(
            header(&out, &X_ROUTER_UPSTREAM_ORIGINAL_PATH_MODIFIED),
            Some("/anything/toplevel-modified-double-checks")
        );
    }

    #[test]
    fn literal_query_override_keeps_query() {
        let out = rewrite(&builtin(), &Director::default(), inbound("/about?s=integralist", &[]));
        assert_eq!(out.host, "integralist.co.uk");
        assert_eq!(out.upstream, "integralist");
        assert_eq!(out.path_and_query(), "/about?s=integralist");
        assert_eq!(header(&out, &X_ROUTER_UPSTREAM_OVERRIDE_PATH), None);
        // the query phase records the new host only
        assert_eq!(header(&out, &X_ROUTER_UPSTREAM_OVERRIDE_HOST), Some("integralist.co.uk"));
        assert_eq!(header(&out, &X_ROUTER_UPSTREAM_OVERRIDE), None);

        let out = rewrite(&builtin(), &Director::default(), inbound("/about?s=other", &[]));
        assert_eq!(out.host, "httpbin.org");
    }

    #[test]
    fn regex_query_override_expands_groups() {
        let req = inbound("/anything/querytest?s=integralist123", &[]);
        let out = rewrite(&builtin(), &Director::default(), req);
        assert_eq!(out.host, "httpbin.org");
        assert_eq!(out.path_and_query(), "/anything/newthing123?s=integralist123");

        let req = inbound("/anything/querytest?s=integralistabc", &[]);
        let out = rewrite(&builtin(), &Director::default(), req);
        assert_eq!(out.path_and_query(), "/anything/querytest?s=integralistabc");
    }

    #[test]
    fn marker_free_template_is_literal() {
        let out = rewrite(&builtin(), &Director::default(), inbound("/beepboop", &[]));
        assert_eq!(out.path, "/anything/beepboop");

        let out = rewrite(&builtin(), &Director::default(), inbound("/fooabc", &[]));
        assert_eq!(out.path, "/anything/fooabc");
    }

    #[test]
    fn absent_query_param_reads_as_empty() {
        let config = ProxyConfig {
            upstreams: vec![UpstreamConfig::new("origin", "origin.example")],
            routes: vec![RouteConfig::new("/items", "origin").with_override(OverrideConfig {
                header: None,
                query: Some(QueryMatchConfig {
                    param: "v".into(),
                    value: "(?P<v>\\d*)".into(),
                    match_type: MatchType::Regex,
                }),
                upstream: None,
                modify_path: Some("/v$v".into()),
            })],
            ..Default::default()
        };
        let table = RouteTable::from_config(&config).unwrap();

        let out = rewrite(&table, &Director::default(), inbound("/items", &[]));
        assert_eq!(out.path, "/v");
        assert_eq!(header(&out, &X_ROUTER_UPSTREAM_OVERRIDE_PATH), Some("/v"));

        let out = rewrite(&table, &Director::default(), inbound("/items?v=42", &[]));
        assert_eq!(out.path, "/v42");
    }

    #[test]
    fn encoded_path_matches_decoded_form() {
        let req = inbound("/anything/foo%62ar", &[("X-BF-Testing", "integralist")]);
        let out = rewrite(&builtin(), &Director::default(), req);

        assert_eq!(header(&out, &X_ROUTER_UPSTREAM_ORIGINAL_PATH), Some("/anything/foobar"));
        assert_eq!(out.path_and_query(), "/anything/newthingfoobar");
    }

    #[test]
    fn unchanged_path_keeps_received_encoding() {
        let req = inbound("/anything/standard/a%2Fb%20c?q=1", &[]);
        let out = rewrite(&builtin(), &Director::default(), req);

        assert_eq!(out.path, "/anything/standard/a/b c");
        assert_eq!(out.path_and_query(), "/anything/standard/a%2Fb%20c?q=1");
    }

    #[test]
    fn rewritten_path_is_reencoded() {
        let mut req = inbound("/anything/x%20y", &[]);
        req.path = "/new path/ü".into();
        assert_eq!(req.path_and_query(), "/new%20path/%C3%BC");

        assert_eq!(encode_path("/a-b_c.d~e/f:g@h"), "/a-b_c.d~e/f:g@h");
        assert_eq!(decode_path("/bad%FF"), "/bad%FF");
    }

    fn double_override_table(target: &str) -> RouteTable {
        let config = ProxyConfig {
            upstreams: vec![
                UpstreamConfig::new("origin", "origin.example"),
                UpstreamConfig::new("canary", "canary.example"),
                UpstreamConfig::new("partial", ""),
            ],
            routes: vec![RouteConfig::new("/(?P<n>items)", "origin").with_override(
                OverrideConfig {
                    header: Some(HeaderMatchConfig {
                        name: "X-Canary".into(),
                        value: "1".into(),
                    }),
                    query: Some(QueryMatchConfig {
                        param: "v".into(),
                        value: "(?P<n>\\d)".into(),
                        match_type: MatchType::Regex,
                    }),
                    upstream: Some(target.into()),
                    modify_path: Some("/release/$n".into()),
                },
            )],
            ..Default::default()
        };
        RouteTable::from_config(&config).unwrap()
    }

    #[test]
    fn query_phase_overwrites_header_phase() {
        let table = double_override_table("canary");
        let req = inbound("/items?v=7", &[("X-Canary", "1")]);
        let out = rewrite(&table, &Director::default(), req);

        // the query phase expands `$n` from its own regex, not from the path
        assert_eq!(out.path, "/release/7");
        assert_eq!(header(&out, &X_ROUTER_UPSTREAM_OVERRIDE_PATH), Some("/release/7"));
        assert_eq!(out.host, "canary.example");

        let out = rewrite(&table, &Director::default(), inbound("/items", &[("X-Canary", "1")]));
        assert_eq!(out.path, "/release/items");
    }

    #[test]
    fn partial_override_upstream_never_retargets() {
        let table = double_override_table("partial");
        let out = rewrite(&table, &Director::default(), inbound("/items?v=3", &[("X-Canary", "1")]));
        assert_eq!(out.host, "origin.example");
        assert_eq!(header(&out, &X_ROUTER_UPSTREAM_OVERRIDE_HOST), None);
        assert_eq!(out.path, "/release/3");
    }

    #[test]
    fn testing_header_requires_opt_in() {
        let req = || inbound("/anything/standard", &[("X-Testing", "true")]);
        let out = rewrite(&builtin(), &Director::default(), req());
        assert_eq!(out.scheme, Scheme::HTTPS);

        let director = Director::new(&RewriteConfig {
            honor_testing_header: true,
            ..Default::default()
        });
        assert_eq!(rewrite(&builtin(), &director, req()).scheme, Scheme::HTTP);

        let out = rewrite(&builtin(), &director, inbound("/anything/standard", &[("X-Testing", "yes")]));
        assert_eq!(out.scheme, Scheme::HTTPS);
    }

    #[test]
    fn client_supplied_diagnostics_are_discarded() {
        let req = inbound(
            "/anything/standard",
            &[
                ("X-Router-Upstream-Override", "spoofed"),
                ("X-Router-Upstream", "spoofed"),
                ("X-Origin-Host", "spoofed"),
            ],
        );
        let out = rewrite(&builtin(), &Director::default(), req);
        assert_eq!(header(&out, &X_ROUTER_UPSTREAM_OVERRIDE), None);
        assert_eq!(header(&out, &X_ROUTER_UPSTREAM), Some("httpbin"));
        assert_eq!(header(&out, &X_ORIGIN_HOST), Some("httpbin.org"));
    }

    #[test]
    fn forwarded_host_chain_is_extended() {
        let req = inbound("/anything/standard", &[("X-Forwarded-Host", "edge.example")]);
        let out = rewrite(&builtin(), &Director::default(), req);

        let chain: Vec<_> = out
            .headers
            .get_all(X_FORWARDED_HOST)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(chain, ["edge.example", "proxy.local:9001"]);
    }

    #[test]
    fn reserved_capture_keys_are_stripped() {
        let req = inbound("/anything/standard?__capture_cap=x&keep=1", &[]);
        let out = rewrite(&builtin(), &Director::default(), req);
        assert_eq!(out.path_and_query(), "/anything/standard?keep=1");
    }

    #[test]
    fn steps_compose_in_declared_order() {
        let table = builtin();
        let req = inbound("/double-checks", &[]);
        let matched = table.match_path("/double-checks").unwrap();
        let ctx = RewriteContext {
            route: matched.route,
            captures: &matched.captures,
            testing_header: None,
        };

        let recorded = record_original(req, &ctx);
        assert_eq!(recorded.host, "proxy.local:9001");
        let targeted = target_upstream(recorded, &ctx);
        assert_eq!(header(&targeted, &X_FORWARDED_HOST), Some("proxy.local:9001"));
        assert_eq!(targeted.host, "httpbin.org");
        let modified = modify_path(targeted, &ctx);
        assert_eq!(header(&modified, &X_ROUTER_UPSTREAM_ORIGINAL_PATH), Some("/double-checks"));
        assert_eq!(modified.path, "/anything/toplevel-modified-double-checks");
    }

    #[test]
    fn builds_absolute_upstream_uri() {
        let out = rewrite(&builtin(), &Director::default(), inbound("/about?s=integralist", &[]));
        assert_eq!(out.uri().unwrap().to_string(), "https://integralist.co.uk/about?s=integralist");
    }
}
