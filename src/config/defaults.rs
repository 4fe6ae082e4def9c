//! Built-in routing table, used when no configuration file is supplied.
//!
//! Kept in sync with `config/router.toml`.

use crate::config::schema::{
    HeaderMatchConfig, MatchType, OverrideConfig, QueryMatchConfig, RouteConfig, UpstreamConfig,
};

pub const HTTPBIN: &str = "httpbin";
pub const GOOGLE: &str = "google";
pub const INTEGRALIST: &str = "integralist";

pub fn builtin_upstreams() -> Vec<UpstreamConfig> {
    vec![
        UpstreamConfig::new(HTTPBIN, "httpbin.org"),
        UpstreamConfig::new(GOOGLE, "google.com"),
        UpstreamConfig::new(INTEGRALIST, "integralist.co.uk"),
    ]
}

fn testing_header() -> Option<HeaderMatchConfig> {
    Some(HeaderMatchConfig {
        name: "X-BF-Testing".to_string(),
        value: "integralist".to_string(),
    })
}

pub fn builtin_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig::new("/anything/standard", HTTPBIN),
        RouteConfig::new("/anything/(?:foo|bar)$", HTTPBIN),
        RouteConfig::new("/(?P<start>anything)/(?P<cap>foobar)$", HTTPBIN).with_override(
            OverrideConfig {
                header: testing_header(),
                modify_path: Some("/anything/newthing$cap".to_string()),
                ..Default::default()
            },
        ),
        RouteConfig::new("/(?P<cap>double-checks)$", HTTPBIN)
            .with_modify_path("/anything/toplevel-modified-$cap")
            .with_override(OverrideConfig {
                header: testing_header(),
                modify_path: Some("/anything/override-modified-$cap".to_string()),
                ..Default::default()
            }),
        RouteConfig::new("/anything/(?P<cap>integralist)", HTTPBIN).with_override(OverrideConfig {
            header: testing_header(),
            modify_path: Some("/about".to_string()),
            upstream: Some(INTEGRALIST.to_string()),
            ..Default::default()
        }),
        RouteConfig::new("/about", HTTPBIN).with_override(OverrideConfig {
            query: Some(QueryMatchConfig {
                param: "s".to_string(),
                value: "integralist".to_string(),
                match_type: MatchType::Literal,
            }),
            upstream: Some(INTEGRALIST.to_string()),
            ..Default::default()
        }),
        RouteConfig::new("/anything/querytest", HTTPBIN).with_override(OverrideConfig {
            query: Some(QueryMatchConfig {
                param: "s".to_string(),
                value: r"integralist(?P<cap>\d{1,3})$".to_string(),
                match_type: MatchType::Regex,
            }),
            modify_path: Some("/anything/newthing$cap".to_string()),
            ..Default::default()
        }),
        RouteConfig::new(r"/(?P<cap>foo\w{3})", HTTPBIN).with_modify_path("/anything/$cap"),
        RouteConfig::new("/beep(?P<cap>boop)", HTTPBIN).with_modify_path("/anything/beepboop"),
    ]
}
