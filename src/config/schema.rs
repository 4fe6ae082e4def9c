//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::defaults;

/// Root configuration for the regex proxy.
///
/// `upstreams` and `routes` come as a pair: a file that sets neither gets
/// the built-in table, a file that sets only one of them is rejected.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "ConfigFile")]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration for upstream calls.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Request rewrite settings.
    pub rewrite: RewriteConfig,

    /// Named upstream origins.
    pub upstreams: Vec<UpstreamConfig>,

    /// Ordered route table. Declaration order is matching order.
    pub routes: Vec<RouteConfig>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
            rewrite: RewriteConfig::default(),
            upstreams: defaults::builtin_upstreams(),
            routes: defaults::builtin_routes(),
        }
    }
}

/// On-disk shape of `ProxyConfig` before the routing pair is resolved.
/// Only used through `ProxyConfig`'s `Deserialize` impl.
#[derive(Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    listener: ListenerConfig,
    timeouts: TimeoutConfig,
    observability: ObservabilityConfig,
    rewrite: RewriteConfig,
    upstreams: Option<Vec<UpstreamConfig>>,
    routes: Option<Vec<RouteConfig>>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
            rewrite: RewriteConfig::default(),
            upstreams: None,
            routes: None,
        }
    }
}

/// A config file that defines only one half of the routing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingSection {
    pub missing: &'static str,
    pub present: &'static str,
}

impl fmt::Display for MissingSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}` is defined but `{}` is missing; define both or neither (neither uses the built-in table)",
            self.present, self.missing
        )
    }
}

impl TryFrom<ConfigFile> for ProxyConfig {
    type Error = MissingSection;

    fn try_from(file: ConfigFile) -> Result<Self, Self::Error> {
        let (upstreams, routes) = match (file.upstreams, file.routes) {
            (Some(upstreams), Some(routes)) => (upstreams, routes),
            (None, None) => (defaults::builtin_upstreams(), defaults::builtin_routes()),
            (Some(_), None) => {
                return Err(MissingSection {
                    missing: "routes",
                    present: "upstreams",
                })
            }
            (None, Some(_)) => {
                return Err(MissingSection {
                    missing: "upstreams",
                    present: "routes",
                })
            }
        };

        Ok(Self {
            listener: file.listener,
            timeouts: file.timeouts,
            observability: file.observability,
            rewrite: file.rewrite,
            upstreams,
            routes,
        })
    }
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9001").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9001".to_string(),
        }
    }
}

/// Timeout configuration for upstream forwarding.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Request rewrite settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Honor the test-mode header that keeps the outbound scheme on plain HTTP.
    /// Only ever enable this inside a controlled test harness.
    pub honor_testing_header: bool,

    /// Name of the test-mode header. Its value must be `true` to take effect.
    pub testing_header: String,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            honor_testing_header: false,
            testing_header: "X-Testing".to_string(),
        }
    }
}

/// A named upstream origin.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Unique upstream identifier, referenced by routes.
    pub name: String,

    /// Origin host, optionally with port (e.g., "httpbin.org", "127.0.0.1:3000").
    #[serde(default)]
    pub host: String,
}

impl UpstreamConfig {
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
        }
    }
}

/// A route definition.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics. Defaults to the path pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Path regex. May contain named capture groups (`(?P<name>...)`).
    pub path: String,

    /// Upstream name to forward to.
    pub upstream: String,

    /// Replacement path. `$name` placeholders interpolate path captures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modify_path: Option<String>,

    /// Conditional re-routing rule.
    #[serde(default, rename = "override", skip_serializing_if = "Option::is_none")]
    pub override_rule: Option<OverrideConfig>,
}

impl RouteConfig {
    pub fn new(path: impl Into<String>, upstream: impl Into<String>) -> Self {
        Self {
            name: None,
            path: path.into(),
            upstream: upstream.into(),
            modify_path: None,
            override_rule: None,
        }
    }

    pub fn with_modify_path(mut self, template: impl Into<String>) -> Self {
        self.modify_path = Some(template.into());
        self
    }

    pub fn with_override(mut self, override_rule: OverrideConfig) -> Self {
        self.override_rule = Some(override_rule);
        self
    }

    /// Name used in logs and metrics.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.path)
    }
}

/// Conditional re-routing rule attached to a route.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct OverrideConfig {
    /// Fires when a request header equals a literal value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<HeaderMatchConfig>,

    /// Fires when a query parameter matches a literal or a regex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryMatchConfig>,

    /// Upstream name to re-target to when the override fires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<String>,

    /// Path to substitute when the override fires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modify_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HeaderMatchConfig {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct QueryMatchConfig {
    pub param: String,
    pub value: String,
    #[serde(default)]
    pub match_type: MatchType,
}

/// How a query override compares the parameter value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    #[default]
    Literal,
    Regex,
}
