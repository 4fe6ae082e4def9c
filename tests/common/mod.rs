//! Shared utilities for integration testing.

use std::net::SocketAddr;

use axum::http::{HeaderMap, Uri};
use axum::{Json, Router};
use regex_proxy::config::UpstreamConfig;
use regex_proxy::{HttpServer, ProxyConfig, Shutdown};
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Start a mock upstream that echoes what it received as JSON:
/// upstream name, path, query and a few request headers.
pub async fn start_echo_upstream(name: String) -> SocketAddr {
    let app = Router::new().fallback(move |uri: Uri, headers: HeaderMap| {
        let name = name.clone();
        async move {
            let header = |key: &str| {
                headers
                    .get(key)
                    .and_then(|v| v.to_str().ok())
                    .map(String::from)
            };
            Json(json!({
                "upstream": name,
                "path": uri.path(),
                "query": uri.query(),
                "host": header("host"),
                "forwarded_host": header("x-forwarded-host"),
                "forwarded_for": header("x-forwarded-for"),
            }))
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub struct TestProxy {
    pub addr: SocketAddr,
    pub upstreams: Vec<(String, SocketAddr)>,
    pub shutdown: Shutdown,
    pub handle: tokio::task::JoinHandle<Result<(), std::io::Error>>,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn upstream_host(&self, name: &str) -> String {
        self.upstreams
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, addr)| addr.to_string())
            .unwrap()
    }
}

/// Start the built-in route table with every upstream replaced by a local
/// echo server and test mode honored.
pub async fn start_proxy() -> TestProxy {
    let mut config = ProxyConfig::default();
    config.rewrite.honor_testing_header = true;

    let mut upstreams = Vec::new();
    for upstream in config.upstreams.iter_mut() {
        let addr = start_echo_upstream(upstream.name.clone()).await;
        *upstream = UpstreamConfig::new(upstream.name.clone(), addr.to_string());
        upstreams.push((upstream.name.clone(), addr));
    }

    start_proxy_with(config, upstreams).await
}

pub async fn start_proxy_with(
    config: ProxyConfig,
    upstreams: Vec<(String, SocketAddr)>,
) -> TestProxy {
    let server = HttpServer::new(&config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    TestProxy {
        addr,
        upstreams,
        shutdown,
        handle,
    }
}

/// What the upstream saw, plus the proxy's response headers.
pub struct Echo {
    pub status: u16,
    pub body: Value,
    pub headers: reqwest::header::HeaderMap,
}

impl Echo {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.body.get(key).and_then(Value::as_str)
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(|v| v.to_str().ok())
    }
}

/// GET `path` through the proxy in test mode, with optional extra headers.
pub async fn get(proxy: &TestProxy, path: &str, extra: &[(&str, &str)]) -> Echo {
    let mut request = reqwest::Client::new()
        .get(proxy.url(path))
        .header("X-Testing", "true");
    for (name, value) in extra {
        request = request.header(*name, *value);
    }

    let response = request.send().await.unwrap();
    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let bytes = response.bytes().await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    Echo {
        status,
        body,
        headers,
    }
}
