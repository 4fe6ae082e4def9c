//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): forwarded requests by route, upstream, status
//! - `proxy_request_duration_seconds` (histogram): time spent forwarding, by route, upstream
//! - `proxy_unmatched_total` (counter): requests no route matched
//! - `proxy_overrides_total` (counter): requests re-targeted or re-pathed by an override, by route
//!
//! # Design Decisions
//! - Exposition is a separate Prometheus listener, off by default
//! - Recording without an installed recorder is a no-op, so tests need no setup

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and start its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!("proxy_requests_total", "Requests forwarded to an upstream");
    describe_histogram!(
        "proxy_request_duration_seconds",
        Unit::Seconds,
        "Time spent forwarding a request upstream"
    );
    describe_counter!("proxy_unmatched_total", "Requests that matched no route");
    describe_counter!(
        "proxy_overrides_total",
        "Requests changed by a route override"
    );

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(route: &str, upstream: &str, status: u16, start: Instant) {
    let labels = [
        ("route", route.to_string()),
        ("upstream", upstream.to_string()),
        ("status", status.to_string()),
    ];
    counter!("proxy_requests_total", &labels).increment(1);

    let labels = [("route", route.to_string()), ("upstream", upstream.to_string())];
    histogram!("proxy_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_unmatched() {
    counter!("proxy_unmatched_total").increment(1);
}

pub fn record_override(route: &str) {
    let labels = [("route", route.to_string())];
    counter!("proxy_overrides_total", &labels).increment(1);
}
