//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all dispatch handler
//! - Wire up middleware (request ID, tracing)
//! - Bind the server to a listener and stop on shutdown
//! - Dispatch: match, rewrite, forward, finalize
//!
//! # Design Decisions
//! - Route table, director and forwarder are built once and shared by `Arc`
//! - A request is matched once; there is no re-matching and no retry
//! - Failures never carry diagnostic headers

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode, Version},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::client::{ClientError, Forward, UpstreamClient};
use crate::http::request::{append_forwarded_for, request_id, strip_hop_by_hop, UuidRequestId, X_REQUEST_ID};
use crate::http::response::finalize;
use crate::observability::metrics;
use crate::rewrite::headers::{X_ROUTER_UPSTREAM_OVERRIDE_HOST, X_ROUTER_UPSTREAM_OVERRIDE_PATH};
use crate::rewrite::{decode_path, Director, OutboundRequest};
use crate::routing::{RouteTable, RouteTableError};

/// Errors raised while building the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Routes(#[from] RouteTableError),

    #[error("upstream client: {0}")]
    Client(#[from] ClientError),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<RouteTable>,
    pub director: Arc<Director>,
    pub forwarder: Arc<dyn Forward>,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Build a server that forwards over the network.
    pub fn new(config: &ProxyConfig) -> Result<Self, ServerError> {
        let forwarder = Arc::new(UpstreamClient::new(&config.timeouts)?);
        Self::with_forwarder(config, forwarder)
    }

    pub fn with_forwarder(
        config: &ProxyConfig,
        forwarder: Arc<dyn Forward>,
    ) -> Result<Self, ServerError> {
        let table = RouteTable::from_config(config)?;
        tracing::info!(
            routes = table.len(),
            upstreams = table.upstreams().len(),
            "Route table compiled"
        );

        let state = AppState {
            table: Arc::new(table),
            director: Arc::new(Director::new(&config.rewrite)),
            forwarder,
        };

        Ok(Self {
            router: Self::build_router(state),
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "request",
                request_id = %request_id(request.headers()),
                method = %request.method(),
                path = %request.uri().path(),
            )
        });

        Router::new()
            .route("/{*path}", any(dispatch))
            .route("/", any(dispatch))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
                    .layer(trace)
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
            )
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all proxy handler.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (parts, body) = request.into_parts();
    let request_id = request_id(&parts.headers).to_string();

    let path = decode_path(parts.uri.path());
    let Some(matched) = state.table.match_path(&path) else {
        tracing::warn!(request_id = %request_id, path = %path, "No route matched");
        metrics::record_unmatched();
        return StatusCode::NOT_FOUND.into_response();
    };

    let outbound = state
        .director
        .rewrite(OutboundRequest::from_parts(&parts), &matched);

    let route = matched.route.name.clone();
    let upstream = outbound.upstream.clone();
    drop(matched);

    if outbound.headers.contains_key(X_ROUTER_UPSTREAM_OVERRIDE_HOST)
        || outbound.headers.contains_key(X_ROUTER_UPSTREAM_OVERRIDE_PATH)
    {
        metrics::record_override(&route);
    }

    tracing::debug!(
        request_id = %request_id,
        route = %route,
        upstream = %upstream,
        url = %format!("{}://{}{}", outbound.scheme, outbound.host, outbound.path_and_query()),
        "Forwarding request"
    );

    let uri = match outbound.uri() {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, route = %route, error = %e, "Rewritten URI is invalid");
            metrics::record_request(&route, &upstream, 502, start);
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let mut headers = outbound.headers.clone();
    strip_hop_by_hop(&mut headers);
    if let Some(ConnectInfo(client)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        append_forwarded_for(&mut headers, *client);
    }

    let mut upstream_request = Request::new(body);
    *upstream_request.method_mut() = parts.method;
    *upstream_request.uri_mut() = uri;
    *upstream_request.version_mut() = Version::HTTP_11;
    *upstream_request.headers_mut() = headers;

    match state.forwarder.forward(upstream_request).await {
        Ok(response) => {
            let status = response.status();
            tracing::debug!(request_id = %request_id, status = %status, "Upstream responded");
            metrics::record_request(&route, &upstream, status.as_u16(), start);
            finalize(&outbound.headers, response)
        }
        Err(e) => {
            let status = e.status();
            tracing::error!(
                request_id = %request_id,
                route = %route,
                upstream = %upstream,
                error = %e,
                "Upstream error"
            );
            metrics::record_request(&route, &upstream, status.as_u16(), start);
            status.into_response()
        }
    }
}
