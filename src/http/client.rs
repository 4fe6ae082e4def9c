//! Upstream forwarding.
//!
//! # Responsibilities
//! - Send a rewritten request to its upstream and hand back the response
//! - Enforce the connect and whole-request timeouts
//!
//! # Design Decisions
//! - `Forward` is the seam between dispatch and the network; tests swap in
//!   a recording implementation
//! - One pooled client shared by every request, HTTPS or plain HTTP chosen
//!   from the URI scheme
//! - No retries

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use hyper::body::Incoming;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use thiserror::Error;

use crate::config::TimeoutConfig;

/// Errors raised while forwarding to an upstream.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    #[error("upstream request failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("could not build upstream request: {0}")]
    InvalidRequest(#[from] axum::http::Error),
}

/// Errors raised while building the upstream client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("TLS configuration failed: {0}")]
    Tls(#[from] rustls::Error),
}

impl ForwardError {
    /// Status returned to the client for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ForwardError::Transport(_) | ForwardError::InvalidRequest(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

#[async_trait]
pub trait Forward: Send + Sync {
    async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError>;
}

/// Pooled HTTP/1.1 client over an HTTPS-or-HTTP connector.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client<HttpsConnector<HttpConnector>, Body>,
    request_timeout: Duration,
}

impl UpstreamClient {
    /// TLS uses the ring provider explicitly; more than one rustls provider
    /// is compiled into the binary, so the process default is ambiguous.
    pub fn new(config: &TimeoutConfig) -> Result<Self, ClientError> {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_connect_timeout(Some(Duration::from_secs(config.connect_secs)));

        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())?
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);

        let client = Client::builder(TokioExecutor::new()).build(https);

        Ok(Self {
            client,
            request_timeout: Duration::from_secs(config.request_secs),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

#[async_trait]
impl Forward for UpstreamClient {
    async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        let response: Response<Incoming> = tokio::time::timeout(self.request_timeout, self.client.request(request))
            .await
            .map_err(|_| ForwardError::Timeout(self.request_timeout))??;

        Ok(response.map(Body::new))
    }
}
