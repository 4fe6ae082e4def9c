//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID + trace layers, dispatch)
//!     → [routing layer picks the route] → [rewrite layer builds the outbound request]
//!     → request.rs (hop-by-hop headers, X-Forwarded-For)
//!     → client.rs (forward to the upstream, timeouts)
//!     → response.rs (diagnostic headers, hop-by-hop headers)
//!     → Send to client
//! ```

pub mod client;
pub mod request;
pub mod response;
pub mod server;

pub use client::{ClientError, Forward, ForwardError, UpstreamClient};
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer, ServerError};
