//! Regex-driven HTTP reverse proxy.
//!
//! Each request path is matched against an ordered table of regular
//! expressions. The first matching route picks an upstream, optionally
//! rewrites the path from named captures, and may be overridden per request
//! by a header or query-parameter condition. The rewritten request is
//! forwarded and the upstream response comes back with diagnostic headers
//! describing every routing decision.
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ routing ──▶ rewrite ──▶ http::client ──▶ Upstream
//!                          │          (match)    (director)      (forward)
//!     Client Response      ▼
//!     ◀────────────── http::response (diagnostic headers) ◀──────────────────── Upstream
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod rewrite;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
