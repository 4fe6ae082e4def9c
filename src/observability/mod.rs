//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher and startup produce:
//!     → logging.rs (structured log events, request-scoped spans)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Prometheus scrape endpoint (when enabled)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log line of a request via the trace span
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
