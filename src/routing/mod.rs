//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (ordered route scan)
//!     → matcher.rs (regex search, named captures)
//!     → Return: MatchResult { route, captures } or NoMatch
//!
//! Route Compilation (at startup):
//!     UpstreamConfig[] → upstream.rs (registry)
//!     RouteConfig[]    → compile patterns, resolve upstreams,
//!                        compile overrides (overrides.rs)
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Declaration order is matching order; first match wins
//! - Captures travel with the match result; propagation.rs only guarantees
//!   reserved capture keys never leave the proxy

pub mod matcher;
pub mod overrides;
pub mod propagation;
pub mod router;
pub mod upstream;

pub use matcher::{Captures, PathMatcher};
pub use overrides::{HeaderCondition, Override, QueryCondition, QueryMatch, QueryOutcome};
pub use router::{MatchResult, Route, RouteTable, RouteTableError};
pub use upstream::{Upstream, UpstreamRegistry};
