//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → compiled into the route table at startup
//!
//! No file given:
//!     → defaults.rs (built-in routing table)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod defaults;
pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    HeaderMatchConfig, ListenerConfig, LogFormat, MatchType, MissingSection, ObservabilityConfig,
    OverrideConfig, ProxyConfig, QueryMatchConfig, RewriteConfig, RouteConfig, TimeoutConfig,
    UpstreamConfig,
};
pub use validation::ValidationError;
