//! Upstream registry.
//!
//! # Responsibilities
//! - Represent a named origin (name + host)
//! - Resolve upstream names referenced by routes and overrides
//!
//! # Design Decisions
//! - Upstreams are shared via `Arc`; many routes may point at one record
//! - A record missing its name or host is "partial" and never used as an
//!   override target

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::UpstreamConfig;

/// A named backend origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    pub name: String,
    pub host: String,
}

impl Upstream {
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
        }
    }

    /// True when both name and host are populated.
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.host.is_empty()
    }
}

/// Immutable lookup of upstreams by name.
#[derive(Debug, Default)]
pub struct UpstreamRegistry {
    upstreams: HashMap<String, Arc<Upstream>>,
}

impl UpstreamRegistry {
    pub fn from_config(configs: &[UpstreamConfig]) -> Self {
        let mut upstreams = HashMap::with_capacity(configs.len());
        for config in configs {
            let upstream = Upstream::new(&config.name, &config.host);
            if !upstream.is_complete() {
                tracing::warn!(
                    upstream = %upstream.name,
                    host = %upstream.host,
                    "Upstream is partially populated and will never be used as an override target"
                );
            }
            upstreams.insert(config.name.clone(), Arc::new(upstream));
        }
        Self { upstreams }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Upstream>> {
        self.upstreams.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.upstreams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upstreams.is_empty()
    }
}
