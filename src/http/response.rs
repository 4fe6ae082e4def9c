//! Response handling.
//!
//! # Responsibilities
//! - Overlay the routing decisions recorded on the outbound request onto the
//!   upstream response
//! - Strip hop-by-hop headers from the upstream response
//!
//! # Design Decisions
//! - Streaming responses; the body is never buffered
//! - Diagnostic headers overwrite whatever the upstream sent

use axum::body::Body;
use axum::http::{HeaderMap, Response};

use crate::http::request::strip_hop_by_hop;
use crate::rewrite::headers::DIAGNOSTIC_HEADERS;

pub fn finalize(outbound: &HeaderMap, mut response: Response<Body>) -> Response<Body> {
    let headers = response.headers_mut();
    strip_hop_by_hop(headers);

    for name in DIAGNOSTIC_HEADERS.iter() {
        if let Some(value) = outbound.get(name).filter(|v| !v.is_empty()) {
            headers.insert(name.clone(), value.clone());
        }
    }
    response
}
