//! Axum Middleware for HTTP Request Metrics
//!
//! Records every request against its matched route template, not the raw
//! path, so per-UID lookups do not explode label cardinality.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use super::metrics;

/// Route label for requests that matched no route.
const UNMATCHED_ROUTE: &str = "unmatched";

/// Observability middleware for Axum.
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let elapsed = start.elapsed();
    metrics::record_http_request(method.as_str(), &route, status, elapsed.as_secs_f64());

    if response.status().is_server_error() {
        tracing::warn!(
            http.method = %method,
            http.route = %route,
            http.status = status,
            latency_ms = elapsed.as_millis() as u64,
            "Request failed"
        );
    }

    response
}
