//! HTTP routes.
//!
//! The surface is read-only: orders enter through stream ingestion only.

pub mod health;
pub mod order;

use axum::{middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

/// Build the application router.
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let health = Router::new()
        .route("/ping", get(health::ping))
        .route("/live", get(health::liveness))
        .route("/ready", get(health::readiness));

    Router::new()
        .route("/order", get(order::get_order_by_query))
        .route("/order/:uid", get(order::get_order_by_path))
        .route("/metrics", get(metrics_handler))
        .nest("/health", health)
        .route_layer(middleware::from_fn(observability_middleware))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(config.request_timeout())),
        )
        .with_state(state)
}
