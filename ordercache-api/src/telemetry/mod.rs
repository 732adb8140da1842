//! ordercache Telemetry - Logging and Metrics
//!
//! Structured `tracing` output and Prometheus metrics for the API layer.
//! Nothing here needs an external collector.

pub mod metrics;
pub mod middleware;
pub mod tracer;

pub use metrics::{metrics_handler, OrderMetrics, METRICS};
pub use middleware::observability_middleware;
pub use tracer::{default_filter, init_tracing};
