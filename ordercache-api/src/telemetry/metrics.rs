//! Prometheus Metrics Definitions
//!
//! Defines all ordercache metrics with appropriate labels and types.
//! Exposes a /metrics endpoint for Prometheus scraping.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// HTTP request latency buckets (seconds)
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0,
];

/// Database operation latency buckets (seconds)
const DB_LATENCY_BUCKETS: &[f64] =
    &[0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0];

/// Global metrics instance - initialized on first use
pub static METRICS: Lazy<ApiResult<OrderMetrics>> = Lazy::new(OrderMetrics::new);

/// Container for all ordercache metrics.
#[derive(Clone)]
pub struct OrderMetrics {
    /// Stream messages by outcome - labels: outcome (accepted/malformed/storage_error)
    pub messages_total: CounterVec,

    /// Durable store operation counter - labels: operation, status
    pub db_operations_total: CounterVec,

    /// Durable store operation duration histogram - labels: operation
    pub db_operation_duration_seconds: HistogramVec,

    /// Orders resident in the cache
    pub cached_orders: Gauge,

    /// HTTP request counter - labels: method, route, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, route
    pub http_request_duration_seconds: HistogramVec,
}

impl OrderMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            messages_total: register_counter_vec!(
                "ordercache_messages_total",
                "Total stream messages handled",
                &["outcome"]
            )
            .map_err(registration_failed("messages_total"))?,

            db_operations_total: register_counter_vec!(
                "ordercache_db_operations_total",
                "Total number of durable store operations",
                &["operation", "status"]
            )
            .map_err(registration_failed("db_operations_total"))?,

            db_operation_duration_seconds: register_histogram_vec!(
                "ordercache_db_operation_duration_seconds",
                "Durable store operation duration in seconds",
                &["operation"],
                DB_LATENCY_BUCKETS.to_vec()
            )
            .map_err(registration_failed("db_operation_duration_seconds"))?,

            cached_orders: register_gauge!(
                "ordercache_cached_orders",
                "Current number of orders in the cache"
            )
            .map_err(registration_failed("cached_orders"))?,

            http_requests_total: register_counter_vec!(
                "ordercache_http_requests_total",
                "Total number of HTTP requests",
                &["method", "route", "status"]
            )
            .map_err(registration_failed("http_requests_total"))?,

            http_request_duration_seconds: register_histogram_vec!(
                "ordercache_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "route"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(registration_failed("http_request_duration_seconds"))?,
        })
    }

    /// Record one handled stream message.
    pub fn record_message(&self, outcome: MessageOutcome) {
        self.messages_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    /// Record a durable store operation.
    pub fn record_db_operation(&self, operation: &str, success: bool, duration_secs: f64) {
        let status = if success { "success" } else { "error" };
        self.db_operations_total
            .with_label_values(&[operation, status])
            .inc();
        self.db_operation_duration_seconds
            .with_label_values(&[operation])
            .observe(duration_secs);
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, route: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, route, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, route])
            .observe(duration_secs);
    }

    /// Set the cached order count.
    pub fn set_cached_orders(&self, count: usize) {
        self.cached_orders.set(count as f64);
    }
}

fn registration_failed(metric: &'static str) -> impl FnOnce(prometheus::Error) -> ApiError {
    move |e| ApiError::internal_error(format!("Failed to register {}: {}", metric, e))
}

/// Outcome label for [`OrderMetrics::record_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Accepted,
    Malformed,
    StorageError,
}

impl MessageOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageOutcome::Accepted => "accepted",
            MessageOutcome::Malformed => "malformed",
            MessageOutcome::StorageError => "storage_error",
        }
    }
}

// ============================================================================
// RECORDING HELPERS
// ============================================================================

// Best-effort: a registration failure never fails the measured operation.

pub fn record_message(outcome: MessageOutcome) {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_message(outcome);
    }
}

pub fn record_db_operation(operation: &str, success: bool, duration_secs: f64) {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_db_operation(operation, success, duration_secs);
    }
}

pub fn record_http_request(method: &str, route: &str, status: u16, duration_secs: f64) {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_http_request(method, route, status, duration_secs);
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics. The cached order gauge is
/// refreshed at scrape time.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match METRICS.as_ref() {
        Ok(metrics) => metrics.set_cached_orders(state.service.cached_len()),
        Err(e) => tracing::error!(error = %e, "Metrics registry unavailable"),
    }

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
