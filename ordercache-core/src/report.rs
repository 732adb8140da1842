//! Report sinks for warm-up and ingestion outcomes.
//!
//! The service and the stream consumer receive a sink explicitly instead of
//! reaching for a process-wide logger. The default [`TracingReportSink`]
//! forwards every event to `tracing`; embedders and tests can plug in their
//! own.

use std::time::Duration;

use crate::error::{IngestError, StorageError};
use crate::order::OrderUid;

/// Receiver of warm-up and per-message ingestion outcomes.
///
/// Implementations must be cheap and non-blocking: they are called inline on
/// the ingestion path.
pub trait ReportSink: Send + Sync {
    /// Warm-up finished. `loaded` counts records returned by the durable
    /// store, `distinct` counts keys resident in the cache afterwards.
    fn warmup_completed(&self, loaded: usize, distinct: usize, elapsed: Duration);

    /// Warm-up failed; the process must not start serving.
    fn warmup_failed(&self, error: &StorageError);

    /// A stream message was persisted and cached.
    fn message_accepted(&self, uid: &OrderUid);

    /// A stream message was rejected.
    fn message_rejected(&self, error: &IngestError);
}

/// Report sink that emits structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReportSink;

impl ReportSink for TracingReportSink {
    fn warmup_completed(&self, loaded: usize, distinct: usize, elapsed: Duration) {
        tracing::info!(
            loaded,
            distinct,
            elapsed_ms = elapsed.as_millis() as u64,
            "Order cache warmed up"
        );
    }

    fn warmup_failed(&self, error: &StorageError) {
        tracing::error!(error = %error, "Order cache warm-up failed");
    }

    fn message_accepted(&self, uid: &OrderUid) {
        tracing::info!(uid = %uid, "Order received");
    }

    fn message_rejected(&self, error: &IngestError) {
        match error {
            IngestError::Malformed(reason) => {
                tracing::warn!(reason = %reason, "Dropped malformed message");
            }
            IngestError::Storage { uid, source } => {
                tracing::error!(uid = %uid, error = %source, "Failed to store order");
            }
        }
    }
}

/// Report sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReportSink;

impl ReportSink for NoopReportSink {
    fn warmup_completed(&self, _loaded: usize, _distinct: usize, _elapsed: Duration) {}
    fn warmup_failed(&self, _error: &StorageError) {}
    fn message_accepted(&self, _uid: &OrderUid) {}
    fn message_rejected(&self, _error: &IngestError) {}
}
