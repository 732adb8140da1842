//! Write-through order service.
//!
//! [`OrderService`] is the only component that talks to both the durable
//! store and the cache. It enforces three rules:
//!
//! - warm-up: the cache is populated from the durable store before serving;
//! - write-through: an order reaches the cache only after it is durable, so
//!   the cache is always a subset of what is stored;
//! - read-through: reads hit the cache only and never wait on storage.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ordercache_core::{
    Order, OrderData, OrderError, OrderResult, ReportSink, StorageError, StorageResult,
    TracingReportSink,
};

use crate::cache::CacheStore;
use crate::durable::DurableStore;

/// Summary of a completed warm-up pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarmupReport {
    /// Records returned by the durable store.
    pub loaded: usize,
    /// Distinct UIDs resident in the cache afterwards.
    pub distinct: usize,
    /// Wall time spent loading and populating.
    pub elapsed: Duration,
}

/// Write-through order service over a durable store and an in-memory cache.
pub struct OrderService<S> {
    store: S,
    cache: CacheStore,
    reporter: Arc<dyn ReportSink>,
    warmed: AtomicBool,
}

impl<S: DurableStore> OrderService<S> {
    /// Create a service with an empty cache that reports through `tracing`.
    pub fn new(store: S) -> Self {
        Self::with_reporter(store, Arc::new(TracingReportSink))
    }

    /// Create a service with an explicit report sink.
    pub fn with_reporter(store: S, reporter: Arc<dyn ReportSink>) -> Self {
        Self {
            store,
            cache: CacheStore::new(),
            reporter,
            warmed: AtomicBool::new(false),
        }
    }

    /// Get a reference to the underlying durable store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether a warm-up pass has completed successfully.
    pub fn is_warmed(&self) -> bool {
        self.warmed.load(Ordering::Acquire)
    }

    /// Number of cached orders.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Populate the cache from the durable store.
    ///
    /// Records are inserted in the order the store returns them; a duplicate
    /// UID simply overwrites the earlier one. If loading fails or exceeds
    /// `deadline`, the cache is left untouched and the error is returned.
    /// The caller must not start serving in that case.
    pub async fn init(&self, deadline: Duration) -> StorageResult<WarmupReport> {
        let started = Instant::now();

        let orders = match with_deadline("load_all", deadline, self.store.load_all()).await {
            Ok(orders) => orders,
            Err(e) => {
                self.reporter.warmup_failed(&e);
                return Err(e);
            }
        };

        let loaded = orders.len();
        for order in orders {
            self.cache.set(order.uid, order.data);
        }

        let report = WarmupReport {
            loaded,
            distinct: self.cache.len(),
            elapsed: started.elapsed(),
        };
        self.warmed.store(true, Ordering::Release);
        self.reporter
            .warmup_completed(report.loaded, report.distinct, report.elapsed);
        Ok(report)
    }

    /// Persist an order, then cache it.
    ///
    /// The durable write completes before the cache is touched. If it fails
    /// or exceeds `deadline`, the cache keeps whatever it held before.
    pub async fn set(&self, order: Order, deadline: Duration) -> StorageResult<()> {
        with_deadline("persist", deadline, self.store.persist(&order)).await?;
        self.cache.set(order.uid, order.data);
        Ok(())
    }

    /// Read an order from the cache.
    ///
    /// Never consults the durable store. An unknown UID yields
    /// [`OrderError::NotFound`].
    pub fn get(&self, uid: &str) -> OrderResult<OrderData> {
        self.cache.get(uid).ok_or_else(|| OrderError::not_found(uid))
    }

    /// Probe the durable store, bounded by `deadline`.
    pub async fn ping_store(&self, deadline: Duration) -> StorageResult<()> {
        with_deadline("ping", deadline, self.store.ping()).await
    }
}

async fn with_deadline<T>(
    operation: &'static str,
    deadline: Duration,
    fut: impl std::future::Future<Output = StorageResult<T>>,
) -> StorageResult<T> {
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(StorageError::Timeout {
            operation,
            after: deadline,
        }),
    }
}
