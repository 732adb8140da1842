//! Shared application state for the HTTP layer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ordercache_storage::{DurableStore, OrderService};

/// Type-erased durable store handle used by the server.
pub type SharedStore = Arc<dyn DurableStore>;

/// The order service as wired by the server.
pub type AppService = OrderService<SharedStore>;

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AppService>,
    pub start_time: Instant,
    /// Deadline for the durable store probe in readiness checks.
    pub probe_timeout: Duration,
}

impl AppState {
    pub fn new(service: Arc<AppService>) -> Self {
        Self {
            service,
            start_time: Instant::now(),
            probe_timeout: Duration::from_secs(2),
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }
}
