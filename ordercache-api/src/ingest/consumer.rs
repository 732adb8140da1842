//! Stream Consumer
//!
//! Turns inbound messages into write-through updates:
//!
//! 1. validate the payload and extract its UID
//! 2. persist, then cache, through [`OrderService::set`]
//! 3. report the outcome and acknowledge the delivery
//!
//! Malformed messages never reach the durable store or the cache. There is
//! no retry here; a redelivering transport decides from the acknowledgement.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ordercache_core::{validate_owned, IngestError, OrderUid, ReportSink};
use ordercache_storage::{DurableStore, OrderService};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

use super::source::{DeliveryOutcome, MessageSource};
use crate::config::IngestConfig;
use crate::telemetry::metrics::{self, MessageOutcome};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the stream consumer.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Maximum messages handled concurrently (default: 64)
    pub max_in_flight: usize,

    /// Deadline for persisting one message (default: 5 seconds)
    pub message_timeout: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self::from(&IngestConfig::default())
    }
}

impl From<&IngestConfig> for ConsumerConfig {
    fn from(config: &IngestConfig) -> Self {
        Self {
            max_in_flight: config.max_in_flight.max(1),
            message_timeout: config.message_timeout(),
        }
    }
}

// ============================================================================
// COUNTERS
// ============================================================================

/// Message counters since the consumer was created.
#[derive(Debug, Default)]
pub struct ConsumerCounters {
    pub received: AtomicU64,
    pub accepted: AtomicU64,
    pub rejected_malformed: AtomicU64,
    pub rejected_storage: AtomicU64,
}

impl ConsumerCounters {
    /// Get current snapshot of all counters.
    pub fn snapshot(&self) -> ConsumerStats {
        ConsumerStats {
            received: self.received.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected_malformed: self.rejected_malformed.load(Ordering::Relaxed),
            rejected_storage: self.rejected_storage.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of consumer counters at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub received: u64,
    pub accepted: u64,
    pub rejected_malformed: u64,
    pub rejected_storage: u64,
}

// ============================================================================
// CONSUMER
// ============================================================================

/// Feeds validated stream messages into an [`OrderService`].
///
/// Cloning is cheap and shares the service, reporter and counters.
pub struct StreamConsumer<S> {
    service: Arc<OrderService<S>>,
    reporter: Arc<dyn ReportSink>,
    config: ConsumerConfig,
    counters: Arc<ConsumerCounters>,
}

impl<S> Clone for StreamConsumer<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            reporter: Arc::clone(&self.reporter),
            config: self.config.clone(),
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<S: DurableStore + 'static> StreamConsumer<S> {
    pub fn new(
        service: Arc<OrderService<S>>,
        reporter: Arc<dyn ReportSink>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            service,
            reporter,
            config,
            counters: Arc::new(ConsumerCounters::default()),
        }
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    pub fn stats(&self) -> ConsumerStats {
        self.counters.snapshot()
    }

    /// Handle one message: validate, persist and cache, report.
    ///
    /// `deadline` bounds the durable write. Exceeding it is a storage
    /// failure like any other.
    pub async fn handle(
        &self,
        payload: Vec<u8>,
        deadline: Duration,
    ) -> Result<OrderUid, IngestError> {
        self.counters.received.fetch_add(1, Ordering::Relaxed);

        let result = self.ingest(payload, deadline).await;
        match &result {
            Ok(uid) => {
                self.counters.accepted.fetch_add(1, Ordering::Relaxed);
                metrics::record_message(MessageOutcome::Accepted);
                self.reporter.message_accepted(uid);
            }
            Err(e @ IngestError::Malformed(_)) => {
                self.counters.rejected_malformed.fetch_add(1, Ordering::Relaxed);
                metrics::record_message(MessageOutcome::Malformed);
                self.reporter.message_rejected(e);
            }
            Err(e @ IngestError::Storage { .. }) => {
                self.counters.rejected_storage.fetch_add(1, Ordering::Relaxed);
                metrics::record_message(MessageOutcome::StorageError);
                self.reporter.message_rejected(e);
            }
        }
        result
    }

    async fn ingest(
        &self,
        payload: Vec<u8>,
        deadline: Duration,
    ) -> Result<OrderUid, IngestError> {
        let order = validate_owned(payload)?;
        let uid = order.uid.clone();
        self.service
            .set(order, deadline)
            .await
            .map_err(|source| IngestError::Storage {
                uid: uid.clone(),
                source,
            })?;
        Ok(uid)
    }

    /// Consume `source` until it is exhausted or `shutdown` turns true.
    ///
    /// Each delivery is handled on its own task; at most `max_in_flight`
    /// run at once, and the source is not polled while the limit is reached.
    /// Tasks already started are drained before this returns.
    pub async fn run<M: MessageSource>(
        self,
        mut source: M,
        mut shutdown: watch::Receiver<bool>,
    ) -> ConsumerStats {
        let permits = Arc::new(Semaphore::new(self.config.max_in_flight));
        let mut tasks = JoinSet::new();

        tracing::info!(
            max_in_flight = self.config.max_in_flight,
            message_timeout_ms = self.config.message_timeout.as_millis() as u64,
            "Stream consumer started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let permit = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let delivery = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Stream consumer shutting down");
                        break;
                    }
                    continue;
                }
                delivery = source.next_delivery() => match delivery {
                    Some(delivery) => delivery,
                    None => {
                        tracing::info!("Message source exhausted");
                        break;
                    }
                },
            };

            let consumer = self.clone();
            let deadline = self.config.message_timeout;
            tasks.spawn(async move {
                let _permit = permit;
                let (payload, ack) = delivery.into_parts();
                let result = consumer.handle(payload, deadline).await;
                ack.acknowledge(DeliveryOutcome::from(&result));
            });

            while let Some(joined) = tasks.try_join_next() {
                log_join_error(joined);
            }
        }

        let pending = tasks.len();
        if pending > 0 {
            tracing::info!(pending, "Draining in-flight messages");
        }
        while let Some(joined) = tasks.join_next().await {
            log_join_error(joined);
        }

        let stats = self.stats();
        tracing::info!(
            received = stats.received,
            accepted = stats.accepted,
            rejected_malformed = stats.rejected_malformed,
            rejected_storage = stats.rejected_storage,
            "Stream consumer stopped"
        );
        stats
    }
}

fn log_join_error(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        tracing::error!(error = %e, "Message handler task failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordercache_core::{MalformedMessage, NoopReportSink};
    use ordercache_storage::InMemoryDurableStore;

    const DEADLINE: Duration = Duration::from_secs(1);

    fn consumer() -> StreamConsumer<InMemoryDurableStore> {
        let service = Arc::new(OrderService::with_reporter(
            InMemoryDurableStore::new(),
            Arc::new(NoopReportSink),
        ));
        StreamConsumer::new(service, Arc::new(NoopReportSink), ConsumerConfig::default())
    }

    #[tokio::test]
    async fn test_handle_accepts_valid_message() {
        let consumer = consumer();
        let payload = br#"{"order_uid":"a1","x":1}"#.to_vec();

        let uid = consumer.handle(payload.clone(), DEADLINE).await.unwrap();
        assert_eq!(uid.as_str(), "a1");
        assert_eq!(consumer.service.get("a1").unwrap().as_bytes(), &payload[..]);
        assert_eq!(consumer.service.store().get("a1").unwrap().as_bytes(), &payload[..]);
        assert_eq!(
            consumer.stats(),
            ConsumerStats {
                received: 1,
                accepted: 1,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn test_handle_rejects_malformed_without_storing() {
        let consumer = consumer();

        let err = consumer.handle(b"{bad".to_vec(), DEADLINE).await.unwrap_err();
        assert!(matches!(
            err,
            IngestError::Malformed(MalformedMessage::InvalidJson { .. })
        ));
        assert!(consumer.service.store().is_empty());
        assert_eq!(consumer.service.cached_len(), 0);
        assert_eq!(consumer.stats().rejected_malformed, 1);
    }

    #[test]
    fn test_config_from_ingest() {
        let ingest = IngestConfig {
            max_in_flight: 0,
            message_timeout_secs: 2,
            ..Default::default()
        };
        let config = ConsumerConfig::from(&ingest);
        assert_eq!(config.max_in_flight, 1);
        assert_eq!(config.message_timeout, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_clones_share_counters() {
        let consumer = consumer();
        let clone = consumer.clone();
        clone
            .handle(br#"{"order_uid":"z"}"#.to_vec(), DEADLINE)
            .await
            .unwrap();
        assert_eq!(consumer.stats().accepted, 1);
    }
}
