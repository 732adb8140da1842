//! Stream ingestion.
//!
//! - `source`: the transport boundary, plus channel and line sources
//! - `consumer`: per-message validate, write-through and acknowledge
//!
//! Ingestion is spawned during server startup, after warm-up:
//!
//! ```ignore
//! use ordercache_api::ingest::{ConsumerConfig, LineSource, StreamConsumer};
//! use tokio::sync::watch;
//!
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! let consumer = StreamConsumer::new(service, reporter, ConsumerConfig::default());
//! let source = LineSource::new(tokio::io::BufReader::new(tokio::io::stdin()));
//! let handle = tokio::spawn(consumer.run(source, shutdown_rx));
//!
//! // On shutdown
//! let _ = shutdown_tx.send(true);
//! let stats = handle.await?;
//! ```

pub mod consumer;
pub mod source;

pub use consumer::{ConsumerConfig, ConsumerCounters, ConsumerStats, StreamConsumer};
pub use source::{
    channel, Acknowledger, ChannelPublisher, ChannelSource, Delivery, DeliveryOutcome, LineSource,
    MessageSource, SourceClosed,
};
