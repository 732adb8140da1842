//! Message Sources
//!
//! A [`MessageSource`] hands the consumer one [`Delivery`] at a time. Each
//! delivery may carry an acknowledgement handle through which the consumer
//! reports the handling outcome back to the transport, so a redelivering
//! transport can decide whether to retry.

use async_trait::async_trait;
use ordercache_core::{IngestError, OrderUid};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::{mpsc, oneshot};

// ============================================================================
// DELIVERY
// ============================================================================

/// Result of handling one delivery, as reported to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Persisted and cached.
    Accepted { uid: OrderUid },
    /// Not stored. `retryable` is set only for storage failures; a malformed
    /// payload will never succeed on redelivery.
    Rejected { reason: String, retryable: bool },
}

impl DeliveryOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

impl From<&Result<OrderUid, IngestError>> for DeliveryOutcome {
    fn from(result: &Result<OrderUid, IngestError>) -> Self {
        match result {
            Ok(uid) => Self::Accepted { uid: uid.clone() },
            Err(e) => Self::Rejected {
                reason: e.to_string(),
                retryable: e.is_retryable(),
            },
        }
    }
}

/// One inbound message.
#[derive(Debug)]
pub struct Delivery {
    payload: Vec<u8>,
    ack: Option<oneshot::Sender<DeliveryOutcome>>,
}

impl Delivery {
    /// A delivery nobody waits on.
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            ack: None,
        }
    }

    /// A delivery whose outcome is sent to `ack`.
    pub fn with_ack(payload: impl Into<Vec<u8>>, ack: oneshot::Sender<DeliveryOutcome>) -> Self {
        Self {
            payload: payload.into(),
            ack: Some(ack),
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Split into the payload and the acknowledgement handle.
    pub fn into_parts(self) -> (Vec<u8>, Acknowledger) {
        (self.payload, Acknowledger { ack: self.ack })
    }
}

/// Acknowledgement handle detached from its payload.
#[derive(Debug)]
pub struct Acknowledger {
    ack: Option<oneshot::Sender<DeliveryOutcome>>,
}

impl Acknowledger {
    /// Report the outcome. A transport that stopped listening is not an error.
    pub fn acknowledge(self, outcome: DeliveryOutcome) {
        if let Some(ack) = self.ack {
            if ack.send(outcome).is_err() {
                tracing::debug!("Delivery acknowledgement dropped by transport");
            }
        }
    }
}

// ============================================================================
// SOURCE TRAIT
// ============================================================================

/// Pull-based source of inbound messages.
///
/// `None` means the source is exhausted and the consumer should stop.
#[async_trait]
pub trait MessageSource: Send {
    async fn next_delivery(&mut self) -> Option<Delivery>;
}

// ============================================================================
// CHANNEL SOURCE
// ============================================================================

/// Create an in-process bounded queue of deliveries.
pub fn channel(capacity: usize) -> (ChannelPublisher, ChannelSource) {
    let (tx, rx) = mpsc::channel(capacity);
    (ChannelPublisher { tx }, ChannelSource { rx })
}

/// The consumer side was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Message source closed")]
pub struct SourceClosed;

/// Publishing half of [`channel`].
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: mpsc::Sender<Delivery>,
}

impl ChannelPublisher {
    /// Enqueue a payload and get a receiver for its outcome.
    ///
    /// Waits while the queue is full.
    pub async fn publish(
        &self,
        payload: impl Into<Vec<u8>>,
    ) -> Result<oneshot::Receiver<DeliveryOutcome>, SourceClosed> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(Delivery::with_ack(payload, ack_tx))
            .await
            .map_err(|_| SourceClosed)?;
        Ok(ack_rx)
    }

    /// Enqueue a payload without waiting for its outcome.
    pub async fn publish_detached(&self, payload: impl Into<Vec<u8>>) -> Result<(), SourceClosed> {
        self.tx
            .send(Delivery::new(payload))
            .await
            .map_err(|_| SourceClosed)
    }
}

/// Consuming half of [`channel`]. Exhausted once every publisher is dropped.
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<Delivery>,
}

#[async_trait]
impl MessageSource for ChannelSource {
    async fn next_delivery(&mut self) -> Option<Delivery> {
        self.rx.recv().await
    }
}

// ============================================================================
// LINE SOURCE
// ============================================================================

/// One message per non-blank line of a byte stream, e.g. standard input.
///
/// Outcomes are not acknowledged. A read error ends the source.
pub struct LineSource<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin + Send> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> MessageSource for LineSource<R> {
    async fn next_delivery(&mut self) -> Option<Delivery> {
        loop {
            match self.lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => return Some(Delivery::new(line)),
                Ok(None) => return None,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read message line");
                    return None;
                }
            }
        }
    }
}
