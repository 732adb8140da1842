//! Error types for ordercache operations

use std::time::Duration;
use thiserror::Error;

use crate::order::OrderUid;

/// Durable store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Durable store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Failed to load orders: {reason}")]
    LoadFailed { reason: String },

    #[error("Failed to persist order {uid}: {reason}")]
    PersistFailed { uid: OrderUid, reason: String },

    #[error("Durable store operation '{operation}' timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

/// Inbound stream payload failed structural or shape validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MalformedMessage {
    #[error("Payload is not valid JSON: {reason}")]
    InvalidJson { reason: String },

    #[error("Payload is not a JSON object")]
    NotAnObject,

    #[error("Payload has no order_uid field")]
    MissingUid,

    #[error("order_uid must be a string, found {found}")]
    InvalidUid { found: &'static str },

    #[error("order_uid is empty")]
    EmptyUid,
}

/// Master error type for order operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderError {
    /// The key is absent from the cache. A normal outcome, not a failure.
    #[error("Order not found: {uid}")]
    NotFound { uid: String },

    #[error("Malformed message: {0}")]
    Malformed(#[from] MalformedMessage),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl OrderError {
    pub fn not_found(uid: impl Into<String>) -> Self {
        Self::NotFound { uid: uid.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Outcome of a single rejected stream message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("Rejected malformed message: {0}")]
    Malformed(#[from] MalformedMessage),

    #[error("Failed to store order {uid}: {source}")]
    Storage {
        uid: OrderUid,
        #[source]
        source: StorageError,
    },
}

impl IngestError {
    /// Storage failures may succeed on redelivery; malformed payloads never will.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }

    /// UID of the rejected order, when the payload got far enough to have one.
    pub fn uid(&self) -> Option<&OrderUid> {
        match self {
            Self::Malformed(_) => None,
            Self::Storage { uid, .. } => Some(uid),
        }
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for order operations.
pub type OrderResult<T> = Result<T, OrderError>;

// =============================================================================
// TESTS
// =============================================================================
