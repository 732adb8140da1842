//! Order identity and payload types.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use crate::error::MalformedMessage;

// ============================================================================
// ORDER UID
// ============================================================================

/// Globally unique order identifier.
///
/// The UID is the sole lookup key and the sole deduplication key for both the
/// cache and the durable store. A UID is never empty or whitespace-only;
/// any other string is kept exactly, surrounding whitespace included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderUid(String);

impl OrderUid {
    /// Create a UID, rejecting empty or whitespace-only values.
    pub fn new(uid: impl Into<String>) -> Result<Self, MalformedMessage> {
        let uid = uid.into();
        if uid.trim().is_empty() {
            return Err(MalformedMessage::EmptyUid);
        }
        Ok(Self(uid))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for OrderUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for OrderUid {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for OrderUid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OrderUid {
    type Error = MalformedMessage;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for OrderUid {
    type Error = MalformedMessage;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OrderUid> for String {
    fn from(uid: OrderUid) -> Self {
        uid.0
    }
}

// ============================================================================
// ORDER DATA
// ============================================================================

/// Opaque order payload.
///
/// In practice this is the JSON document exactly as it arrived on the stream,
/// but nothing in the cache or the store interprets it. The bytes live behind
/// an `Arc<[u8]>`: cloning is cheap and a reader always holds a complete,
/// immutable payload.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OrderData(Arc<[u8]>);

impl OrderData {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl fmt::Debug for OrderData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderData").field("len", &self.0.len()).finish()
    }
}

impl AsRef<[u8]> for OrderData {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for OrderData {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Arc::from(bytes))
    }
}

impl From<&[u8]> for OrderData {
    fn from(bytes: &[u8]) -> Self {
        Self(Arc::from(bytes))
    }
}

impl From<&str> for OrderData {
    fn from(s: &str) -> Self {
        Self::from(s.as_bytes())
    }
}

impl From<String> for OrderData {
    fn from(s: String) -> Self {
        Self::from(s.into_bytes())
    }
}

// ============================================================================
// ORDER
// ============================================================================

/// The unit of storage and cache: a UID and its verbatim payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub uid: OrderUid,
    pub data: OrderData,
}

impl Order {
    pub fn new(uid: OrderUid, data: impl Into<OrderData>) -> Self {
        Self {
            uid,
            data: data.into(),
        }
    }
}
