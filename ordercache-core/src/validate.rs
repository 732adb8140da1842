//! Ingestion validation for inbound stream payloads.
//!
//! A payload is accepted when it is well-formed JSON whose top-level object
//! carries a non-empty string `order_uid`. The accepted [`Order`] keeps the
//! original bytes verbatim; nothing is re-serialized, so later reads return
//! exactly what was published.

use serde_json::Value;

use crate::error::MalformedMessage;
use crate::order::{Order, OrderData, OrderUid};

/// Name of the field carrying the order identifier.
pub const UID_FIELD: &str = "order_uid";

/// Validate a raw payload and extract its UID.
///
/// Rejection never has side effects: the caller must not persist or cache
/// anything for a payload that fails here.
pub fn validate(payload: &[u8]) -> Result<Order, MalformedMessage> {
    let uid = extract_uid(payload)?;
    Ok(Order::new(uid, OrderData::from(payload)))
}

/// Same as [`validate`] but takes ownership of the buffer, avoiding a copy.
pub fn validate_owned(payload: Vec<u8>) -> Result<Order, MalformedMessage> {
    let uid = extract_uid(&payload)?;
    Ok(Order::new(uid, OrderData::from(payload)))
}

fn extract_uid(payload: &[u8]) -> Result<OrderUid, MalformedMessage> {
    // Structural check
    let document: Value =
        serde_json::from_slice(payload).map_err(|e| MalformedMessage::InvalidJson {
            reason: e.to_string(),
        })?;

    // Shape check
    let object = document.as_object().ok_or(MalformedMessage::NotAnObject)?;
    match object.get(UID_FIELD) {
        None | Some(Value::Null) => Err(MalformedMessage::MissingUid),
        Some(Value::String(uid)) => OrderUid::new(uid.as_str()),
        Some(other) => Err(MalformedMessage::InvalidUid {
            found: json_kind(other),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
