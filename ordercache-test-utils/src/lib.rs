//! ordercache Test Utilities
//!
//! Centralized test infrastructure for the ordercache workspace:
//! - Proptest generators for UIDs and order payloads
//! - A scriptable durable store that records calls and fails on demand
//! - A report sink that records every event
//! - Fixtures for realistic order documents

pub use ordercache_core::{
    validate, IngestError, MalformedMessage, NoopReportSink, Order, OrderData, OrderError,
    OrderResult, OrderUid, ReportSink, StorageError, StorageResult,
};
pub use ordercache_storage::{DurableStore, InMemoryDurableStore, OrderService};

use async_trait::async_trait;
use proptest::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

// ============================================================================
// FIXTURES
// ============================================================================

/// A realistic order document carrying `uid`.
pub fn sample_order_json(uid: &str) -> String {
    serde_json::json!({
        "order_uid": uid,
        "track_number": "WBILMTESTTRACK",
        "entry": "WBIL",
        "delivery": {
            "name": "Test Testov",
            "phone": "+9720000000",
            "zip": "2639809",
            "city": "Kiryat Mozkin",
            "address": "Ploshad Mira 15",
            "region": "Kraiot",
            "email": "test@gmail.com"
        },
        "payment": {
            "transaction": uid,
            "currency": "USD",
            "provider": "wbpay",
            "amount": 1817,
            "payment_dt": 1637907727,
            "bank": "alpha",
            "delivery_cost": 1500,
            "goods_total": 317,
            "custom_fee": 0
        },
        "items": [{
            "chrt_id": 9934930,
            "track_number": "WBILMTESTTRACK",
            "price": 453,
            "name": "Mascaras",
            "sale": 30,
            "size": "0",
            "total_price": 317,
            "nm_id": 2389212,
            "brand": "Vivienne Sabo",
            "status": 202
        }],
        "locale": "en",
        "customer_id": "test",
        "delivery_service": "meest",
        "shardkey": "9",
        "sm_id": 99,
        "date_created": "2021-11-26T06:22:19Z",
        "oof_shard": "1"
    })
    .to_string()
}

/// Build an order whose payload is [`sample_order_json`].
pub fn sample_order(uid: &str) -> Order {
    let uid = OrderUid::new(uid).unwrap_or_else(|e| panic!("invalid fixture uid: {}", e));
    let data = sample_order_json(uid.as_str());
    Order::new(uid, data)
}

/// Build an order from a raw payload, panicking on invalid fixture input.
pub fn order(uid: &str, data: &str) -> Order {
    let uid = OrderUid::new(uid).unwrap_or_else(|e| panic!("invalid fixture uid: {}", e));
    Order::new(uid, data)
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

/// Strategy for generating order UIDs.
pub fn uid_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        // Hex-ish identifiers like the ones the upstream publisher emits
        "[a-f0-9]{19}",
        // Mixed alphanumeric
        "[A-Za-z0-9]{1,40}",
        // Edge case: single character
        Just("x".to_string()),
    ]
}

/// Strategy for generating valid order payloads paired with their UID.
pub fn order_payload_strategy() -> impl Strategy<Value = (String, String)> {
    (uid_strategy(), "[a-zA-Z ]{0,30}", 0u32..1_000_000).prop_map(|(uid, name, amount)| {
        let payload = serde_json::json!({
            "order_uid": uid,
            "delivery": { "name": name },
            "payment": { "amount": amount },
        })
        .to_string();
        (uid, payload)
    })
}

/// Strategy for generating payloads the validator must reject.
pub fn malformed_payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        // Truncated or broken JSON
        Just(b"{bad".to_vec()),
        Just(b"".to_vec()),
        "[a-z{}:,]{1,20}".prop_filter_map("must not parse", |s| {
            serde_json::from_str::<serde_json::Value>(&s)
                .is_err()
                .then(|| s.into_bytes())
        }),
        // Well-formed, wrong shape
        Just(b"[]".to_vec()),
        Just(b"42".to_vec()),
        Just(br#"{"uid":"x"}"#.to_vec()),
        Just(br#"{"order_uid":""}"#.to_vec()),
        Just(br#"{"order_uid":17}"#.to_vec()),
    ]
}

// ============================================================================
// SCRIPTED DURABLE STORE
// ============================================================================

/// Durable store wrapper that records calls and fails or stalls on demand.
///
/// Cloning shares state, so a test can keep a handle and flip failure modes
/// while the store is owned by a service.
#[derive(Debug, Clone, Default)]
pub struct ScriptedStore {
    inner: InMemoryDurableStore,
    state: Arc<ScriptState>,
}

#[derive(Debug, Default)]
struct ScriptState {
    persisted: Mutex<Vec<Order>>,
    load_calls: AtomicU64,
    fail_load: AtomicBool,
    fail_persist: AtomicBool,
    persist_delay_ms: AtomicU64,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `orders`.
    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        Self {
            inner: InMemoryDurableStore::with_orders(orders),
            state: Arc::default(),
        }
    }

    pub fn fail_load(&self, fail: bool) {
        self.state.fail_load.store(fail, Ordering::SeqCst);
    }

    pub fn fail_persist(&self, fail: bool) {
        self.state.fail_persist.store(fail, Ordering::SeqCst);
    }

    /// Delay every subsequent persist call by `delay`.
    pub fn persist_delay(&self, delay: Duration) {
        self.state
            .persist_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Every order passed to `persist`, successful or not, in call order.
    pub fn persist_calls(&self) -> Vec<Order> {
        self.persisted().clone()
    }

    pub fn load_calls(&self) -> u64 {
        self.state.load_calls.load(Ordering::SeqCst)
    }

    /// The authoritative contents, bypassing any cache.
    pub fn stored(&self) -> &InMemoryDurableStore {
        &self.inner
    }

    fn persisted(&self) -> MutexGuard<'_, Vec<Order>> {
        match self.state.persisted.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl DurableStore for ScriptedStore {
    async fn load_all(&self) -> StorageResult<Vec<Order>> {
        self.state.load_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_load.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable {
                reason: "scripted load failure".to_string(),
            });
        }
        self.inner.load_all().await
    }

    async fn persist(&self, order: &Order) -> StorageResult<()> {
        self.persisted().push(order.clone());

        let delay_ms = self.state.persist_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        if self.state.fail_persist.load(Ordering::SeqCst) {
            return Err(StorageError::PersistFailed {
                uid: order.uid.clone(),
                reason: "scripted persist failure".to_string(),
            });
        }
        self.inner.persist(order).await
    }

    async fn ping(&self) -> StorageResult<()> {
        if self.state.fail_load.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable {
                reason: "scripted ping failure".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// RECORDING REPORT SINK
// ============================================================================

/// One event captured by [`RecordingReportSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    WarmupCompleted { loaded: usize, distinct: usize },
    WarmupFailed(StorageError),
    Accepted(OrderUid),
    Rejected(IngestError),
}

/// Report sink that keeps every event for later assertions.
#[derive(Debug, Default)]
pub struct RecordingReportSink {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReportSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.lock().clone()
    }

    pub fn accepted(&self) -> Vec<OrderUid> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                ReportEvent::Accepted(uid) => Some(uid.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn rejected(&self) -> Vec<IngestError> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                ReportEvent::Rejected(err) => Some(err.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ReportEvent>> {
        match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl ReportSink for RecordingReportSink {
    fn warmup_completed(&self, loaded: usize, distinct: usize, _elapsed: Duration) {
        self.lock()
            .push(ReportEvent::WarmupCompleted { loaded, distinct });
    }

    fn warmup_failed(&self, error: &StorageError) {
        self.lock().push(ReportEvent::WarmupFailed(error.clone()));
    }

    fn message_accepted(&self, uid: &OrderUid) {
        self.lock().push(ReportEvent::Accepted(uid.clone()));
    }

    fn message_rejected(&self, error: &IngestError) {
        self.lock().push(ReportEvent::Rejected(error.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_order_validates() {
        let json = sample_order_json("b563feb7b2b84b6test");
        let order = validate(json.as_bytes()).unwrap();
        assert_eq!(order.uid.as_str(), "b563feb7b2b84b6test");
    }

    proptest! {
        #[test]
        fn prop_generated_payloads_validate((uid, payload) in order_payload_strategy()) {
            let order = validate(payload.as_bytes()).unwrap();
            prop_assert_eq!(order.uid.as_str(), uid.as_str());
        }

        #[test]
        fn prop_malformed_payloads_are_rejected(payload in malformed_payload_strategy()) {
            prop_assert!(validate(&payload).is_err());
        }
    }
}
