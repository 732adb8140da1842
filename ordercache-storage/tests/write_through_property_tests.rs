//! Property-Based Tests for the Write-Through Order Service
//!
//! For any set of valid orders, the service SHALL:
//! - persist before caching, and serve exactly the persisted bytes
//! - never cache an order whose persist failed
//! - after warm-up, serve every stored record and nothing else
//! - resolve repeated writes to one UID to the last accepted payload

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ordercache_storage::OrderService;
use ordercache_test_utils::{
    order, order_payload_strategy, validate, NoopReportSink, ScriptedStore,
};
use proptest::prelude::*;
use tokio::runtime::Runtime;

const DEADLINE: Duration = Duration::from_secs(5);

// ============================================================================
// TEST CONFIGURATION
// ============================================================================

fn test_runtime() -> Result<Runtime, TestCaseError> {
    Runtime::new().map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

fn service(store: ScriptedStore) -> OrderService<ScriptedStore> {
    OrderService::with_reporter(store, Arc::new(NoopReportSink))
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// After `set` succeeds, persist saw the exact order and `get` returns
    /// the exact bytes.
    #[test]
    fn prop_write_through_ordering((_, payload) in order_payload_strategy()) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let store = ScriptedStore::new();
            let svc = service(store.clone());
            let accepted = validate(payload.as_bytes())
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            let uid = accepted.uid.clone();

            svc.set(accepted.clone(), DEADLINE)
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;

            prop_assert_eq!(store.persist_calls(), vec![accepted]);
            let cached = svc.get(uid.as_str()).map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(cached.as_bytes(), payload.as_bytes());
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// A failed persist never leaves a trace in the cache.
    #[test]
    fn prop_failure_containment((uid, payload) in order_payload_strategy()) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let store = ScriptedStore::new();
            store.fail_persist(true);
            let svc = service(store.clone());

            let result = svc.set(order(&uid, &payload), DEADLINE).await;
            prop_assert!(result.is_err());
            prop_assert_eq!(store.persist_calls().len(), 1);
            prop_assert!(svc.get(&uid).unwrap_err().is_not_found());
            prop_assert!(store.stored().is_empty());
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Warm-up over N distinct records makes exactly N keys retrievable.
    #[test]
    fn prop_warmup_completeness(
        records in proptest::collection::hash_map("[a-z0-9]{1,16}", "[ -~]{0,64}", 0..50)
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let store = ScriptedStore::with_orders(
                records.iter().map(|(uid, data)| order(uid, data)),
            );
            let svc = service(store);

            let report = svc.init(DEADLINE).await.map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(report.loaded, records.len());
            prop_assert_eq!(svc.cached_len(), records.len());

            for (uid, data) in &records {
                let cached = svc.get(uid).map_err(|e| TestCaseError::fail(e.to_string()))?;
                prop_assert_eq!(cached.as_bytes(), data.as_bytes());
            }
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Sequential writes to one UID resolve to the last payload.
    #[test]
    fn prop_idempotent_overwrite(
        uid in "[a-z0-9]{1,16}",
        payloads in proptest::collection::vec("[ -~]{0,32}", 1..8),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let store = ScriptedStore::new();
            let svc = service(store.clone());

            for data in &payloads {
                svc.set(order(&uid, data), DEADLINE)
                    .await
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
            }

            let last = payloads.last().map(String::as_bytes).unwrap_or_default();
            let cached = svc.get(&uid).map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(cached.as_bytes(), last);
            prop_assert_eq!(svc.cached_len(), 1);
            prop_assert_eq!(store.stored().len(), 1);
            Ok::<(), TestCaseError>(())
        })?;
    }
}

// ============================================================================
// CONCURRENCY
// ============================================================================

/// Readers racing a writer see either the old or the new payload, whole.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reads_during_writes_are_never_torn() {
    let old = "o".repeat(8192);
    let new = "n".repeat(8192);
    let svc = Arc::new(service(ScriptedStore::with_orders([order("k", &old)])));
    svc.init(DEADLINE).await.unwrap();

    let mut readers = Vec::new();
    for _ in 0..8 {
        let svc = Arc::clone(&svc);
        let (old, new) = (old.clone(), new.clone());
        readers.push(tokio::spawn(async move {
            for _ in 0..500 {
                let seen = svc.get("k").unwrap();
                assert!(seen.as_bytes() == old.as_bytes() || seen.as_bytes() == new.as_bytes());
                tokio::task::yield_now().await;
            }
        }));
    }

    for i in 0..200 {
        let data = if i % 2 == 0 { &new } else { &old };
        svc.set(order("k", data), DEADLINE).await.unwrap();
    }

    for reader in readers {
        reader.await.unwrap();
    }
}

/// Concurrent writers on distinct keys all land; the cache mirrors storage.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_distinct_writes_mirror_storage() {
    let store = ScriptedStore::new();
    let svc = Arc::new(service(store.clone()));

    let writers: Vec<_> = (0..100)
        .map(|i| {
            let svc = Arc::clone(&svc);
            tokio::spawn(async move {
                let uid = format!("order-{}", i);
                svc.set(order(&uid, &format!("{{\"n\":{}}}", i)), DEADLINE).await
            })
        })
        .collect();

    for writer in writers {
        writer.await.unwrap().unwrap();
    }

    assert_eq!(svc.cached_len(), 100);
    assert_eq!(store.stored().len(), 100);
    for i in 0..100 {
        let uid = format!("order-{}", i);
        assert_eq!(
            svc.get(&uid).unwrap().as_bytes(),
            store.stored().get(&uid).unwrap().as_bytes()
        );
    }
}

/// Concurrent writers on the same key: the cache ends on one of the written
/// payloads, and that payload was persisted.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_same_key_writes_settle_on_a_persisted_value() {
    let store = ScriptedStore::new();
    let svc = Arc::new(service(store.clone()));

    let written: HashMap<usize, String> = (0..32).map(|i| (i, format!("v{}", i))).collect();
    let writers: Vec<_> = written
        .values()
        .cloned()
        .map(|data| {
            let svc = Arc::clone(&svc);
            tokio::spawn(async move { svc.set(order("same", &data), DEADLINE).await })
        })
        .collect();
    for writer in writers {
        writer.await.unwrap().unwrap();
    }

    let cached = svc.get("same").unwrap();
    assert!(written.values().any(|v| v.as_bytes() == cached.as_bytes()));
    assert!(store
        .persist_calls()
        .iter()
        .any(|o| o.data.as_bytes() == cached.as_bytes()));
    assert_eq!(svc.cached_len(), 1);
}

/// Empty store, then a write, then nothing else changes it.
#[tokio::test]
async fn test_empty_store_scenario() {
    let svc = service(ScriptedStore::new());
    svc.init(DEADLINE).await.unwrap();
    assert!(svc.get("x").unwrap_err().is_not_found());

    let accepted = validate(br#"{"order_uid":"x","a":1}"#).unwrap();
    svc.set(accepted, DEADLINE).await.unwrap();
    assert_eq!(svc.get("x").unwrap().as_bytes(), br#"{"order_uid":"x","a":1}"#);

    assert!(validate(b"{bad").is_err());
    assert_eq!(svc.get("x").unwrap().as_bytes(), br#"{"order_uid":"x","a":1}"#);
}
