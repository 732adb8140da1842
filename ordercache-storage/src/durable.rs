//! Durable store contract.
//!
//! The durable store holds the authoritative copy of every order, one row per
//! UID. The cache is a derived copy that can always be rebuilt from it.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use ordercache_core::{Order, OrderData, OrderUid, StorageError, StorageResult};

/// Authoritative persistent order storage.
///
/// Implementations must be thread-safe. `persist` has upsert semantics:
/// writing the same UID twice overwrites, and repeating an identical write is
/// harmless.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Load every persisted order.
    async fn load_all(&self) -> StorageResult<Vec<Order>>;

    /// Persist one order, overwriting any previous payload for its UID.
    async fn persist(&self, order: &Order) -> StorageResult<()>;

    /// Check that the store is reachable.
    async fn ping(&self) -> StorageResult<()>;
}

#[async_trait]
impl<S: DurableStore + ?Sized> DurableStore for Arc<S> {
    async fn load_all(&self) -> StorageResult<Vec<Order>> {
        (**self).load_all().await
    }

    async fn persist(&self, order: &Order) -> StorageResult<()> {
        (**self).persist(order).await
    }

    async fn ping(&self) -> StorageResult<()> {
        (**self).ping().await
    }
}

// ============================================================================
// IN-MEMORY IMPLEMENTATION
// ============================================================================

/// In-memory durable store for tests and database-less runs.
///
/// Orders are kept sorted by UID so `load_all` is deterministic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDurableStore {
    orders: Arc<RwLock<BTreeMap<OrderUid, OrderData>>>,
}

impl InMemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `orders`.
    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.orders.write() {
            for order in orders {
                map.insert(order.uid, order.data);
            }
        }
        store
    }

    /// Number of persisted orders.
    pub fn len(&self) -> usize {
        self.orders.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch a persisted payload directly, bypassing any cache.
    pub fn get(&self, uid: &str) -> Option<OrderData> {
        self.orders
            .read()
            .ok()
            .and_then(|map| map.get(uid).cloned())
    }
}

fn lock_poisoned() -> StorageError {
    StorageError::Unavailable {
        reason: "in-memory store lock poisoned".to_string(),
    }
}

#[async_trait]
impl DurableStore for InMemoryDurableStore {
    async fn load_all(&self) -> StorageResult<Vec<Order>> {
        let map = self.orders.read().map_err(|_| lock_poisoned())?;
        Ok(map
            .iter()
            .map(|(uid, data)| Order::new(uid.clone(), data.clone()))
            .collect())
    }

    async fn persist(&self, order: &Order) -> StorageResult<()> {
        let mut map = self.orders.write().map_err(|_| lock_poisoned())?;
        map.insert(order.uid.clone(), order.data.clone());
        Ok(())
    }

    async fn ping(&self) -> StorageResult<()> {
        self.orders.read().map(|_| ()).map_err(|_| lock_poisoned())
    }
}
