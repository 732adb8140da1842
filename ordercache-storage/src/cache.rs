//! Full-mirror in-memory order cache.
//!
//! Every order ever persisted stays resident for the life of the process:
//! there is no TTL, no capacity bound and no eviction. Memory grows with the
//! number of distinct UIDs. Bounding it is out of scope.
//!
//! The lock and the map are private. Collaborators only see [`CacheStore::get`],
//! [`CacheStore::set`] and [`CacheStore::len`], and the lock is held for the map
//! operation alone, never across I/O or an `.await`.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use ordercache_core::{OrderData, OrderUid};

/// Concurrent UID → payload mapping with shared readers and exclusive writers.
#[derive(Debug, Default)]
pub struct CacheStore {
    orders: RwLock<HashMap<OrderUid, OrderData>>,
}

impl CacheStore {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the payload for `uid`. Never fails.
    pub fn set(&self, uid: OrderUid, data: OrderData) {
        self.write().insert(uid, data);
    }

    /// Look up the payload for `uid`.
    ///
    /// The returned [`OrderData`] is a shared handle to an immutable buffer,
    /// so the caller always gets either the previous or the new payload in
    /// full.
    pub fn get(&self, uid: &str) -> Option<OrderData> {
        self.read().get(uid).cloned()
    }

    /// Number of cached orders.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A writer cannot leave the map half-updated (the critical section is a
    // single insert), so a poisoned lock is safe to keep using.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<OrderUid, OrderData>> {
        match self.orders.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Order cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<OrderUid, OrderData>> {
        match self.orders.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Order cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}
