//! ordercache Storage - Cache, Durable Store Contract and Order Service
//!
//! Three layers, leaf-first:
//!
//! - [`CacheStore`]: full-mirror in-memory map guarded by a private lock
//! - [`DurableStore`]: the authoritative store contract, plus an in-memory
//!   implementation for tests and database-less runs
//! - [`OrderService`]: warm-up, write-through and cache-only reads
//!
//! The PostgreSQL implementation of [`DurableStore`] lives in `ordercache-api`.

pub mod cache;
pub mod durable;
pub mod service;

pub use cache::CacheStore;
pub use durable::{DurableStore, InMemoryDurableStore};
pub use service::{OrderService, WarmupReport};
