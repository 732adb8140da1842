//! PostgreSQL Durable Store
//!
//! Connection pooling via deadpool-postgres and the [`DurableStore`]
//! implementation backed by a single `orders` table:
//!
//! ```sql
//! CREATE TABLE orders (uid TEXT PRIMARY KEY, data BYTEA NOT NULL)
//! ```
//!
//! Payloads are stored as raw bytes so they come back exactly as received.

use std::time::Instant;

use async_trait::async_trait;
use deadpool_postgres::{
    Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime, Timeouts,
};
use ordercache_core::{Order, OrderUid, StorageError, StorageResult};
use ordercache_storage::DurableStore;
use tokio_postgres::NoTls;

use crate::config::PostgresConfig;
use crate::error::{ApiError, ApiResult};
use crate::telemetry::metrics;

const SELECT_ALL: &str = "SELECT uid, data FROM orders";

const UPSERT: &str = "INSERT INTO orders (uid, data) VALUES ($1, $2) \
     ON CONFLICT (uid) DO UPDATE SET data = EXCLUDED.data";

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS orders (\
     uid TEXT PRIMARY KEY CHECK (uid <> ''), \
     data BYTEA NOT NULL)";

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

impl PostgresConfig {
    /// Create a connection pool from this configuration.
    ///
    /// No connection is opened here; the first query does that.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.connect_timeout = Some(self.connect_timeout());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(PoolConfig {
            max_size: self.pool_size,
            timeouts: Timeouts {
                wait: Some(self.connect_timeout()),
                create: Some(self.connect_timeout()),
                recycle: None,
            },
            ..Default::default()
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// ORDER STORE
// ============================================================================

/// [`DurableStore`] over a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: Pool,
}

impl PgOrderStore {
    /// Create a store with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a store from configuration.
    pub fn from_config(config: &PostgresConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    /// Create the `orders` table if it does not exist.
    pub async fn ensure_schema(&self) -> StorageResult<()> {
        let conn = self.get_conn().await?;
        conn.batch_execute(CREATE_TABLE)
            .await
            .map_err(|e| StorageError::Unavailable {
                reason: db_reason("create schema", &e),
            })?;
        tracing::info!("Ensured orders table exists");
        Ok(())
    }

    async fn get_conn(&self) -> StorageResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(|e| {
            tracing::error!("Connection pool error: {:?}", e);
            StorageError::Unavailable {
                reason: format!("failed to acquire connection: {}", e),
            }
        })
    }
}

#[async_trait]
impl DurableStore for PgOrderStore {
    async fn load_all(&self) -> StorageResult<Vec<Order>> {
        let start = Instant::now();
        let result = async {
            let conn = self.get_conn().await?;
            let stmt = conn
                .prepare_cached(SELECT_ALL)
                .await
                .map_err(|e| StorageError::LoadFailed {
                    reason: db_reason("prepare load", &e),
                })?;
            let rows = conn
                .query(&stmt, &[])
                .await
                .map_err(|e| StorageError::LoadFailed {
                    reason: db_reason("load orders", &e),
                })?;

            rows.iter()
                .map(|row| -> StorageResult<Order> {
                    let uid: String = row.try_get(0).map_err(|e| StorageError::LoadFailed {
                        reason: db_reason("decode uid", &e),
                    })?;
                    let data: Vec<u8> = row.try_get(1).map_err(|e| StorageError::LoadFailed {
                        reason: db_reason("decode data", &e),
                    })?;
                    let uid = OrderUid::new(uid).map_err(|e| StorageError::LoadFailed {
                        reason: format!("stored row has invalid uid: {}", e),
                    })?;
                    Ok(Order::new(uid, data))
                })
                .collect::<StorageResult<Vec<_>>>()
        }
        .await;

        metrics::record_db_operation("load_all", result.is_ok(), start.elapsed().as_secs_f64());
        result
    }

    async fn persist(&self, order: &Order) -> StorageResult<()> {
        let start = Instant::now();
        let result = async {
            let conn = self.get_conn().await?;
            let persist_failed = |e: tokio_postgres::Error| StorageError::PersistFailed {
                uid: order.uid.clone(),
                reason: db_reason("persist order", &e),
            };
            let stmt = conn.prepare_cached(UPSERT).await.map_err(persist_failed)?;
            conn.execute(&stmt, &[&order.uid.as_str(), &order.data.as_bytes()])
                .await
                .map_err(persist_failed)?;
            Ok::<(), StorageError>(())
        }
        .await;

        metrics::record_db_operation("persist", result.is_ok(), start.elapsed().as_secs_f64());
        result
    }

    async fn ping(&self) -> StorageResult<()> {
        let conn = self.get_conn().await?;

        // Simple query to verify connectivity
        conn.query_one("SELECT 1", &[])
            .await
            .map_err(|e| StorageError::Unavailable {
                reason: db_reason("ping", &e),
            })?;

        Ok(())
    }
}

/// Log the full driver error and keep a one-line reason for the caller.
fn db_reason(operation: &str, err: &tokio_postgres::Error) -> String {
    tracing::error!(operation, "Database error: {:?}", err);
    match err.as_db_error() {
        Some(db) => format!("{}: {}", operation, db.message()),
        None => format!("{}: {}", operation, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_targets_uid_conflict() {
        assert!(UPSERT.contains("ON CONFLICT (uid)"));
        assert!(UPSERT.contains("EXCLUDED.data"));
    }

    #[tokio::test]
    async fn test_create_pool_is_lazy() -> ApiResult<()> {
        // Nothing listens here; pool creation must still succeed.
        let config = PostgresConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..Default::default()
        };
        let store = PgOrderStore::from_config(&config)?;
        assert_eq!(store.pool_size(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_database_is_unavailable() -> ApiResult<()> {
        let config = PostgresConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            connect_timeout_secs: 1,
            ..Default::default()
        };
        let store = PgOrderStore::from_config(&config)?;

        let err = store.ping().await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable { .. }));
        let err = store.load_all().await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable { .. }));
        Ok(())
    }
}
