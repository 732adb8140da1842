//! ordercache API - HTTP Surface, Stream Ingestion and PostgreSQL Storage
//!
//! Wires the write-through [`OrderService`](ordercache_storage::OrderService)
//! to the outside world:
//!
//! - `db`: PostgreSQL durable store over a deadpool connection pool
//! - `ingest`: message sources and the stream consumer
//! - `routes`: read-only HTTP endpoints, health probes and metrics
//! - `config` / `telemetry`: process configuration, logging and metrics

pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use config::{
    AppConfig, ConfigError, IngestConfig, LogFormat, LoggerConfig, PostgresConfig, ServerConfig,
    SourceKind, StoreKind,
};
pub use db::PgOrderStore;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::create_router;
pub use state::{AppService, AppState, SharedStore};
