//! Process Configuration Module
//!
//! Configuration comes from one of two places:
//! - a YAML file whose path is in `ORDERCACHE_CONFIG`
//! - environment variables with development defaults (`from_env`)
//!
//! Either way the result is checked by [`AppConfig::validate`] before use.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the YAML config path.
pub const CONFIG_PATH_ENV: &str = "ORDERCACHE_CONFIG";

// ============================================================================
// ERRORS
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, value: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// ENUMS
// ============================================================================

/// Which durable store backs the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Postgres,
    /// In-process store; contents are lost on exit.
    Memory,
}

impl FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::invalid(
                "ingest.store",
                s,
                "expected 'postgres' or 'memory'",
            )),
        }
    }
}

/// Where inbound order messages come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// One JSON document per line on standard input.
    Stdin,
    /// No built-in source; the HTTP surface only serves warmed-up data.
    None,
}

impl FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stdin" => Ok(Self::Stdin),
            "none" => Ok(Self::None),
            _ => Err(ConfigError::invalid(
                "ingest.source",
                s,
                "expected 'stdin' or 'none'",
            )),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::invalid(
                "logger.format",
                s,
                "expected 'text' or 'json'",
            )),
        }
    }
}

// ============================================================================
// SECTIONS
// ============================================================================

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Grace period for in-flight work on shutdown, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 10,
            shutdown_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    /// Create ServerConfig from environment variables.
    ///
    /// - `ORDERCACHE_BIND` (default: 0.0.0.0:8080)
    /// - `ORDERCACHE_REQUEST_TIMEOUT_SECS` (default: 10)
    /// - `ORDERCACHE_SHUTDOWN_TIMEOUT_SECS` (default: 10)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind: std::env::var("ORDERCACHE_BIND").unwrap_or(defaults.bind),
            request_timeout_secs: std::env::var("ORDERCACHE_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
            shutdown_timeout_secs: std::env::var("ORDERCACHE_SHUTDOWN_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.shutdown_timeout_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Parse the bind address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|e| ConfigError::invalid("server.bind", &self.bind, format!("{}", e)))
    }
}

/// PostgreSQL connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    #[serde(alias = "username")]
    pub user: String,
    pub password: String,
    #[serde(alias = "db_name")]
    pub dbname: String,
    /// Only `disable` and `prefer` are accepted; connections are plaintext.
    pub ssl_mode: String,
    /// Maximum pool size.
    pub pool_size: usize,
    /// Connection and pool wait timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Create the `orders` table at startup if it is missing.
    pub ensure_schema: bool,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            dbname: "orders".to_string(),
            ssl_mode: "disable".to_string(),
            pool_size: 16,
            connect_timeout_secs: 30,
            ensure_schema: false,
        }
    }
}

impl PostgresConfig {
    /// Create PostgresConfig from environment variables.
    ///
    /// - `ORDERCACHE_DB_HOST` (default: localhost)
    /// - `ORDERCACHE_DB_PORT` (default: 5432)
    /// - `ORDERCACHE_DB_USER` (default: postgres)
    /// - `ORDERCACHE_DB_PASSWORD` (default: empty)
    /// - `ORDERCACHE_DB_NAME` (default: orders)
    /// - `ORDERCACHE_DB_SSL_MODE` (default: disable)
    /// - `ORDERCACHE_DB_POOL_SIZE` (default: 16)
    /// - `ORDERCACHE_DB_TIMEOUT` (default: 30)
    /// - `ORDERCACHE_DB_ENSURE_SCHEMA` (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("ORDERCACHE_DB_HOST").unwrap_or(defaults.host),
            port: std::env::var("ORDERCACHE_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            user: std::env::var("ORDERCACHE_DB_USER").unwrap_or(defaults.user),
            password: std::env::var("ORDERCACHE_DB_PASSWORD").unwrap_or_default(),
            dbname: std::env::var("ORDERCACHE_DB_NAME").unwrap_or(defaults.dbname),
            ssl_mode: std::env::var("ORDERCACHE_DB_SSL_MODE").unwrap_or(defaults.ssl_mode),
            pool_size: std::env::var("ORDERCACHE_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.pool_size),
            connect_timeout_secs: std::env::var("ORDERCACHE_DB_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.connect_timeout_secs),
            ensure_schema: std::env::var("ORDERCACHE_DB_ENSURE_SCHEMA")
                .ok()
                .map(|s| s.to_lowercase() == "true")
                .unwrap_or(defaults.ensure_schema),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Stream ingestion and warm-up settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub source: SourceKind,
    pub store: StoreKind,
    /// Maximum messages handled concurrently.
    pub max_in_flight: usize,
    /// Deadline for persisting one message, in seconds.
    pub message_timeout_secs: u64,
    /// Deadline for the startup warm-up, in seconds.
    pub warmup_timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Stdin,
            store: StoreKind::Postgres,
            max_in_flight: 64,
            message_timeout_secs: 5,
            warmup_timeout_secs: 30,
        }
    }
}

impl IngestConfig {
    /// Create IngestConfig from environment variables.
    ///
    /// Unparseable enum values surface as errors instead of silently falling
    /// back to the default.
    ///
    /// - `ORDERCACHE_SOURCE` (default: stdin)
    /// - `ORDERCACHE_STORE` (default: postgres)
    /// - `ORDERCACHE_MAX_IN_FLIGHT` (default: 64)
    /// - `ORDERCACHE_MESSAGE_TIMEOUT_SECS` (default: 5)
    /// - `ORDERCACHE_WARMUP_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            source: std::env::var("ORDERCACHE_SOURCE")
                .ok()
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or(defaults.source),
            store: std::env::var("ORDERCACHE_STORE")
                .ok()
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or(defaults.store),
            max_in_flight: std::env::var("ORDERCACHE_MAX_IN_FLIGHT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_in_flight),
            message_timeout_secs: std::env::var("ORDERCACHE_MESSAGE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.message_timeout_secs),
            warmup_timeout_secs: std::env::var("ORDERCACHE_WARMUP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.warmup_timeout_secs),
        })
    }

    pub fn message_timeout(&self) -> Duration {
        Duration::from_secs(self.message_timeout_secs)
    }

    pub fn warmup_timeout(&self) -> Duration {
        Duration::from_secs(self.warmup_timeout_secs)
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Default filter level when `RUST_LOG` is unset.
    pub level: String,
    #[serde(alias = "handler")]
    pub format: LogFormat,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl LoggerConfig {
    /// Create LoggerConfig from environment variables.
    ///
    /// - `ORDERCACHE_LOG_LEVEL` (default: info)
    /// - `ORDERCACHE_LOG_FORMAT` (default: text)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            level: std::env::var("ORDERCACHE_LOG_LEVEL").unwrap_or(defaults.level),
            format: std::env::var("ORDERCACHE_LOG_FORMAT")
                .ok()
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or(defaults.format),
        })
    }
}

// ============================================================================
// APP CONFIGURATION
// ============================================================================

/// Complete process configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub postgres: PostgresConfig,
    pub ingest: IngestConfig,
    pub logger: LoggerConfig,
}

impl AppConfig {
    /// Load configuration from `ORDERCACHE_CONFIG` if set, otherwise from the
    /// environment, and validate it.
    pub fn load() -> Result<Self, ConfigError> {
        let config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_yaml_file(path)?,
            _ => Self::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig::from_env(),
            postgres: PostgresConfig::from_env(),
            ingest: IngestConfig::from_env()?,
            logger: LoggerConfig::from_env()?,
        })
    }

    /// Read configuration from a YAML file. Missing keys take defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject values the process cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.bind_addr()?;
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "server.request_timeout_secs",
                0,
                "must be greater than zero",
            ));
        }

        if self.ingest.max_in_flight == 0 {
            return Err(ConfigError::invalid(
                "ingest.max_in_flight",
                0,
                "must be greater than zero",
            ));
        }
        if self.ingest.message_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "ingest.message_timeout_secs",
                0,
                "must be greater than zero",
            ));
        }
        if self.ingest.warmup_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "ingest.warmup_timeout_secs",
                0,
                "must be greater than zero",
            ));
        }

        if self.ingest.store == StoreKind::Postgres {
            if self.postgres.pool_size == 0 {
                return Err(ConfigError::invalid(
                    "postgres.pool_size",
                    0,
                    "must be greater than zero",
                ));
            }
            match self.postgres.ssl_mode.to_lowercase().as_str() {
                "disable" | "prefer" => {}
                other => {
                    return Err(ConfigError::invalid(
                        "postgres.ssl_mode",
                        other,
                        "TLS is not supported, use 'disable'",
                    ));
                }
            }
        }

        tracing_subscriber::EnvFilter::try_new(&self.logger.level).map_err(|e| {
            ConfigError::invalid("logger.level", &self.logger.level, e.to_string())
        })?;

        Ok(())
    }
}
