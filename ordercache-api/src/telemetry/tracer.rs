//! Tracing Subscriber Initialization
//!
//! Installs the process-wide subscriber exactly once, from the binary.
//! Library code only emits events.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggerConfig};
use crate::error::{ApiError, ApiResult};

/// Filter used when `RUST_LOG` is unset.
///
/// The configured level applies to the ordercache crates and everything
/// else; request spans from tower-http stay at `info`.
pub fn default_filter(level: &str) -> String {
    format!(
        "ordercache_api={level},ordercache_storage={level},ordercache_core={level},\
         tower_http=info,{level}"
    )
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins over `logger.level` when both are present.
pub fn init_tracing(config: &LoggerConfig) -> ApiResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&config.level)));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Text => registry.with(fmt::layer()).try_init(),
    };
    result.map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        level = %config.level,
        format = ?config.format,
        "Logging initialized"
    );

    Ok(())
}
