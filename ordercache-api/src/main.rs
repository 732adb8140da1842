//! ordercache Server Entry Point
//!
//! Startup order matters: configuration, logging, durable store, warm-up.
//! Only a fully warmed cache is served, and only then does ingestion start.

use std::sync::Arc;

use ordercache_api::config::{AppConfig, SourceKind, StoreKind};
use ordercache_api::ingest::{ConsumerConfig, LineSource, StreamConsumer};
use ordercache_api::telemetry::init_tracing;
use ordercache_api::{create_router, ApiError, ApiResult, AppState, PgOrderStore, SharedStore};
use ordercache_core::{ReportSink, TracingReportSink};
use ordercache_storage::{InMemoryDurableStore, OrderService};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> ApiResult<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.logger)?;

    let store = build_store(&config).await?;
    let reporter: Arc<dyn ReportSink> = Arc::new(TracingReportSink);
    let service = Arc::new(OrderService::with_reporter(store, Arc::clone(&reporter)));

    let warmup = service.init(config.ingest.warmup_timeout()).await?;
    tracing::info!(
        loaded = warmup.loaded,
        distinct = warmup.distinct,
        "Cache ready"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer = match config.ingest.source {
        SourceKind::Stdin => {
            let consumer = StreamConsumer::new(
                Arc::clone(&service),
                reporter,
                ConsumerConfig::from(&config.ingest),
            );
            let source = LineSource::new(tokio::io::BufReader::new(tokio::io::stdin()));
            Some(tokio::spawn(consumer.run(source, shutdown_rx.clone())))
        }
        SourceKind::None => {
            tracing::info!("No message source configured; serving warmed-up data only");
            None
        }
    };

    let app = create_router(AppState::new(service), &config.server);
    let addr = config.server.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;
    tracing::info!(%addr, "Starting ordercache server");

    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(wait_for_shutdown(shutdown_rx))
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    let drain = async {
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Server error"),
            Err(e) => tracing::error!(error = %e, "Server task failed"),
        }
        if let Some(consumer) = consumer {
            if let Err(e) = consumer.await {
                tracing::error!(error = %e, "Stream consumer task failed");
            }
        }
    };
    if tokio::time::timeout(config.server.shutdown_timeout(), drain)
        .await
        .is_err()
    {
        tracing::warn!(
            timeout_secs = config.server.shutdown_timeout_secs,
            "Shutdown drain timed out; abandoning in-flight work"
        );
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn build_store(config: &AppConfig) -> ApiResult<SharedStore> {
    match config.ingest.store {
        StoreKind::Postgres => {
            let store = PgOrderStore::from_config(&config.postgres)?;
            if config.postgres.ensure_schema {
                store.ensure_schema().await?;
            }
            tracing::info!(
                host = %config.postgres.host,
                port = config.postgres.port,
                dbname = %config.postgres.dbname,
                "Using PostgreSQL durable store"
            );
            Ok(Arc::new(store))
        }
        StoreKind::Memory => {
            tracing::warn!("Using in-memory durable store; orders are lost on exit");
            Ok(Arc::new(InMemoryDurableStore::new()))
        }
    }
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            break;
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("Shutdown signal received");
}
