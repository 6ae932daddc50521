use std::sync::Arc;

use power_monitor_api::config::StoreBackend;
use power_monitor_api::db::create_pool;
use power_monitor_api::repositories::{MemoryReadingStore, PgReadingStore, ReadingStore};
use power_monitor_api::routes::create_router;
use power_monitor_api::services::ReadingsService;
use power_monitor_api::Config;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cfg_path = std::env::var("APP_CONFIG").unwrap_or_else(|_| "config/config.yaml".into());
    let cfg = Config::load(&cfg_path)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Starting power-monitor-api");
    info!(path = %cfg_path, backend = ?cfg.store.backend, "Configuration loaded");

    let store: Arc<dyn ReadingStore> = match cfg.store.backend {
        StoreBackend::Postgres => {
            let db = cfg.database.as_ref().ok_or_else(|| {
                anyhow::anyhow!("store.backend is postgres but no database section or DATABASE_URL")
            })?;
            let pool = create_pool(db).await?;
            let store = PgReadingStore::new(pool);
            store.ensure_schema().await?;
            info!("Connected to database");
            Arc::new(store)
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store; readings are lost on restart");
            Arc::new(MemoryReadingStore::new())
        }
    };

    let service = ReadingsService::new(store);
    let router = create_router(service);

    let addr = cfg.api_bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

    info!("API server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Application shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
