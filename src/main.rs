use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use truthlens_core::{
    api,
    config::{Config, StoreBackend},
    sled_store::SledStore,
    store::{AnalysisStore, MemoryStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ----------------------------------------------------------------
    // 0. Logging & configuration
    // ----------------------------------------------------------------
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "truthlens_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        addr = %config.bind_addr(),
        backend = ?config.store_backend,
        ml_service = config.ml_service_url.as_deref().unwrap_or("none"),
        "configuration loaded"
    );

    // ----------------------------------------------------------------
    // 1. Analysis store
    // ----------------------------------------------------------------
    let store: Arc<dyn AnalysisStore> = match config.store_backend {
        StoreBackend::Memory => {
            tracing::info!("📚 analysis history kept in memory");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Sled => {
            tracing::info!(path = %config.db_path, "📚 analysis history persisted with sled");
            Arc::new(SledStore::open(&config.db_path)?)
        }
    };

    // ----------------------------------------------------------------
    // 2. HTTP service
    // ----------------------------------------------------------------
    let addr = config.bind_addr();
    let state = Arc::new(api::AppState::new(store, config)?);
    let app = api::app(state);

    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("🚀 API listening on http://{}", addr);
    tracing::info!("   - POST /api/analyze   : score an article");
    tracing::info!("   - GET  /api/stats     : verdict totals");
    tracing::info!("   - GET  /api/analyses  : recent analyses");
    tracing::info!("   - GET  /api/ml/status : trained-model service status");

    axum::serve(listener, app).await?;

    Ok(())
}
