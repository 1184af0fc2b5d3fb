//! consentd — cookie-consent recording and audit service.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod routes;
mod state;
mod validate;

use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("CONSENTD_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    // Initialize configuration
    let config = consentd_core::ConsentdConfig::from_env(&data_dir)?;
    let port = config.port;

    // Initialize store
    let store = consentd_store::ConsentStore::open(&config.data_paths.consentdb)
        .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;

    // Build application state
    let state = Arc::new(AppState::new(config, Arc::new(store)));

    // Build router
    let app = routes::build_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("consentd listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
