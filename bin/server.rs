// Supermarket Dashboard - Web Server
// Serves the five dashboard views as JSON

use anyhow::{Context, Result};
use std::sync::Arc;
use supermarket_dashboard::config::{get_dataset_path, load_config};
use supermarket_dashboard::logging::{self, LogTarget};
use supermarket_dashboard::{api, Dashboard, DatasetStore};

#[tokio::main]
async fn main() -> Result<()> {
    logging::initialize(LogTarget::Stderr)?;

    let config = load_config()?;
    let csv_path = get_dataset_path(&config);

    let store = DatasetStore::from_csv(&csv_path)
        .with_context(|| format!("Failed to load dataset from {}", csv_path.display()))?;
    let dashboard = Dashboard::with_trend_settings(Arc::new(store), config.trend.settings()?);

    let app = api::router(Arc::new(dashboard));

    let addr = config.server.addr.as_str();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Server running on http://{}", addr);
    tracing::info!("   API: http://{}/api/dashboard?gender=Male&city=Yangon", addr);

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
