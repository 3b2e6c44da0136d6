use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use factsheet::app;
use factsheet::config::{FactsheetConfig, ServerConfig};
use factsheet::logging::{init_logging, LoggingConfig};
use factsheet::services::fonts::chart_fonts_available;
use factsheet::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env())?;

    let server = ServerConfig::from_env()
        .map_err(anyhow::Error::msg)
        .context("Invalid server configuration")?;
    let config = FactsheetConfig::from_env()
        .map_err(anyhow::Error::msg)
        .context("Invalid factsheet configuration")?;

    info!(
        "🧾 Factsheet layout {:?}, required columns: {}",
        config.schema.layout,
        config.schema.required_columns.join(", ")
    );

    // Scans system fonts once so the first request does not pay for it.
    tokio::task::spawn_blocking(chart_fonts_available).await?;

    let state = AppState::new(config, server.max_upload_bytes);
    let app = app::create_app(state);

    let listener = TcpListener::bind(server.addr)
        .await
        .with_context(|| format!("Failed to bind {}", server.addr))?;
    info!("🚀 Factsheet backend running at http://{}/", server.addr);
    axum::serve(listener, app).await?;

    Ok(())
}
