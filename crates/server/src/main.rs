use anyhow::Context;
use rectotal_server::{router, telemetry, AppState, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load()?;
    telemetry::init_tracing(config.log_format)?;

    let state = AppState::from_config(&config).context("Failed to set up the OCR backend")?;
    tracing::info!(
        keyword_mode = %config.extraction.keyword_mode,
        staging_dir = %state.staging.dir().display(),
        "receipt pipeline ready"
    );

    let app = router(state, config.max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
    }
    tracing::info!("Shutting down");
}
