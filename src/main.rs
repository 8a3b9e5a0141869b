//! Region Extract Server
//!
//! Returns the OCR text or a cropped image of a region of a document page
//! stored in S3.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use region_extract_server::config::Config;
use region_extract_server::routes;
use region_extract_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "region_extract_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Invalid configuration")?;

    tracing::info!("Starting Region Extract Server v{}", env!("CARGO_PKG_VERSION"));
    if let Some(endpoint) = &config.aws.s3_endpoint {
        tracing::info!("S3 endpoint: {}", endpoint);
    }
    tracing::info!(
        "OCR poll interval: {}s, render scale: {}",
        config.ocr.poll_interval_secs,
        config.render.scale
    );

    // Flipped to true on shutdown; in-flight OCR polls observe it and stop
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let app_state = AppState::connect(config, shutdown_rx).await;

    let addr: SocketAddr = format!(
        "{}:{}",
        app_state.config().server.host,
        app_state.config().server.port
    )
    .parse()
    .context("Invalid server address")?;

    let app = routes::app(app_state);

    tracing::info!("Region Extract Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
