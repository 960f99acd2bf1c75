use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use notes_service::{app, config::ServerConfig, storage::Storage, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if config.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let location = config.store_location();
    let storage = Arc::new(Storage::open(location.clone()).context("Failed to open store")?);
    tracing::info!(?location, environment = ?config.environment, "store ready");

    let app_state = Arc::new(AppState::new(storage, config.bcrypt_cost));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to port {}", config.port))?;

    tracing::info!("server running on port {}", config.port);

    axum::serve(listener, app(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Failed to start server")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
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
                tracing::error!("failed to install SIGTERM handler: {}", e);
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

    tracing::info!("shutting down");
}
