use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::signal;

use microtemplate::config::Settings;
use microtemplate::server::{create_app, AppState};
use microtemplate::telemetry::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing
    init_logging(&settings.log)?;
    tracing::info!("Configuration loaded");

    // Create application state
    let state = AppState::new(settings.clone());

    // Preload templates from disk
    if let Some(dir) = &settings.templates.dir {
        let loaded = state
            .template_store
            .load_dir(dir, &settings.templates.extension)
            .with_context(|| format!("Failed to load templates from {}", dir))?;
        tracing::info!(dir = %dir, loaded, "Templates preloaded");
    }
    tracing::info!(escape = ?settings.templates.escape, "Application state initialized");

    // Create Axum app
    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal_handler() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
