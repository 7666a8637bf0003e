use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use receptionist::core::booking::{BookingStore, JsonFileBookingStore};
use receptionist::{ServerConfig, routes, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    // Handle CLI arguments
    let mut config_path: Option<PathBuf> = None;
    let mut command: Option<String> = None;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                config_path = Some(PathBuf::from(path));
            }
            "bookings" if command.is_none() => command = Some(arg),
            other => anyhow::bail!(
                "Unknown argument '{other}'. Usage: receptionist [--config <file>] [bookings]"
            ),
        }
    }

    // Load configuration
    let config = match &config_path {
        Some(path) => ServerConfig::from_file(path),
        None => ServerConfig::from_env(),
    }
    .map_err(|e| anyhow!(e.to_string()))?;

    if command.as_deref() == Some("bookings") {
        let store =
            JsonFileBookingStore::new(config.bookings_path.clone(), config.available_slots.clone());
        let bookings = store.list().await?;
        println!("{}", serde_json::to_string_pretty(&bookings)?);
        return Ok(());
    }

    let address = config.address();
    info!("Starting server on {address}");

    // Create application state
    let app_state = AppState::new(config).await?;
    let app = routes::create_router(app_state.clone());

    // Create listener
    let listener = TcpListener::bind(&address).await?;
    info!("Server listening on {address}");

    // Start server
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    drain_sessions(&app_state).await;
    Ok(())
}

async fn drain_sessions(app_state: &Arc<AppState>) {
    info!("Draining {} live session(s)", app_state.sessions().len());
    app_state.sessions().shutdown().await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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

    info!("Shutdown signal received");
}
