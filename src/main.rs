use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;

use stream_monitor::config::Settings;
use stream_monitor::server::{create_app, AppState};
use stream_monitor::session::SessionManager;
use stream_monitor::store::MessageStore;
use stream_monitor::tasks::StatsSampler;
use stream_monitor::telemetry;

const TRANSPORT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing
    telemetry::init_tracing(&settings.logging)?;
    tracing::info!("Configuration loaded");

    // Open the session
    let endpoint = settings.endpoint()?;
    let store = Arc::new(MessageStore::new());
    let (session, transport) = SessionManager::spawn(endpoint, store.clone());
    let state = AppState::new(store, session);
    tracing::info!(
        connection_id = %state.session.connection_id(),
        url = %state.session.url(),
        "Session started"
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Start stats sampler in background
    let sampler = StatsSampler::new(
        settings.stats.clone(),
        state.store.clone(),
        shutdown_tx.subscribe(),
    );
    let sampler_handle = tokio::spawn(async move {
        sampler.run().await;
    });

    let session = state.session.clone();

    if settings.api.enabled {
        // Create Axum app
        let app = create_app(state);

        // Start server
        let addr = settings.api_addr();
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("API listening on {}", addr);

        // Run server with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal_handler(shutdown_tx))
            .await?;
    } else {
        tracing::info!("API disabled, running until shutdown signal");
        shutdown_signal_handler(shutdown_tx).await;
    }

    session.teardown();

    // Let the transport finish the close handshake
    match tokio::time::timeout(TRANSPORT_CLOSE_TIMEOUT, transport).await {
        Ok(_) => tracing::info!("Session transport closed"),
        Err(_) => tracing::warn!(
            timeout_secs = TRANSPORT_CLOSE_TIMEOUT.as_secs(),
            "Session transport did not close in time"
        ),
    }

    // Wait for background tasks to finish
    tracing::info!("Waiting for background tasks to finish...");
    let _ = sampler_handle.await;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal_handler(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    // Stop background tasks
    let _ = shutdown_tx.send(());
}
