//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::server::AppState;
use crate::store::{ConnectionStatus, Stats};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub session: SessionHealthResponse,
}

#[derive(Debug, Serialize)]
pub struct SessionHealthResponse {
    pub connection_id: String,
    pub url: String,
    pub status: ConnectionStatus,
    pub connected: bool,
}

/// GET /health
///
/// The service is "healthy" while the session is connected and "degraded"
/// otherwise. The HTTP status is always 200.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let session_status = state.session.status();
    let connected = state.session.is_connected();
    let status = if connected { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        session: SessionHealthResponse {
            connection_id: state.session.connection_id().to_string(),
            url: state.session.url().to_string(),
            status: session_status,
            connected,
        },
    })
}

/// GET /api/stats
pub async fn stats(State(state): State<AppState>) -> Json<Stats> {
    Json(state.store.stats())
}
