//! Connection record endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::server::AppState;
use crate::store::Connection;

#[derive(Debug, Serialize)]
pub struct ConnectionListResponse {
    pub connections: Vec<Connection>,
    pub selected_connection_id: Option<String>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct SelectConnectionRequest {
    #[serde(default)]
    pub connection_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SelectConnectionResponse {
    pub selected_connection_id: Option<String>,
}

/// GET /api/connections
pub async fn list_connections(State(state): State<AppState>) -> Json<ConnectionListResponse> {
    let connections = state.store.connections();
    let total = connections.len();

    Json(ConnectionListResponse {
        connections,
        selected_connection_id: state.store.selected_connection_id(),
        total,
    })
}

/// POST /api/connections/select
///
/// The id is not checked against the connection list; `null` clears the
/// selection.
pub async fn select_connection(
    State(state): State<AppState>,
    Json(request): Json<SelectConnectionRequest>,
) -> Json<SelectConnectionResponse> {
    state.store.select_connection(request.connection_id);

    Json(SelectConnectionResponse {
        selected_connection_id: state.store.selected_connection_id(),
    })
}

/// DELETE /api/connections/{id}
pub async fn remove_connection(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> StatusCode {
    if state.store.remove_connection(&id) {
        state.store.refresh_connection_stats();
        tracing::info!(connection_id = %id, "Connection record removed");
    }
    StatusCode::NO_CONTENT
}
