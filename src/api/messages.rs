//! Message log and outbound send endpoints.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::protocol::Payload;
use crate::server::AppState;
use crate::store::Message;
use crate::streams::{filter_messages, StreamView};

#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub connection_id: Option<String>,
    pub stream: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    pub messages: Vec<Message>,
    pub total: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClearQuery {
    pub connection_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub removed: usize,
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub data: Payload,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub sent: bool,
    pub connection_id: String,
}

/// GET /api/messages?connection_id=&stream=
pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Json<MessageListResponse> {
    let scoped = state
        .store
        .messages_for_connection(query.connection_id.as_deref());
    let view = StreamView::from_query(query.stream.as_deref());
    let messages = filter_messages(&scoped, &view);
    let total = messages.len();

    Json(MessageListResponse { messages, total })
}

/// DELETE /api/messages?connection_id=
pub async fn clear_messages(
    State(state): State<AppState>,
    Query(query): Query<ClearQuery>,
) -> Json<ClearResponse> {
    let removed = state.store.clear_messages(query.connection_id.as_deref());
    tracing::info!(
        connection_id = ?query.connection_id,
        removed,
        "Message log cleared"
    );
    Json(ClearResponse { removed })
}

/// POST /api/send
pub async fn send_message(
    State(state): State<AppState>,
    Json(request): Json<SendRequest>,
) -> Result<(StatusCode, Json<SendResponse>)> {
    if !state.session.send(request.data) {
        return Err(AppError::NotConnected);
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(SendResponse {
            sent: true,
            connection_id: state.session.connection_id().to_string(),
        }),
    ))
}
