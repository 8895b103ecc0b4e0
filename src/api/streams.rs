//! Stream subscription endpoints.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::protocol::Subscription;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct StreamInfo {
    pub name: String,
    pub message_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Subscription>,
}

#[derive(Debug, Serialize)]
pub struct StreamListResponse {
    pub streams: Vec<StreamInfo>,
    pub total_streams: usize,
}

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub stream_name: String,
    pub group_id: String,
    #[serde(default)]
    pub item_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    pub stream_name: String,
}

/// GET /api/streams
///
/// Streams seen in the message log or with a recorded subscription.
pub async fn list_streams(State(state): State<AppState>) -> Json<StreamListResponse> {
    let messages = state.store.messages();
    let streams: Vec<StreamInfo> = state
        .registry
        .stream_names(&messages)
        .into_iter()
        .map(|name| StreamInfo {
            message_count: state.store.stream_message_count(&name),
            subscription: state.registry.get(&name),
            name,
        })
        .collect();
    let total_streams = streams.len();

    Json(StreamListResponse {
        streams,
        total_streams,
    })
}

/// POST /api/streams/subscribe
pub async fn subscribe_stream(
    State(state): State<AppState>,
    Json(request): Json<SubscribeRequest>,
) -> Result<Json<Subscription>> {
    if request.stream_name.trim().is_empty() {
        return Err(AppError::Validation("stream_name must not be empty".to_string()));
    }
    if request.group_id.trim().is_empty() {
        return Err(AppError::Validation("group_id must not be empty".to_string()));
    }

    state
        .registry
        .subscribe(
            &state.session,
            &request.stream_name,
            &request.group_id,
            request.item_id.as_deref(),
        )
        .map(Json)
        .ok_or(AppError::NotConnected)
}

/// POST /api/streams/unsubscribe
pub async fn unsubscribe_stream(
    State(state): State<AppState>,
    Json(request): Json<UnsubscribeRequest>,
) -> Result<Json<Subscription>> {
    state
        .registry
        .unsubscribe(&state.session, &request.stream_name)
        .map(Json)
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No subscription recorded for stream '{}'",
                request.stream_name
            ))
        })
}
