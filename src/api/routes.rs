use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::server::AppState;

use super::connections::{list_connections, remove_connection, select_connection};
use super::health::{health, stats};
use super::messages::{clear_messages, list_messages, send_message};
use super::metrics::prometheus_metrics;
use super::streams::{list_streams, subscribe_stream, unsubscribe_stream};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health & Metrics
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
        .nest(
            "/api",
            Router::new()
                .route("/stats", get(stats))
                // Connection records
                .route("/connections", get(list_connections))
                .route("/connections/select", post(select_connection))
                .route("/connections/{id}", delete(remove_connection))
                // Message log
                .route("/messages", get(list_messages).delete(clear_messages))
                .route("/send", post(send_message))
                // Streams
                .route("/streams", get(list_streams))
                .route("/streams/subscribe", post(subscribe_stream))
                .route("/streams/unsubscribe", post(unsubscribe_stream)),
        )
}
