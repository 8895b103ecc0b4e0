//! API layer - HTTP endpoint handlers organized by domain.

mod connections;
mod health;
mod messages;
mod metrics;
mod routes;
mod streams;

// Re-export all handlers for use in server/app.rs
pub use connections::{list_connections, remove_connection, select_connection};
pub use health::{health, stats};
pub use messages::{clear_messages, list_messages, send_message};
pub use metrics::prometheus_metrics;
pub use routes::api_routes;
pub use streams::{list_streams, subscribe_stream, unsubscribe_stream};
