//! Prometheus metrics for the stream monitor.
//!
//! - Session lifecycle (opened, closed, transport errors, connected gauge)
//! - Frame traffic by direction, malformed and dropped frames
//! - Stream subscriptions (join/leave)
//! - Store gauges (messages, connections, per-stream counts, throughput)

mod helpers;

pub use helpers::{encode_metrics, FrameMetrics, SessionMetrics, StoreMetrics, SubscriptionMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_gauge, register_int_counter, register_int_counter_vec, register_int_gauge,
    register_int_gauge_vec, Gauge, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "stream_monitor";

lazy_static! {
    // ============================================================================
    // Session Metrics
    // ============================================================================

    /// Sessions that reached the connected state
    pub static ref SESSIONS_OPENED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_sessions_opened_total", METRIC_PREFIX),
        "Total sessions that reached the connected state"
    ).unwrap();

    /// Sessions that reached the disconnected state
    pub static ref SESSIONS_CLOSED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_sessions_closed_total", METRIC_PREFIX),
        "Total sessions that reached the disconnected state"
    ).unwrap();

    /// Transport errors reported by the socket
    pub static ref TRANSPORT_ERRORS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_transport_errors_total", METRIC_PREFIX),
        "Total transport errors"
    ).unwrap();

    /// Whether the session is connected (1 = connected, 0 = not connected)
    pub static ref SESSION_CONNECTED: IntGauge = register_int_gauge!(
        format!("{}_session_connected", METRIC_PREFIX),
        "Session connection status (1=connected, 0=not connected)"
    ).unwrap();

    // ============================================================================
    // Frame Metrics
    // ============================================================================

    /// Data frames by direction
    pub static ref FRAMES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_frames_total", METRIC_PREFIX),
        "Total data frames by direction",
        &["direction"]
    ).unwrap();

    /// Inbound frames that were not valid JSON
    pub static ref MALFORMED_FRAMES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_malformed_frames_total", METRIC_PREFIX),
        "Total inbound frames kept as raw text"
    ).unwrap();

    /// Sends dropped because the session was not ready
    pub static ref DROPPED_SENDS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_dropped_sends_total", METRIC_PREFIX),
        "Total sends dropped while the session was not connected"
    ).unwrap();

    // ============================================================================
    // Subscription Metrics
    // ============================================================================

    /// Control frames sent, by action
    pub static ref SUBSCRIPTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_subscriptions_total", METRIC_PREFIX),
        "Total join/leave control frames sent",
        &["action"]
    ).unwrap();

    // ============================================================================
    // Store Metrics
    // ============================================================================

    /// Rows in the message table
    pub static ref STORE_MESSAGES: IntGauge = register_int_gauge!(
        format!("{}_store_messages", METRIC_PREFIX),
        "Messages currently held in the store"
    ).unwrap();

    /// Connection records in the store
    pub static ref STORE_CONNECTIONS: IntGauge = register_int_gauge!(
        format!("{}_store_connections", METRIC_PREFIX),
        "Connection records currently held in the store"
    ).unwrap();

    /// Messages per stream
    pub static ref STREAM_MESSAGES: IntGaugeVec = register_int_gauge_vec!(
        format!("{}_stream_messages", METRIC_PREFIX),
        "Messages attributed to each stream",
        &["stream"]
    ).unwrap();

    /// Sampled message throughput
    pub static ref MESSAGES_PER_SECOND: Gauge = register_gauge!(
        format!("{}_messages_per_second", METRIC_PREFIX),
        "Messages appended per second over the last sample window"
    ).unwrap();
}
