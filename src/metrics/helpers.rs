use std::collections::HashMap;

use prometheus::{Encoder, TextEncoder};

use super::*;
use crate::store::Stats;

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for session lifecycle metrics
pub struct SessionMetrics;

impl SessionMetrics {
    pub fn record_opened() {
        SESSIONS_OPENED_TOTAL.inc();
        SESSION_CONNECTED.set(1);
    }

    pub fn record_closed() {
        SESSIONS_CLOSED_TOTAL.inc();
        SESSION_CONNECTED.set(0);
    }

    pub fn record_error() {
        TRANSPORT_ERRORS_TOTAL.inc();
    }
}

/// Helper struct for frame traffic metrics
pub struct FrameMetrics;

impl FrameMetrics {
    pub fn record_sent() {
        FRAMES_TOTAL.with_label_values(&["sent"]).inc();
    }

    pub fn record_received() {
        FRAMES_TOTAL.with_label_values(&["received"]).inc();
    }

    pub fn record_malformed() {
        MALFORMED_FRAMES_TOTAL.inc();
    }

    pub fn record_dropped() {
        DROPPED_SENDS_TOTAL.inc();
    }
}

/// Helper struct for subscription metrics
pub struct SubscriptionMetrics;

impl SubscriptionMetrics {
    pub fn record_join() {
        SUBSCRIPTIONS_TOTAL.with_label_values(&["join"]).inc();
    }

    pub fn record_leave() {
        SUBSCRIPTIONS_TOTAL.with_label_values(&["leave"]).inc();
    }
}

/// Helper struct for store gauges
pub struct StoreMetrics;

impl StoreMetrics {
    /// Refresh store gauges from a stats snapshot and the per-stream counters
    pub fn update(stats: &Stats, stream_counts: &HashMap<String, usize>) {
        STORE_MESSAGES.set(stats.total_messages as i64);
        STORE_CONNECTIONS.set(stats.total_connections as i64);
        MESSAGES_PER_SECOND.set(stats.messages_per_second);

        STREAM_MESSAGES.reset();
        for (stream, count) in stream_counts {
            STREAM_MESSAGES
                .with_label_values(&[stream.as_str()])
                .set(*count as i64);
        }
    }

    pub fn set_throughput(messages_per_second: f64) {
        MESSAGES_PER_SECOND.set(messages_per_second);
    }
}
