//! Connection, message and stats records held by the store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::protocol::Payload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record per socket session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub url: String,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
    /// Data frames sent or received; lifecycle notices are not counted
    pub message_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Connection {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            status: ConnectionStatus::Connecting,
            created_at: Utc::now(),
            message_count: 0,
            error_message: None,
        }
    }
}

/// Partial update merged into a [`Connection`]; `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionUpdate {
    pub url: Option<String>,
    pub status: Option<ConnectionStatus>,
    pub message_count: Option<u64>,
    pub error_message: Option<String>,
}

impl ConnectionUpdate {
    pub fn status(status: ConnectionStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub(crate) fn apply(self, connection: &mut Connection) {
        if let Some(url) = self.url {
            connection.url = url;
        }
        if let Some(status) = self.status {
            connection.status = status;
        }
        if let Some(count) = self.message_count {
            connection.message_count = count;
        }
        if let Some(message) = self.error_message {
            connection.error_message = Some(message);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    Sent,
    Received,
}

/// One entry of the append-only message log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    /// Weak reference; the message outlives removal of its connection
    pub connection_id: String,
    #[serde(rename = "type")]
    pub direction: MessageDirection,
    pub data: Payload,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(
        connection_id: impl Into<String>,
        direction: MessageDirection,
        data: impl Into<Payload>,
    ) -> Self {
        Self {
            id: format!("msg_{}", Uuid::new_v4().simple()),
            connection_id: connection_id.into(),
            direction,
            data: data.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn sent(connection_id: impl Into<String>, data: impl Into<Payload>) -> Self {
        Self::new(connection_id, MessageDirection::Sent, data)
    }

    pub fn received(connection_id: impl Into<String>, data: impl Into<Payload>) -> Self {
        Self::new(connection_id, MessageDirection::Received, data)
    }

    pub fn stream_name(&self) -> Option<&str> {
        self.data.stream_name()
    }
}

/// Aggregate counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_connections: usize,
    pub active_connections: usize,
    /// Always equal to the size of the message table
    pub total_messages: usize,
    pub messages_per_second: f64,
}

/// Partial stats update.
///
/// `total_messages` is not settable: the store maintains it alongside the
/// message table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsUpdate {
    pub total_connections: Option<usize>,
    pub active_connections: Option<usize>,
    pub messages_per_second: Option<f64>,
}

impl StatsUpdate {
    pub(crate) fn apply(self, stats: &mut Stats) {
        if let Some(total) = self.total_connections {
            stats.total_connections = total;
        }
        if let Some(active) = self.active_connections {
            stats.active_connections = active;
        }
        if let Some(rate) = self.messages_per_second {
            stats.messages_per_second = rate;
        }
    }
}
