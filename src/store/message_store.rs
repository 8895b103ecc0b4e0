use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::types::{
    Connection, ConnectionStatus, ConnectionUpdate, Message, Stats, StatsUpdate,
};

const EVENT_BUFFER_SIZE: usize = 256;

/// Change notification published after a mutation is committed
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    ConnectionsReplaced,
    ConnectionAdded(String),
    ConnectionUpdated(String),
    ConnectionRemoved(String),
    MessagesReplaced,
    MessageAdded(String),
    MessagesCleared {
        connection_id: Option<String>,
        removed: usize,
    },
    SelectionChanged(Option<String>),
    StatsUpdated,
}

#[derive(Debug, Default)]
struct StoreState {
    connections: Vec<Connection>,
    messages: Vec<Message>,
    selected_connection_id: Option<String>,
    stats: Stats,
    /// stream name -> number of messages tagged with it
    stream_counts: HashMap<String, usize>,
    /// Messages ever appended; unaffected by clears and replacement
    appended_total: u64,
}

impl StoreState {
    fn push_message(&mut self, message: Message) {
        if let Some(stream) = message.stream_name() {
            *self.stream_counts.entry(stream.to_string()).or_default() += 1;
        }
        self.messages.push(message);
        self.stats.total_messages += 1;
        self.appended_total += 1;
        debug_assert_eq!(self.stats.total_messages, self.messages.len());
    }

    fn rebuild_stream_counts(&mut self) {
        self.stream_counts.clear();
        for message in &self.messages {
            if let Some(stream) = message.stream_name() {
                *self.stream_counts.entry(stream.to_string()).or_default() += 1;
            }
        }
    }

    fn refresh_connection_stats(&mut self) {
        self.stats.total_connections = self.connections.len();
        self.stats.active_connections = self
            .connections
            .iter()
            .filter(|c| c.status == ConnectionStatus::Connected)
            .count();
    }
}

/// Observable table of connections, messages and aggregate stats.
///
/// Every mutation runs under one write lock and is visible to readers before
/// the call returns. A [`StoreEvent`] is broadcast afterwards for consumers
/// that react to changes.
pub struct MessageStore {
    state: RwLock<StoreState>,
    events: broadcast::Sender<StoreEvent>,
}

impl MessageStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self {
            state: RwLock::new(StoreState::default()),
            events,
        }
    }

    /// Receive change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: StoreEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn connections(&self) -> Vec<Connection> {
        self.state.read().connections.clone()
    }

    pub fn connection(&self, id: &str) -> Option<Connection> {
        self.state
            .read()
            .connections
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state.read().messages.clone()
    }

    /// Messages of one connection, or all messages when `connection_id` is `None`
    pub fn messages_for_connection(&self, connection_id: Option<&str>) -> Vec<Message> {
        let state = self.state.read();
        match connection_id {
            Some(id) => state
                .messages
                .iter()
                .filter(|m| m.connection_id == id)
                .cloned()
                .collect(),
            None => state.messages.clone(),
        }
    }

    pub fn message_count(&self) -> usize {
        self.state.read().messages.len()
    }

    pub fn stats(&self) -> Stats {
        self.state.read().stats.clone()
    }

    /// Monotonic count of appended messages, for throughput sampling
    pub fn appended_total(&self) -> u64 {
        self.state.read().appended_total
    }

    pub fn selected_connection_id(&self) -> Option<String> {
        self.state.read().selected_connection_id.clone()
    }

    /// Number of messages tagged with `stream_name`
    pub fn stream_message_count(&self, stream_name: &str) -> usize {
        self.state
            .read()
            .stream_counts
            .get(stream_name)
            .copied()
            .unwrap_or(0)
    }

    pub fn stream_counts(&self) -> HashMap<String, usize> {
        self.state.read().stream_counts.clone()
    }

    // ------------------------------------------------------------------
    // Connections
    // ------------------------------------------------------------------

    pub fn set_connections(&self, connections: Vec<Connection>) {
        self.state.write().connections = connections;
        self.emit(StoreEvent::ConnectionsReplaced);
    }

    /// Add a connection record; a record with the same id is replaced in place
    pub fn add_connection(&self, connection: Connection) {
        let id = connection.id.clone();
        {
            let mut state = self.state.write();
            match state.connections.iter_mut().find(|c| c.id == id) {
                Some(existing) => {
                    tracing::debug!(connection_id = %id, "Replacing existing connection record");
                    *existing = connection;
                }
                None => state.connections.push(connection),
            }
        }
        self.emit(StoreEvent::ConnectionAdded(id));
    }

    /// Merge `update` into the connection with `id`.
    /// Returns false, without creating a record, when the id is unknown.
    pub fn update_connection(&self, id: &str, update: ConnectionUpdate) -> bool {
        let updated = {
            let mut state = self.state.write();
            match state.connections.iter_mut().find(|c| c.id == id) {
                Some(connection) => {
                    update.apply(connection);
                    true
                }
                None => false,
            }
        };

        if updated {
            self.emit(StoreEvent::ConnectionUpdated(id.to_string()));
        } else {
            tracing::trace!(connection_id = %id, "Ignoring update for unknown connection");
        }
        updated
    }

    /// Remove the connection with `id`; removing an unknown id is a no-op
    pub fn remove_connection(&self, id: &str) -> bool {
        let removed = {
            let mut state = self.state.write();
            let before = state.connections.len();
            state.connections.retain(|c| c.id != id);
            state.connections.len() != before
        };

        if removed {
            self.emit(StoreEvent::ConnectionRemoved(id.to_string()));
        }
        removed
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    pub fn set_messages(&self, messages: Vec<Message>) {
        {
            let mut state = self.state.write();
            state.messages = messages;
            state.stats.total_messages = state.messages.len();
            state.rebuild_stream_counts();
        }
        self.emit(StoreEvent::MessagesReplaced);
    }

    /// Append a message to the log
    pub fn add_message(&self, message: Message) {
        let id = message.id.clone();
        self.state.write().push_message(message);
        self.emit(StoreEvent::MessageAdded(id));
    }

    /// Append a data frame and bump its connection's `message_count` in the
    /// same critical section.
    pub fn record_traffic(&self, message: Message) {
        let id = message.id.clone();
        let connection_id = message.connection_id.clone();
        let counted = {
            let mut state = self.state.write();
            state.push_message(message);
            match state
                .connections
                .iter_mut()
                .find(|c| c.id == connection_id)
            {
                Some(connection) => {
                    connection.message_count += 1;
                    true
                }
                None => false,
            }
        };

        self.emit(StoreEvent::MessageAdded(id));
        if counted {
            self.emit(StoreEvent::ConnectionUpdated(connection_id));
        }
    }

    /// Clear one connection's messages, or the whole log when `connection_id`
    /// is `None`. Returns the number of messages removed.
    pub fn clear_messages(&self, connection_id: Option<&str>) -> usize {
        let removed = {
            let mut state = self.state.write();
            let before = state.messages.len();
            match connection_id {
                Some(id) => state.messages.retain(|m| m.connection_id != id),
                None => state.messages.clear(),
            }
            let removed = before - state.messages.len();
            state.stats.total_messages -= removed;
            debug_assert_eq!(state.stats.total_messages, state.messages.len());
            if removed > 0 {
                state.rebuild_stream_counts();
            }
            removed
        };

        self.emit(StoreEvent::MessagesCleared {
            connection_id: connection_id.map(str::to_string),
            removed,
        });
        removed
    }

    // ------------------------------------------------------------------
    // Selection & stats
    // ------------------------------------------------------------------

    pub fn select_connection(&self, id: Option<String>) {
        self.state.write().selected_connection_id = id.clone();
        self.emit(StoreEvent::SelectionChanged(id));
    }

    pub fn update_stats(&self, update: StatsUpdate) {
        update.apply(&mut self.state.write().stats);
        self.emit(StoreEvent::StatsUpdated);
    }

    /// Recompute total and active connection counts from the connection table
    pub fn refresh_connection_stats(&self) {
        self.state.write().refresh_connection_stats();
        self.emit(StoreEvent::StatsUpdated);
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_with_connection(id: &str) -> MessageStore {
        let store = MessageStore::new();
        store.add_connection(Connection::new(id, "ws://localhost:3000"));
        store
    }

    #[test]
    fn test_update_unknown_connection_is_noop() {
        let store = store_with_connection("a");
        let before = store.connections();

        let updated = store.update_connection(
            "nonexistent",
            ConnectionUpdate::status(ConnectionStatus::Connected),
        );

        assert!(!updated);
        assert_eq!(store.connections(), before);
        assert_eq!(store.connections().len(), 1);
    }

    #[test]
    fn test_update_connection_merges_fields() {
        let store = store_with_connection("a");
        store.update_connection(
            "a",
            ConnectionUpdate::status(ConnectionStatus::Error).with_error("WebSocket error occurred"),
        );

        let connection = store.connection("a").unwrap();
        assert_eq!(connection.status, ConnectionStatus::Error);
        assert_eq!(connection.error_message.as_deref(), Some("WebSocket error occurred"));
        assert_eq!(connection.url, "ws://localhost:3000");
    }

    #[test]
    fn test_remove_connection_is_idempotent() {
        let store = store_with_connection("a");
        assert!(store.remove_connection("a"));
        assert!(!store.remove_connection("a"));
        assert!(store.connections().is_empty());
    }

    #[test]
    fn test_add_connection_with_same_id_replaces() {
        let store = store_with_connection("a");
        store.add_connection(Connection::new("a", "ws://other"));
        let connections = store.connections();
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].url, "ws://other");
    }

    #[test]
    fn test_messages_keep_insertion_order() {
        let store = store_with_connection("a");
        let ids: Vec<String> = (0..5)
            .map(|i| {
                let message = Message::received("a", json!({ "seq": i }));
                let id = message.id.clone();
                store.add_message(message);
                id
            })
            .collect();

        let stored: Vec<String> = store.messages().into_iter().map(|m| m.id).collect();
        assert_eq!(stored, ids);
    }

    #[test]
    fn test_record_traffic_counts_connection_and_total() {
        let store = store_with_connection("a");
        for i in 0..3 {
            store.record_traffic(Message::sent("a", json!({ "n": i })));
        }
        store.record_traffic(Message::received("a", "raw"));

        assert_eq!(store.connection("a").unwrap().message_count, 4);
        assert_eq!(store.stats().total_messages, 4);
        assert_eq!(store.stats().total_messages, store.message_count());
    }

    #[test]
    fn test_record_traffic_for_removed_connection_still_appends() {
        let store = MessageStore::new();
        store.record_traffic(Message::received("gone", "late frame"));
        assert_eq!(store.message_count(), 1);
        assert_eq!(store.stats().total_messages, 1);
    }

    #[test]
    fn test_selective_clear() {
        let store = MessageStore::new();
        store.add_message(Message::received("a", "a1"));
        store.add_message(Message::received("b", "b1"));
        store.add_message(Message::sent("a", "a2"));
        store.add_message(Message::received("b", "b2"));

        let removed = store.clear_messages(Some("a"));

        assert_eq!(removed, 2);
        let remaining = store.messages();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|m| m.connection_id == "b"));
        assert_eq!(remaining[0].data.as_text(), Some("b1"));
        assert_eq!(remaining[1].data.as_text(), Some("b2"));
        assert_eq!(store.stats().total_messages, 2);

        store.clear_messages(None);
        assert!(store.messages().is_empty());
        assert_eq!(store.stats().total_messages, 0);
    }

    #[test]
    fn test_set_messages_resyncs_totals() {
        let store = MessageStore::new();
        store.add_message(Message::received("a", "x"));
        store.set_messages(vec![
            Message::received("a", json!({"streamName": "logs"})),
            Message::received("a", json!({"streamName": "logs"})),
            Message::received("a", json!({"streamName": "metrics"})),
        ]);

        assert_eq!(store.stats().total_messages, 3);
        assert_eq!(store.stream_message_count("logs"), 2);
        assert_eq!(store.stream_message_count("metrics"), 1);
    }

    #[test]
    fn test_stream_counts_follow_clear() {
        let store = MessageStore::new();
        store.add_message(Message::received("a", json!({"streamName": "logs"})));
        store.add_message(Message::received("b", json!({"streamName": "logs"})));

        store.clear_messages(Some("a"));

        assert_eq!(store.stream_message_count("logs"), 1);
        assert_eq!(store.stream_message_count("other"), 0);
    }

    #[test]
    fn test_update_stats_cannot_touch_total_messages() {
        let store = MessageStore::new();
        store.add_message(Message::received("a", "x"));
        store.update_stats(StatsUpdate {
            active_connections: Some(1),
            messages_per_second: Some(2.5),
            ..Default::default()
        });

        let stats = store.stats();
        assert_eq!(stats.active_connections, 1);
        assert_eq!(stats.messages_per_second, 2.5);
        assert_eq!(stats.total_messages, 1);
    }

    #[test]
    fn test_refresh_connection_stats() {
        let store = store_with_connection("a");
        store.add_connection(Connection::new("b", "ws://b"));
        store.update_connection("a", ConnectionUpdate::status(ConnectionStatus::Connected));

        store.refresh_connection_stats();

        let stats = store.stats();
        assert_eq!(stats.total_connections, 2);
        assert_eq!(stats.active_connections, 1);
    }

    #[test]
    fn test_select_connection() {
        let store = store_with_connection("a");
        store.select_connection(Some("a".to_string()));
        assert_eq!(store.selected_connection_id().as_deref(), Some("a"));
        store.select_connection(None);
        assert_eq!(store.selected_connection_id(), None);
    }

    #[test]
    fn test_messages_for_connection() {
        let store = MessageStore::new();
        store.add_message(Message::received("a", "1"));
        store.add_message(Message::received("b", "2"));
        assert_eq!(store.messages_for_connection(Some("a")).len(), 1);
        assert_eq!(store.messages_for_connection(None).len(), 2);
    }

    #[tokio::test]
    async fn test_mutations_are_broadcast() {
        let store = MessageStore::new();
        let mut events = store.subscribe();

        store.add_connection(Connection::new("a", "ws://a"));
        store.update_connection("missing", ConnectionUpdate::default());
        let message = Message::received("a", "hello");
        let message_id = message.id.clone();
        store.add_message(message);

        assert_eq!(events.recv().await.unwrap(), StoreEvent::ConnectionAdded("a".into()));
        assert_eq!(events.recv().await.unwrap(), StoreEvent::MessageAdded(message_id));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_observer_wakes_on_mutation() {
        let store = MessageStore::new();
        let mut events = store.subscribe();
        let mut next = tokio_test::task::spawn(events.recv());

        tokio_test::assert_pending!(next.poll());
        store.select_connection(Some("a".into()));

        assert!(next.is_woken());
        let event = tokio_test::assert_ready!(next.poll()).unwrap();
        assert_eq!(event, StoreEvent::SelectionChanged(Some("a".into())));
    }

    #[test]
    fn test_appended_total_survives_clear() {
        let store = MessageStore::new();
        store.add_message(Message::received("a", "one"));
        store.add_message(Message::received("a", "two"));
        store.clear_messages(None);
        store.add_message(Message::received("a", "three"));

        assert_eq!(store.message_count(), 1);
        assert_eq!(store.appended_total(), 3);
    }
}
