use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::metrics::{FrameMetrics, SessionMetrics, SubscriptionMetrics};
use crate::protocol::{ControlMessage, Payload, Subscription};
use crate::store::{Connection, ConnectionStatus, ConnectionUpdate, Message, MessageStore};

use super::state::{next_status, Lifecycle};

const ESTABLISHED_NOTICE: &str = "WebSocket connection established";
const CLOSED_NOTICE: &str = "WebSocket connection closed";
const ERROR_NOTICE: &str = "WebSocket error occurred";

/// Command for the task that owns the socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Frame(String),
    Close,
}

struct SessionInner {
    status: ConnectionStatus,
    /// Dropped once the transport has closed
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
    /// Set by teardown; no further sends are accepted
    closing: bool,
    /// Reached `connected` at some point, even if it failed since
    opened: bool,
}

/// Owner of one socket session.
///
/// Lifecycle handlers (`handle_*`) are called by the transport task, strictly
/// in order. Consumers call [`send`](Self::send) and the subscribe operations;
/// none of them block or fail, a send on a session that is not connected is
/// silently dropped.
pub struct SessionManager {
    connection_id: String,
    url: String,
    store: Arc<MessageStore>,
    inner: Mutex<SessionInner>,
}

impl SessionManager {
    /// Register a connection record in `connecting` state.
    ///
    /// Returns the manager and the receiving end of its outbound queue, which
    /// the transport drains into the socket.
    pub fn new(
        url: impl Into<String>,
        store: Arc<MessageStore>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection_id = format!("ws_{}", Uuid::new_v4().simple());
        let url = url.into();

        store.add_connection(Connection::new(connection_id.clone(), url.clone()));
        store.refresh_connection_stats();

        tracing::info!(connection_id = %connection_id, url = %url, "Session created");

        let session = Arc::new(Self {
            connection_id,
            url,
            store,
            inner: Mutex::new(SessionInner {
                status: ConnectionStatus::Connecting,
                outbound: Some(tx),
                closing: false,
                opened: false,
            }),
        });
        (session, rx)
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> ConnectionStatus {
        self.inner.lock().status
    }

    /// Connected with the transport ready to take frames
    pub fn is_connected(&self) -> bool {
        let inner = self.inner.lock();
        Self::is_ready(&inner)
    }

    fn is_ready(inner: &SessionInner) -> bool {
        inner.status == ConnectionStatus::Connected && !inner.closing && inner.outbound.is_some()
    }

    /// Apply a lifecycle transition; `false` if the state machine rejects it
    fn transition(&self, inner: &mut SessionInner, event: Lifecycle) -> bool {
        match next_status(inner.status, event) {
            Some(next) => {
                tracing::debug!(
                    connection_id = %self.connection_id,
                    from = %inner.status,
                    to = %next,
                    "Session state transition"
                );
                inner.status = next;
                true
            }
            None => {
                tracing::debug!(
                    connection_id = %self.connection_id,
                    status = %inner.status,
                    event = ?event,
                    "Ignoring lifecycle event"
                );
                false
            }
        }
    }

    fn notice(&self, kind: &str, message: impl Into<String>) {
        self.store.add_message(Message::received(
            self.connection_id.clone(),
            Payload::notice(kind, message),
        ));
    }

    // ------------------------------------------------------------------
    // Transport events
    // ------------------------------------------------------------------

    pub fn handle_open(&self) {
        let mut inner = self.inner.lock();
        if !self.transition(&mut inner, Lifecycle::Opened) {
            return;
        }
        inner.opened = true;

        self.store.update_connection(
            &self.connection_id,
            ConnectionUpdate::status(ConnectionStatus::Connected),
        );
        self.notice("system", ESTABLISHED_NOTICE);
        self.store.refresh_connection_stats();
        SessionMetrics::record_opened();

        tracing::info!(connection_id = %self.connection_id, url = %self.url, "WebSocket connection established");
    }

    /// Record an inbound text frame. Frames that are not JSON are kept as text.
    pub fn handle_frame(&self, raw: &str) {
        let inner = self.inner.lock();
        if inner.status != ConnectionStatus::Connected {
            tracing::debug!(
                connection_id = %self.connection_id,
                status = %inner.status,
                "Dropping frame outside connected state"
            );
            return;
        }

        let payload = match Payload::try_parse(raw) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!(connection_id = %self.connection_id, error = %e, "Frame is not JSON, keeping raw text");
                FrameMetrics::record_malformed();
                Payload::Text(raw.to_owned())
            }
        };

        tracing::trace!(
            connection_id = %self.connection_id,
            stream = payload.stream_name().unwrap_or("-"),
            "Frame received"
        );

        self.store
            .record_traffic(Message::received(self.connection_id.clone(), payload));
        FrameMetrics::record_received();
    }

    pub fn handle_error(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let mut inner = self.inner.lock();
        if !self.transition(&mut inner, Lifecycle::Failed) {
            return;
        }

        let message = if reason.is_empty() {
            ERROR_NOTICE.to_string()
        } else {
            format!("{}: {}", ERROR_NOTICE, reason)
        };

        self.store.update_connection(
            &self.connection_id,
            ConnectionUpdate::status(ConnectionStatus::Error).with_error(message.clone()),
        );
        self.notice("error", message);
        self.store.refresh_connection_stats();
        SessionMetrics::record_error();

        tracing::warn!(connection_id = %self.connection_id, error = %reason, "WebSocket error");
    }

    pub fn handle_close(&self) {
        let mut inner = self.inner.lock();
        if !self.transition(&mut inner, Lifecycle::Closed) {
            return;
        }
        inner.outbound = None;

        self.store.update_connection(
            &self.connection_id,
            ConnectionUpdate::status(ConnectionStatus::Disconnected),
        );
        self.notice("system", CLOSED_NOTICE);
        self.store.refresh_connection_stats();
        if inner.opened {
            SessionMetrics::record_closed();
        }

        tracing::info!(connection_id = %self.connection_id, "WebSocket connection closed");
    }

    // ------------------------------------------------------------------
    // Consumer operations
    // ------------------------------------------------------------------

    /// Send a payload. Returns whether it was handed to the transport; a send
    /// while not connected is dropped without recording anything.
    pub fn send(&self, payload: impl Into<Payload>) -> bool {
        let payload = payload.into();
        let inner = self.inner.lock();

        let tx = match inner.outbound.as_ref() {
            Some(tx) if Self::is_ready(&inner) => tx,
            _ => {
                tracing::debug!(
                    connection_id = %self.connection_id,
                    status = %inner.status,
                    "Dropping send, session not ready"
                );
                FrameMetrics::record_dropped();
                return false;
            }
        };

        if tx.send(Outbound::Frame(payload.to_wire())).is_err() {
            tracing::debug!(connection_id = %self.connection_id, "Dropping send, transport gone");
            FrameMetrics::record_dropped();
            return false;
        }

        self.store
            .record_traffic(Message::sent(self.connection_id.clone(), payload));
        FrameMetrics::record_sent();
        true
    }

    fn send_control(&self, message: ControlMessage) -> bool {
        let sent = match message.to_payload() {
            Ok(payload) => self.send(payload),
            Err(e) => {
                tracing::error!(error = %e, kind = message.kind(), "Failed to encode control message");
                false
            }
        };
        if !sent {
            return false;
        }

        let subscription = message.subscription();
        match &message {
            ControlMessage::Join(_) => SubscriptionMetrics::record_join(),
            ControlMessage::Leave(_) => SubscriptionMetrics::record_leave(),
        }
        tracing::debug!(
            connection_id = %self.connection_id,
            kind = message.kind(),
            stream = %subscription.stream_name,
            group = %subscription.group_id,
            subscription_id = %subscription.subscription_id,
            "Control frame sent"
        );
        true
    }

    /// Send a `join` for an already built subscription. Returns `false` if
    /// the frame was dropped because the session is not connected.
    pub fn join_stream(&self, subscription: Subscription) -> bool {
        self.send_control(ControlMessage::Join(subscription))
    }

    /// Send a `join` for the stream and return the new subscription id.
    ///
    /// The id is the only handle for a later unsubscribe; the server's
    /// acknowledgment is not awaited.
    pub fn subscribe_to_stream(
        &self,
        stream_name: &str,
        group_id: &str,
        item_id: Option<&str>,
    ) -> String {
        let subscription = Subscription::new(stream_name, group_id, item_id);
        let subscription_id = subscription.subscription_id.clone();
        self.join_stream(subscription);
        subscription_id
    }

    /// Send a `leave` echoing the id returned by the matching subscribe
    pub fn unsubscribe_from_stream(
        &self,
        stream_name: &str,
        group_id: &str,
        subscription_id: &str,
        item_id: Option<&str>,
    ) {
        let subscription = Subscription::with_id(stream_name, group_id, subscription_id, item_id);
        self.send_control(ControlMessage::Leave(subscription));
    }

    /// Close the transport and remove the connection record. Idempotent.
    pub fn teardown(&self) {
        {
            let mut inner = self.inner.lock();
            if !inner.closing {
                inner.closing = true;
                if let Some(tx) = inner.outbound.as_ref() {
                    // Transport may already be gone
                    let _ = tx.send(Outbound::Close);
                }
                tracing::info!(connection_id = %self.connection_id, "Session teardown requested");
            }
        }

        if self.store.remove_connection(&self.connection_id) {
            self.store.refresh_connection_stats();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MessageDirection;
    use serde_json::{json, Value};

    fn open_session() -> (Arc<SessionManager>, mpsc::UnboundedReceiver<Outbound>, Arc<MessageStore>) {
        let store = Arc::new(MessageStore::new());
        let (session, rx) = SessionManager::new("ws://localhost:3000", store.clone());
        session.handle_open();
        (session, rx, store)
    }

    fn next_frame(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> Value {
        match rx.try_recv().expect("frame queued") {
            Outbound::Frame(text) => serde_json::from_str(&text).unwrap(),
            Outbound::Close => panic!("expected a frame"),
        }
    }

    #[test]
    fn test_new_session_registers_connecting_record() {
        let store = Arc::new(MessageStore::new());
        let (session, _rx) = SessionManager::new("ws://localhost:3000", store.clone());

        let connection = store.connection(session.connection_id()).unwrap();
        assert_eq!(connection.status, ConnectionStatus::Connecting);
        assert_eq!(connection.message_count, 0);
        assert!(!session.is_connected());
        assert_eq!(store.stats().total_connections, 1);
    }

    #[test]
    fn test_open_records_notice_and_stats() {
        let (session, _rx, store) = open_session();

        assert!(session.is_connected());
        assert_eq!(store.stats().active_connections, 1);
        let messages = store.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].direction, MessageDirection::Received);
        assert_eq!(messages[0].data.as_json().unwrap()["type"], "system");
        // Notices are rows of the table but not peer traffic
        assert_eq!(store.stats().total_messages, 1);
        assert_eq!(store.connection(session.connection_id()).unwrap().message_count, 0);
    }

    #[test]
    fn test_counters_track_traffic() {
        let (session, _rx, store) = open_session();

        for i in 0..3 {
            session.handle_frame(&json!({ "n": i }).to_string());
        }
        for i in 0..2 {
            assert!(session.send(json!({ "out": i })));
        }

        let connection = store.connection(session.connection_id()).unwrap();
        assert_eq!(connection.message_count, 5);
        assert_eq!(store.stats().total_messages, store.message_count());
        assert_eq!(store.message_count(), 6);
    }

    #[test]
    fn test_malformed_frame_kept_as_text() {
        let (session, _rx, store) = open_session();

        session.handle_frame("definitely {not json");

        let messages = store.messages();
        let last = messages.last().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(last.direction, MessageDirection::Received);
        assert_eq!(last.data.as_text(), Some("definitely {not json"));
    }

    #[test]
    fn test_send_serializes_structured_payloads() {
        let (session, mut rx, store) = open_session();

        session.send(json!({"hello": "world"}));
        session.send("plain text");

        assert_eq!(
            rx.try_recv().unwrap(),
            Outbound::Frame(r#"{"hello":"world"}"#.to_string())
        );
        assert_eq!(rx.try_recv().unwrap(), Outbound::Frame("plain text".to_string()));

        let sent: Vec<_> = store
            .messages()
            .into_iter()
            .filter(|m| m.direction == MessageDirection::Sent)
            .collect();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].data.is_structured());
    }

    #[test]
    fn test_send_before_open_is_silent_noop() {
        let store = Arc::new(MessageStore::new());
        let (session, mut rx) = SessionManager::new("ws://localhost:3000", store.clone());

        assert!(!session.send("too early"));

        assert!(rx.try_recv().is_err());
        assert!(store.messages().is_empty());
        assert_eq!(store.connection(session.connection_id()).unwrap().message_count, 0);
    }

    #[test]
    fn test_subscribe_unsubscribe_envelope() {
        let (session, mut rx, _store) = open_session();

        let subscription_id = session.subscribe_to_stream("X", "g", None);
        session.unsubscribe_from_stream("X", "g", &subscription_id, None);

        let join = next_frame(&mut rx);
        let leave = next_frame(&mut rx);
        assert_eq!(join["type"], "join");
        assert_eq!(leave["type"], "leave");
        assert_eq!(join["data"]["subscriptionId"], subscription_id.as_str());
        assert_eq!(leave["data"]["subscriptionId"], join["data"]["subscriptionId"]);
        assert_eq!(join["data"]["streamName"], "X");
        assert_eq!(join["data"]["groupId"], "g");
        assert!(join["data"].get("itemId").is_none());
    }

    #[test]
    fn test_subscribe_with_item_id() {
        let (session, mut rx, _store) = open_session();

        session.subscribe_to_stream("todo", "list", Some("42"));

        let join = next_frame(&mut rx);
        assert_eq!(join["data"]["itemId"], "42");
    }

    #[test]
    fn test_subscribe_while_disconnected_still_returns_id() {
        let store = Arc::new(MessageStore::new());
        let (session, mut rx) = SessionManager::new("ws://localhost:3000", store);

        let subscription_id = session.subscribe_to_stream("logs", "g", None);

        assert!(subscription_id.starts_with("sub_"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_error_then_close() {
        let (session, _rx, store) = open_session();

        session.handle_error("connection reset");
        let connection = store.connection(session.connection_id()).unwrap();
        assert_eq!(connection.status, ConnectionStatus::Error);
        assert!(connection.error_message.unwrap().contains("connection reset"));
        assert!(!session.send("after error"));

        session.handle_close();
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert_eq!(store.stats().active_connections, 0);

        let kinds: Vec<String> = store
            .messages()
            .iter()
            .filter_map(|m| m.data.as_json().map(|v| v["type"].as_str().unwrap_or("").to_string()))
            .collect();
        assert_eq!(kinds, vec!["system", "error", "system"]);
    }

    #[test]
    fn test_close_after_error_counts_as_closed_session() {
        let (session, _rx, _store) = open_session();
        let closed_before = crate::metrics::SESSIONS_CLOSED_TOTAL.get();

        session.handle_error("connection reset");
        session.handle_close();

        assert!(session.inner.lock().opened);
        assert!(crate::metrics::SESSIONS_CLOSED_TOTAL.get() > closed_before);
    }

    #[test]
    fn test_connect_failure_path() {
        let store = Arc::new(MessageStore::new());
        let (session, _rx) = SessionManager::new("ws://127.0.0.1:1", store.clone());

        session.handle_error("connection refused");
        session.handle_close();

        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert_eq!(
            store.connection(session.connection_id()).unwrap().status,
            ConnectionStatus::Disconnected
        );
    }

    #[test]
    fn test_events_after_close_are_ignored() {
        let (session, _rx, store) = open_session();
        session.handle_close();
        let count = store.message_count();

        session.handle_close();
        session.handle_open();
        session.handle_error("late");
        session.handle_frame("late frame");

        assert_eq!(store.message_count(), count);
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let (session, mut rx, store) = open_session();

        session.teardown();
        let after_first = (store.connections(), store.message_count(), store.stats());
        session.teardown();

        assert_eq!(rx.try_recv().unwrap(), Outbound::Close);
        assert!(rx.try_recv().is_err());
        assert!(store.connection(session.connection_id()).is_none());
        assert_eq!(
            (store.connections(), store.message_count(), store.stats()),
            after_first
        );
        assert!(!session.is_connected());
        assert!(!session.send("after teardown"));
    }

    #[test]
    fn test_close_after_teardown_keeps_history() {
        let (session, _rx, store) = open_session();

        session.teardown();
        session.handle_close();

        assert!(store.connections().is_empty());
        assert_eq!(store.message_count(), 2);
        assert_eq!(store.stats().active_connections, 0);
    }

    #[test]
    fn test_stream_scenario() {
        let (session, _rx, store) = open_session();

        session.handle_frame(r#"{"streamName":"logs","msg":"hello"}"#);

        assert_eq!(store.stream_message_count("logs"), 1);
        assert_eq!(store.stream_message_count("metrics"), 0);
        // One "connection established" notice plus the stream message
        assert_eq!(store.stats().total_messages, 2);
        assert_eq!(store.connection(session.connection_id()).unwrap().message_count, 1);
    }
}
