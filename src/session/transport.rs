//! Socket driver: one task per session owns the WebSocket and feeds its
//! events into the [`SessionManager`] in order.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

use crate::store::MessageStore;

use super::manager::{Outbound, SessionManager};

impl SessionManager {
    /// Create a session and start connecting to `url` in the background.
    ///
    /// The returned manager is in `connecting` state; it moves to `connected`
    /// when the handshake completes, or to `error` then `disconnected` if it
    /// fails. Must be called within a Tokio runtime.
    pub fn connect(url: impl Into<String>, store: Arc<MessageStore>) -> Arc<Self> {
        let (session, _transport) = Self::spawn(url, store);
        session
    }

    /// Like [`connect`](Self::connect), also returning the transport task.
    /// The task finishes once the session is `disconnected`.
    pub fn spawn(url: impl Into<String>, store: Arc<MessageStore>) -> (Arc<Self>, JoinHandle<()>) {
        let (session, outbound) = Self::new(url, store);
        let transport = tokio::spawn(run_transport(session.clone(), outbound));
        (session, transport)
    }
}

/// Resolve once teardown asks for a close
async fn close_requested(outbound: &mut mpsc::UnboundedReceiver<Outbound>) {
    while let Some(command) = outbound.recv().await {
        if command == Outbound::Close {
            return;
        }
    }
}

#[tracing::instrument(
    name = "ws.session",
    skip_all,
    fields(connection_id = %session.connection_id(), url = %session.url())
)]
async fn run_transport(
    session: Arc<SessionManager>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) {
    let stream = tokio::select! {
        result = connect_async(session.url()) => match result {
            Ok((stream, _response)) => stream,
            Err(e) => {
                session.handle_error(e.to_string());
                session.handle_close();
                return;
            }
        },
        _ = close_requested(&mut outbound) => {
            tracing::debug!("Closed before the handshake completed");
            session.handle_close();
            return;
        }
    };

    session.handle_open();

    let (mut ws_sender, mut ws_receiver) = stream.split();

    loop {
        tokio::select! {
            command = outbound.recv() => match command {
                Some(Outbound::Frame(text)) => {
                    if let Err(e) = ws_sender.send(WsMessage::Text(text)).await {
                        session.handle_error(e.to_string());
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    if let Err(e) = ws_sender.close().await {
                        tracing::debug!(error = %e, "Close handshake failed");
                    }
                    break;
                }
            },
            incoming = ws_receiver.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => session.handle_frame(&text),
                Some(Ok(WsMessage::Binary(bytes))) => {
                    tracing::debug!(len = bytes.len(), "Binary frames are not supported, dropping");
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    tracing::debug!(frame = ?frame, "Received close frame");
                    if let Err(e) = ws_sender.close().await {
                        tracing::debug!(error = %e, "Close handshake failed");
                    }
                    break;
                }
                // Ping/pong are answered by tungstenite
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    session.handle_error(e.to_string());
                    break;
                }
                None => break,
            }
        }
    }

    session.handle_close();
}
