//! Message store: connections, the message log and aggregate stats.
//!
//! The store is passive. It performs no I/O and holds no socket; the session
//! manager writes into it and consumers read from it.

mod message_store;
mod types;

pub use message_store::{MessageStore, StoreEvent};
pub use types::{
    Connection, ConnectionStatus, ConnectionUpdate, Message, MessageDirection, Stats, StatsUpdate,
};
