//! Session manager: owns the socket, drives the connection state machine and
//! encodes the stream subscription protocol.

mod endpoint;
mod manager;
mod state;
mod transport;

pub use endpoint::resolve_endpoint;
pub use manager::{Outbound, SessionManager};
pub use state::{next_status, Lifecycle};
