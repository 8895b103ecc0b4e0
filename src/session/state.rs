//! Connection state machine.
//!
//! ```text
//! connecting ──open──▶ connected ──close──▶ disconnected
//!     │                    │                     ▲
//!     └──────error──────▶ error ─────close───────┘
//! ```
//!
//! A close before open (`connecting → disconnected`) is legal too.
//! `disconnected` is terminal.

use crate::store::ConnectionStatus;

/// Transport lifecycle event that can move the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Opened,
    Failed,
    Closed,
}

/// Next status for `event`, or `None` if the transition is not allowed
pub fn next_status(current: ConnectionStatus, event: Lifecycle) -> Option<ConnectionStatus> {
    use ConnectionStatus::*;

    match (current, event) {
        (Connecting, Lifecycle::Opened) => Some(Connected),
        (Connecting | Connected, Lifecycle::Failed) => Some(Error),
        (Connecting | Connected | Error, Lifecycle::Closed) => Some(Disconnected),
        _ => None,
    }
}
