//! Wire protocol: frame payloads and the join/leave control envelope.

mod message;
mod payload;

pub use message::{new_subscription_id, ControlMessage, Subscription};
pub use payload::Payload;
