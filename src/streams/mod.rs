//! Stream correlation: per-stream counts and filtering of the message log,
//! and the consumer-side subscription registry.

mod filter;
mod registry;

pub use filter::{
    belongs_to_stream, count_stream_messages, filter_by_stream, filter_messages, StreamView,
};
pub use registry::StreamRegistry;
