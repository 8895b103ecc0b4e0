//! Stream attribution over the message log.
//!
//! A message belongs to stream `S` when its payload is a JSON object whose
//! `streamName` is the string `S`. Everything else only shows in the "all"
//! view. These functions scan the log on every call; [`MessageStore`] keeps
//! an incremental per-stream counter for hot paths.
//!
//! [`MessageStore`]: crate::store::MessageStore

use crate::store::Message;

/// Which slice of the log to show
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StreamView {
    #[default]
    All,
    Stream(String),
}

impl StreamView {
    pub fn from_query(stream: Option<&str>) -> Self {
        match stream {
            Some(name) if !name.is_empty() && name != "all" => Self::Stream(name.to_string()),
            _ => Self::All,
        }
    }

    pub fn matches(&self, message: &Message) -> bool {
        match self {
            Self::All => true,
            Self::Stream(name) => belongs_to_stream(message, name),
        }
    }
}

pub fn belongs_to_stream(message: &Message, stream_name: &str) -> bool {
    message.stream_name() == Some(stream_name)
}

pub fn count_stream_messages(messages: &[Message], stream_name: &str) -> usize {
    messages
        .iter()
        .filter(|m| belongs_to_stream(m, stream_name))
        .count()
}

/// Messages tagged with `stream_name`, in log order
pub fn filter_by_stream(messages: &[Message], stream_name: &str) -> Vec<Message> {
    messages
        .iter()
        .filter(|m| belongs_to_stream(m, stream_name))
        .cloned()
        .collect()
}

pub fn filter_messages(messages: &[Message], view: &StreamView) -> Vec<Message> {
    match view {
        StreamView::All => messages.to_vec(),
        StreamView::Stream(name) => filter_by_stream(messages, name),
    }
}
