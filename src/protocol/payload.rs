use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Body of a frame: opaque text or structured JSON.
///
/// A JSON document that is itself a string is kept as `Text`, so a payload
/// always has exactly one representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Text(String),
    Json(Value),
}

impl Payload {
    /// Parse an inbound frame. Callers keep the raw text when this fails.
    pub fn try_parse(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<Value>(raw).map(Self::from)
    }

    /// Locally generated lifecycle notice, e.g. `{"type":"system","message":...}`
    pub fn notice(kind: &str, message: impl Into<String>) -> Self {
        Self::Json(json!({ "type": kind, "message": message.into() }))
    }

    /// Text as it goes on the wire.
    pub fn to_wire(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Json(value) => value.to_string(),
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Json(_))
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(_) => None,
        }
    }

    /// The `streamName` tag of a structured object payload.
    pub fn stream_name(&self) -> Option<&str> {
        self.as_json()?.get("streamName")?.as_str()
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            other => Self::Json(other),
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}
