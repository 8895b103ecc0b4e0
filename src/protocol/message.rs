use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Payload;

/// Binding of a stream and group to a subscription id.
///
/// The same shape is the `data` of both `join` and `leave` frames; a leave
/// only correlates server-side when it carries the id issued by the join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub stream_name: String,
    pub group_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    pub subscription_id: String,
}

impl Subscription {
    /// New binding with a freshly generated subscription id
    pub fn new(stream_name: &str, group_id: &str, item_id: Option<&str>) -> Self {
        Self::with_id(stream_name, group_id, new_subscription_id(), item_id)
    }

    pub fn with_id(
        stream_name: &str,
        group_id: &str,
        subscription_id: impl Into<String>,
        item_id: Option<&str>,
    ) -> Self {
        Self {
            stream_name: stream_name.to_string(),
            group_id: group_id.to_string(),
            item_id: item_id.map(str::to_string),
            subscription_id: subscription_id.into(),
        }
    }
}

pub fn new_subscription_id() -> String {
    format!("sub_{}", Uuid::new_v4().simple())
}

/// Control frames sent from client to server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ControlMessage {
    Join(Subscription),
    Leave(Subscription),
}

impl ControlMessage {
    pub fn subscription(&self) -> &Subscription {
        match self {
            Self::Join(subscription) | Self::Leave(subscription) => subscription,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join(_) => "join",
            Self::Leave(_) => "leave",
        }
    }

    /// Structured payload, as recorded in the message log and sent on the wire
    pub fn to_payload(&self) -> serde_json::Result<Payload> {
        serde_json::to_value(self).map(Payload::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_envelope() {
        let subscription = Subscription::with_id("logs", "default", "sub_1", None);
        let value = serde_json::to_value(ControlMessage::Join(subscription)).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "join",
                "data": {"streamName": "logs", "groupId": "default", "subscriptionId": "sub_1"}
            })
        );
    }

    #[test]
    fn test_leave_envelope_with_item_id() {
        let subscription = Subscription::with_id("todo", "group-a", "sub_2", Some("item-9"));
        let value = serde_json::to_value(ControlMessage::Leave(subscription)).unwrap();
        assert_eq!(value["type"], "leave");
        assert_eq!(value["data"]["itemId"], "item-9");
        assert_eq!(value["data"]["subscriptionId"], "sub_2");
    }

    #[test]
    fn test_subscription_ids_are_unique() {
        let a = Subscription::new("logs", "g", None);
        let b = Subscription::new("logs", "g", None);
        assert_ne!(a.subscription_id, b.subscription_id);
        assert!(a.subscription_id.starts_with("sub_"));
    }

    #[test]
    fn test_parse_control_message() {
        let raw = r#"{"type":"leave","data":{"streamName":"s","groupId":"g","subscriptionId":"x"}}"#;
        let message: ControlMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(message.kind(), "leave");
        assert_eq!(message.subscription().item_id, None);
    }
}
