use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::db::Message;

pub const MESSAGE_KIND: &str = "message";

/// JSON envelope exchanged on the chat socket: `{"type": ..., "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl Frame {
    pub fn new(kind: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self { kind: kind.into(), payload }
    }

    pub fn chat_message(content: impl Into<String>) -> Self {
        let mut payload = Map::new();
        payload.insert("content".to_string(), Value::String(content.into()));
        Self::new(MESSAGE_KIND, payload)
    }

    /// `payload.content` when present and a string.
    pub fn content(&self) -> Option<&str> {
        self.payload.get("content").and_then(Value::as_str)
    }

    /// Echo of this frame annotated with the stored message's identity.
    pub fn echo(&self, message: &Message) -> Self {
        let mut payload = self.payload.clone();
        payload.insert("content".to_string(), Value::from(message.content.clone()));
        payload.insert("id".to_string(), Value::from(message.id));
        payload.insert("user_id".to_string(), Value::from(message.user_id));
        payload.insert("created_at".to_string(), Value::from(message.created_at));
        Self::new(self.kind.clone(), payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let frame: Frame =
            serde_json::from_str(r#"{"type":"message","payload":{"content":"hi"}}"#).unwrap();
        assert_eq!(frame.kind, MESSAGE_KIND);
        assert_eq!(frame.content(), Some("hi"));

        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["payload"]["content"], "hi");
    }

    #[test]
    fn test_content_must_be_a_string() {
        let frame: Frame =
            serde_json::from_str(r#"{"type":"message","payload":{"content":42}}"#).unwrap();
        assert_eq!(frame.content(), None);

        let bare: Frame = serde_json::from_str(r#"{"type":"message"}"#).unwrap();
        assert_eq!(bare.content(), None);
    }

    #[test]
    fn test_echo_keeps_envelope() {
        let frame = Frame::chat_message("hi");
        let message = Message { id: 9, user_id: 4, content: "hi".into(), created_at: 77 };

        let echo = frame.echo(&message);
        assert_eq!(echo.kind, MESSAGE_KIND);
        assert_eq!(echo.content(), Some("hi"));
        assert_eq!(echo.payload["user_id"], 4);
        assert_eq!(echo.payload["id"], 9);
    }
}
