//! Opaque agent messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One structured item emitted by the agent runtime.
///
/// The content is never interpreted by the invocation layer; the accessors exist
/// so callers can log what passed through. Key order and number text survive a
/// parse and re-serialize unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(Value);

impl Message {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// The `type` field, when the message is an object carrying one.
    pub fn message_type(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }
}

impl From<Value> for Message {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_transparently() {
        let message = Message::from(json!({"type": "message", "content": "Hello"}));
        let encoded = serde_json::to_value(&message).expect("serialize");
        assert_eq!(encoded, json!({"type": "message", "content": "Hello"}));
        assert_eq!(message.message_type(), Some("message"));
    }

    #[test]
    fn reserializes_agent_line_verbatim() {
        let line = r#"{"type":"assistant","zeta":1,"alpha":18446744073709551616,"ratio":0.1000000000000000055511151231257827}"#;
        let message: Message = serde_json::from_str(line).expect("parse");
        assert_eq!(serde_json::to_string(&message).expect("serialize"), line);
    }

    #[test]
    fn message_type_is_optional() {
        assert_eq!(Message::new(json!(["not", "an", "object"])).message_type(), None);
        assert_eq!(Message::new(json!({"type": 3})).message_type(), None);
    }
}
