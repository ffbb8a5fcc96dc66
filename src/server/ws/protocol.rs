use serde::{Deserialize, Serialize};

use crate::rag::RetrievedPassage;
use crate::session::Turn;

#[derive(Debug, Deserialize, Default)]
pub struct WsIncomingMessage {
    #[serde(rename = "type")]
    pub msg_type: Option<String>,
    pub message: Option<String>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

impl WsIncomingMessage {
    pub fn is_stop(&self) -> bool {
        self.msg_type.as_deref() == Some("stop")
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsOutgoingMessage<'a> {
    Session {
        #[serde(rename = "sessionId")]
        session_id: &'a str,
    },
    History {
        #[serde(rename = "sessionId")]
        session_id: &'a str,
        messages: &'a [Turn],
    },
    Sources {
        #[serde(rename = "standaloneQuery")]
        standalone_query: &'a str,
        passages: &'a [RetrievedPassage],
    },
    Chunk {
        message: &'a str,
    },
    Done {
        #[serde(rename = "sessionId")]
        session_id: &'a str,
    },
    Stopped,
    Error {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn outgoing_messages_are_tagged_by_type() {
        let value = serde_json::to_value(WsOutgoingMessage::Session { session_id: "abc" })
            .expect("serialize");
        assert_eq!(value, json!({"type": "session", "sessionId": "abc"}));

        let value = serde_json::to_value(WsOutgoingMessage::Stopped).expect("serialize");
        assert_eq!(value, json!({"type": "stopped"}));

        let value = serde_json::to_value(WsOutgoingMessage::Chunk { message: "주택" })
            .expect("serialize");
        assert_eq!(value["type"], Value::from("chunk"));
        assert_eq!(value["message"], Value::from("주택"));
    }

    #[test]
    fn incoming_message_tolerates_missing_fields() {
        let incoming: WsIncomingMessage =
            serde_json::from_str(r#"{"type":"stop"}"#).expect("parse");
        assert!(incoming.is_stop());
        assert!(incoming.message.is_none());

        let incoming: WsIncomingMessage =
            serde_json::from_str(r#"{"type":"set_session","sessionId":"s-1"}"#).expect("parse");
        assert_eq!(incoming.session_id.as_deref(), Some("s-1"));
    }
}
