//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the
//! chat assistant.

use learnhub_core::domain::ChatMessage;
use serde::{Deserialize, Serialize};

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A chat line typed by the user. The assistant answers after a short delay.
    Message { text: String },

    /// Asks for the stored conversation again.
    History,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The user's stored conversation, oldest first. Sent on connect.
    History { messages: Vec<ChatMessage> },

    /// A stored message from either side.
    Message { message: ChatMessage },

    /// The assistant is composing a reply.
    Typing,

    /// Something went wrong with the last request; the connection stays open.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_are_tagged_by_type() {
        let parsed: ClientMessage =
            serde_json::from_str(r#"{"type":"message","text":"hello"}"#).unwrap();
        assert!(matches!(parsed, ClientMessage::Message { text } if text == "hello"));
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"history"}"#).unwrap(),
            ClientMessage::History
        ));
    }

    #[test]
    fn typing_serializes_to_bare_tag() {
        let json = serde_json::to_string(&ServerMessage::Typing).unwrap();
        assert_eq!(json, r#"{"type":"typing"}"#);
    }
}
