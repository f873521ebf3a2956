//! Socket event codec.
//!
//! Events travel as JSON text frames shaped `{"event": <name>, "data": ...}`.
//! Inbound frames decode to [`ServerEvent`]; outbound [`ClientEvent`]s encode
//! to the same envelope.
//!
//! `chat:list_update` data is deliberately kept as a raw [`serde_json::Value`]
//! so the defensive empty-list coercion happens in exactly one place
//! ([`crate::chats_from_value`]), after debouncing.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    chat::{ChatId, UserId},
    error::DecodeError,
    message::Message,
};

/// Inbound event names.
mod inbound {
    pub const NEW_MESSAGE: &str = "chat:new_message";
    pub const TYPING_START: &str = "chat:typing_start";
    pub const TYPING_STOP: &str = "chat:typing_stop";
    pub const LIST_UPDATE: &str = "chat:list_update";
}

/// Outbound event names.
mod outbound {
    pub const JOIN_USER_ROOM: &str = "join_user_room";
    pub const JOIN_CHAT: &str = "join_chat";
    pub const LEAVE_CHAT: &str = "leave_chat";
    pub const TYPING_START: &str = "chat:typing_start";
    pub const TYPING_STOP: &str = "chat:typing_stop";
}

/// Payload of typing start/stop events, both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingPayload {
    /// Chat the typing activity belongs to.
    pub chat_id: ChatId,
    /// User doing the typing.
    pub user_id: UserId,
}

/// Event pushed by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// A new message in some chat.
    NewMessage(Message),
    /// A user started typing.
    TypingStart(TypingPayload),
    /// A user stopped typing.
    TypingStop(TypingPayload),
    /// Full active-chat-list snapshot; raw because the payload is untrusted.
    ListUpdate(Value),
}

/// Wire envelope for both directions.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    data: Value,
}

impl ServerEvent {
    /// Decode an inbound text frame.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let envelope: Envelope = serde_json::from_str(text)?;
        let name = envelope.event.ok_or(DecodeError::MissingEvent)?;
        match name.as_str() {
            inbound::NEW_MESSAGE => {
                let message: Message = serde_json::from_value(envelope.data).map_err(|e| {
                    DecodeError::Payload { event: inbound::NEW_MESSAGE, reason: e.to_string() }
                })?;
                Ok(Self::NewMessage(message))
            },
            inbound::TYPING_START => {
                let payload = decode_typing(inbound::TYPING_START, envelope.data)?;
                Ok(Self::TypingStart(payload))
            },
            inbound::TYPING_STOP => {
                let payload = decode_typing(inbound::TYPING_STOP, envelope.data)?;
                Ok(Self::TypingStop(payload))
            },
            inbound::LIST_UPDATE => Ok(Self::ListUpdate(envelope.data)),
            other => Err(DecodeError::UnknownEvent(other.to_owned())),
        }
    }
}

fn decode_typing(event: &'static str, data: Value) -> Result<TypingPayload, DecodeError> {
    serde_json::from_value(data).map_err(|e| DecodeError::Payload { event, reason: e.to_string() })
}

/// Event emitted by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Join the private per-user channel after the handshake.
    JoinUserRoom {
        /// Session user id.
        user_id: UserId,
    },
    /// Subscribe to a chat's room.
    JoinChat {
        /// Chat to join.
        chat_id: ChatId,
    },
    /// Unsubscribe from a chat's room.
    LeaveChat {
        /// Chat to leave.
        chat_id: ChatId,
    },
    /// Local user started typing.
    TypingStart(TypingPayload),
    /// Local user stopped typing.
    TypingStop(TypingPayload),
}

impl ClientEvent {
    /// Event name on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinUserRoom { .. } => outbound::JOIN_USER_ROOM,
            Self::JoinChat { .. } => outbound::JOIN_CHAT,
            Self::LeaveChat { .. } => outbound::LEAVE_CHAT,
            Self::TypingStart(_) => outbound::TYPING_START,
            Self::TypingStop(_) => outbound::TYPING_STOP,
        }
    }

    /// Encode to a JSON text frame.
    pub fn encode(&self) -> String {
        let data = match self {
            Self::JoinUserRoom { user_id } => json!({ "user_id": user_id }),
            Self::JoinChat { chat_id } => json!({ "chat_id": chat_id }),
            Self::LeaveChat { chat_id } => json!({ "chat_id": chat_id }),
            Self::TypingStart(p) | Self::TypingStop(p) => {
                json!({ "chat_id": p.chat_id, "user_id": p.user_id })
            },
        };
        json!({ "event": self.name(), "data": data }).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_new_message() {
        let text = r#"{"event":"chat:new_message","data":{"id":"m1","chat_id":"c1","sender":{"id":"u1"},"content":"hi"}}"#;
        let event = ServerEvent::decode(text).unwrap();
        match event {
            ServerEvent::NewMessage(m) => {
                assert_eq!(m.id.as_str(), "m1");
                assert_eq!(m.content, "hi");
            },
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn decodes_typing_events() {
        let text = r#"{"event":"chat:typing_start","data":{"chat_id":"c1","user_id":"u2"}}"#;
        let event = ServerEvent::decode(text).unwrap();
        assert_eq!(
            event,
            ServerEvent::TypingStart(TypingPayload {
                chat_id: ChatId::from("c1"),
                user_id: UserId::from("u2"),
            })
        );
    }

    #[test]
    fn list_update_keeps_raw_payload() {
        let text = r#"{"event":"chat:list_update","data":"garbage"}"#;
        match ServerEvent::decode(text).unwrap() {
            ServerEvent::ListUpdate(value) => assert_eq!(value, Value::String("garbage".into())),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn unknown_event_is_an_error() {
        let text = r#"{"event":"weather:update","data":{}}"#;
        assert!(matches!(
            ServerEvent::decode(text),
            Err(DecodeError::UnknownEvent(name)) if name == "weather:update"
        ));
    }

    #[test]
    fn missing_event_name_is_an_error() {
        assert!(matches!(
            ServerEvent::decode(r#"{"data":{}}"#),
            Err(DecodeError::MissingEvent)
        ));
    }

    #[test]
    fn outbound_events_round_trip_through_inbound_decoder() {
        // typing_start/stop share names in both directions
        let event = ClientEvent::TypingStart(TypingPayload {
            chat_id: ChatId::from("c1"),
            user_id: UserId::from("me"),
        });
        let decoded = ServerEvent::decode(&event.encode()).unwrap();
        assert!(matches!(decoded, ServerEvent::TypingStart(p) if p.user_id.as_str() == "me"));
    }

    #[test]
    fn join_events_encode_expected_envelope() {
        let event = ClientEvent::JoinChat { chat_id: ChatId::from("c3") };
        let value: Value = serde_json::from_str(&event.encode()).unwrap();
        assert_eq!(value["event"], "join_chat");
        assert_eq!(value["data"]["chat_id"], "c3");
    }
}
