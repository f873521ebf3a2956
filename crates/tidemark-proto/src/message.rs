//! Message entities.
//!
//! A message id is either server-assigned and permanent, or a locally
//! generated temporary id (`temp-<session>-<seq>`) carried by an optimistic
//! echo until the server confirms the send.

use serde::{Deserialize, Serialize};

use crate::chat::{ChatId, UserId};

/// Prefix marking locally generated, unconfirmed message ids.
const TEMP_PREFIX: &str = "temp-";

/// Message identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    /// Build a temporary id unique within a session.
    ///
    /// `session` is a per-session nonce and `seq` a monotonic counter, so
    /// collisions cannot occur in practice even across rapid queueing.
    pub fn temp(session: u64, seq: u64) -> Self {
        Self(format!("{TEMP_PREFIX}{session:x}-{seq}"))
    }

    /// Whether this id is a temporary, locally generated one.
    pub fn is_temp(&self) -> bool {
        self.0.starts_with(TEMP_PREFIX)
    }

    /// Identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Minimal sender reference carried on each message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderRef {
    /// Sender's user id.
    pub id: UserId,
}

/// Kind of message content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Plain text.
    #[default]
    Text,
    /// Shared location.
    Location,
    /// Quiz card.
    Quiz,
    /// Poll card.
    Poll,
    /// Anything this client version does not understand; rendered generically.
    #[serde(other)]
    Other,
}

/// Delivery state of a locally originated message.
///
/// Confirmed messages carry no status on the wire; `None` means confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Queued locally, not yet acknowledged by the server.
    Pending,
    /// Explicitly acknowledged (some endpoints echo this back).
    Sent,
}

/// A single chat message.
///
/// Within a chat's timeline message ids are unique; the store's append
/// operation is idempotent on id to tolerate duplicate delivery from
/// overlapping REST fetches and socket pushes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Server-assigned id, or a temporary id while unconfirmed.
    pub id: MessageId,
    /// Owning chat.
    pub chat_id: ChatId,
    /// Sender reference.
    pub sender: SenderRef,
    /// Message body.
    #[serde(default)]
    pub content: String,
    /// Content kind.
    #[serde(default)]
    pub message_type: MessageType,
    /// Send time, Unix milliseconds.
    #[serde(default)]
    pub timestamp: u64,
    /// Delivery state; `None` means confirmed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DeliveryStatus>,
}

impl Message {
    /// Whether this is an unconfirmed local echo.
    pub fn is_pending(&self) -> bool {
        self.status == Some(DeliveryStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn temp_ids_are_recognizable_and_distinct() {
        let a = MessageId::temp(0xfeed, 1);
        let b = MessageId::temp(0xfeed, 2);
        assert!(a.is_temp());
        assert_ne!(a, b);
        assert!(!MessageId::from("m-42").is_temp());
    }

    #[test]
    fn message_decodes_with_minimal_fields() {
        let msg: Message = serde_json::from_value(json!({
            "id": "m1",
            "chat_id": "c1",
            "sender": { "id": "u1" },
        }))
        .unwrap();
        assert_eq!(msg.message_type, MessageType::Text);
        assert_eq!(msg.status, None);
        assert!(!msg.is_pending());
    }

    #[test]
    fn unknown_message_type_decodes_as_other() {
        let msg: Message = serde_json::from_value(json!({
            "id": "m1",
            "chat_id": "c1",
            "sender": { "id": "u1" },
            "message_type": "hologram",
        }))
        .unwrap();
        assert_eq!(msg.message_type, MessageType::Other);
    }

    #[test]
    fn confirmed_message_serializes_without_status() {
        let msg = Message {
            id: MessageId::from("m1"),
            chat_id: ChatId::from("c1"),
            sender: SenderRef { id: UserId::from("u1") },
            content: "hi".into(),
            message_type: MessageType::Text,
            timestamp: 0,
            status: None,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert!(value.get("status").is_none());
    }
}
