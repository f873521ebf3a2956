//! REST request/response body shapes.
//!
//! Endpoints that return a chat (`POST /chat/create`, `GET /chat/{id}`,
//! `POST /chat/local-groups/join` follow-ups) are decoded through
//! [`crate::RawChat`]; only the bodies with fixed shapes live here.

use serde::{Deserialize, Serialize};

use crate::{
    chat::UserId,
    message::{MessageId, MessageType},
};

/// Body of `POST /chat/{chatId}/messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    /// Sending user.
    pub sender_id: UserId,
    /// Message body.
    pub message: String,
    /// Content kind.
    pub message_type: MessageType,
}

/// Response of `POST /chat/{chatId}/messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageResponse {
    /// Server-assigned id of the stored message.
    pub message_id: MessageId,
}

/// Body of `POST /chat/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateChatRequest {
    /// Creating user.
    pub user_id: UserId,
    /// Other participants.
    pub participant_ids: Vec<UserId>,
    /// Whether to create a group conversation.
    pub is_group: bool,
    /// Group name; omitted for direct chats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
}

/// Body of `POST /chat/read`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReceiptRequest {
    /// Acknowledging user.
    pub user_id: UserId,
    /// Most recent message the user has seen.
    pub message_id: MessageId,
}

/// Body of `POST /chat/{chatId}/add-members`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddMembersRequest {
    /// Users to add.
    pub member_ids: Vec<UserId>,
}

/// Body of `POST /chat/local-groups/join`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinLocalGroupRequest {
    /// Joining user (this endpoint uses camelCase).
    #[serde(rename = "userId")]
    pub user_id: UserId,
    /// Device latitude.
    pub latitude: f64,
    /// Device longitude.
    pub longitude: f64,
    /// Reverse-geocoded address label.
    pub address: String,
}

/// Response of `POST /chat/local-groups/join`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinLocalGroupResponse {
    /// Chat the user was placed into.
    pub chat_id: crate::chat::ChatId,
}
