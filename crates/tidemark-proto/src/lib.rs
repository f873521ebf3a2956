//! Wire types for the Tidemark chat synchronization engine.
//!
//! Everything that crosses the process boundary lives here: the canonical
//! [`Chat`], [`Member`], and [`Message`] entities, the socket event codec,
//! and the REST request/response body shapes.
//!
//! # Boundary normalization
//!
//! Backend endpoints are inconsistent about identifier fields (`id` vs
//! `chat_id`) and identifier types (string vs number). All inbound payloads
//! pass through the `Raw*` types in this crate, which resolve those
//! ambiguities exactly once. Nothing downstream ever branches on which field
//! was present.
//!
//! # Defensive decoding
//!
//! Push payloads are untrusted: a malformed `chat:list_update` body must
//! yield an empty list, never a crash and never silently-retained stale
//! state. [`chats_from_value`] is the single place that coercion happens.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod chat;
mod error;
mod events;
mod message;
mod rest;

pub use chat::{Chat, ChatId, Member, MemberRole, RawChat, RawMember, UserId, chats_from_value};
pub use error::DecodeError;
pub use events::{ClientEvent, ServerEvent, TypingPayload};
pub use message::{DeliveryStatus, Message, MessageId, MessageType, SenderRef};
pub use rest::{
    AddMembersRequest, CreateChatRequest, JoinLocalGroupRequest, JoinLocalGroupResponse,
    ReadReceiptRequest, SendMessageRequest, SendMessageResponse,
};
