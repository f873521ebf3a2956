//! Chat and member entities with boundary normalization.
//!
//! The backend reports chat identifiers as `id` on some endpoints and
//! `chat_id` on others, and occasionally as JSON numbers instead of strings.
//! [`RawChat`] captures whatever arrived; [`RawChat::canonicalize`] is the
//! single mapping function that produces the canonical [`Chat`] shape used
//! everywhere else.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical chat identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub String);

impl ChatId {
    /// Identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChatId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Stable user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Role of a member within a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// Chat creator.
    Owner,
    /// Elevated member.
    Admin,
    /// Regular participant.
    #[default]
    #[serde(other)]
    Member,
}

/// A participant in a chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Stable user identifier.
    pub id: UserId,
    /// Display name, derived at the boundary (never empty).
    pub name: String,
    /// Role within the chat.
    #[serde(default)]
    pub role: MemberRole,
    /// Avatar URL, when the user has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// A conversation, direct or group.
///
/// Invariant: at most one `Chat` per canonical id in any active list; the
/// store enforces this via upsert-by-id semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    /// Canonical identifier (the `id`/`chat_id` ambiguity is resolved before
    /// this type exists).
    pub id: ChatId,
    /// Group name; `None` for direct chats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether this is a group conversation.
    #[serde(default)]
    pub is_group: bool,
    /// Participants, in server order.
    #[serde(default)]
    pub members: Vec<Member>,
    /// Creator's user id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<UserId>,
    /// Creation time, Unix milliseconds.
    #[serde(default)]
    pub created_at: u64,
    /// Last update time, Unix milliseconds. Used for list ordering.
    #[serde(default)]
    pub updated_at: u64,
}

impl Chat {
    /// Look up a member by user id.
    pub fn member(&self, user_id: &UserId) -> Option<&Member> {
        self.members.iter().find(|m| &m.id == user_id)
    }
}

/// Identifier as it appears on the wire: string or number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum FlexId {
    /// String identifier.
    Str(String),
    /// Numeric identifier (older endpoints).
    Num(i64),
}

impl FlexId {
    /// Resolve to a string id; empty strings count as absent.
    fn into_string(self) -> Option<String> {
        match self {
            Self::Str(s) if s.is_empty() => None,
            Self::Str(s) => Some(s),
            Self::Num(n) => Some(n.to_string()),
        }
    }
}

/// Member payload as delivered by the backend.
///
/// Display names are not sent directly; they derive from first/last name with
/// an email fallback.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMember {
    #[serde(default)]
    id: Option<FlexId>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: MemberRole,
    #[serde(default)]
    avatar: Option<String>,
}

impl RawMember {
    /// Resolve to a canonical [`Member`]. `None` when no id was present.
    pub fn canonicalize(self) -> Option<Member> {
        let id = UserId(self.id.and_then(FlexId::into_string)?);
        let full = match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(f), Some(l)) => format!("{f} {l}").trim().to_owned(),
            (Some(f), None) => f.trim().to_owned(),
            (None, Some(l)) => l.trim().to_owned(),
            (None, None) => String::new(),
        };
        let name = if full.is_empty() {
            self.email.unwrap_or_else(|| id.0.clone())
        } else {
            full
        };
        Some(Member { id, name, role: self.role, avatar: self.avatar })
    }
}

/// Chat payload as delivered by the backend, before id normalization.
#[derive(Debug, Clone, Deserialize)]
pub struct RawChat {
    #[serde(default)]
    id: Option<FlexId>,
    #[serde(default)]
    chat_id: Option<FlexId>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    is_group: bool,
    #[serde(default)]
    members: Vec<RawMember>,
    #[serde(default)]
    created_by: Option<FlexId>,
    #[serde(default)]
    created_at: u64,
    #[serde(default)]
    updated_at: u64,
}

impl RawChat {
    /// Resolve the `id`/`chat_id` ambiguity and produce the canonical shape.
    ///
    /// `id` wins when both fields are present. Returns `None` when neither
    /// is, since a chat without an identity cannot be stored.
    pub fn canonicalize(self) -> Option<Chat> {
        let id = self
            .id
            .and_then(FlexId::into_string)
            .or_else(|| self.chat_id.and_then(FlexId::into_string))
            .map(ChatId)?;
        Some(Chat {
            id,
            name: self.name.filter(|n| !n.is_empty()),
            is_group: self.is_group,
            members: self.members.into_iter().filter_map(RawMember::canonicalize).collect(),
            created_by: self.created_by.and_then(FlexId::into_string).map(UserId),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Decode an untrusted chat-list payload, coercing malformed input to `[]`.
///
/// This is the deliberate fallback for bad `chat:list_update` pushes: empty,
/// never a crash, and never the previous state. Entries that fail to decode
/// individually are dropped rather than poisoning the whole list.
pub fn chats_from_value(value: &Value) -> Vec<Chat> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| serde_json::from_value::<RawChat>(item.clone()).ok())
        .filter_map(RawChat::canonicalize)
        .collect()
}
