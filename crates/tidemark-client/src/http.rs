//! REST transport for coordinator-issued HTTP calls.
//!
//! [`ChatApi`] is the seam between the coordinator's [`HttpCall`] vocabulary
//! and actual I/O; [`RestClient`] is the production implementation over
//! `reqwest`. Tests substitute their own `ChatApi` to script responses.
//!
//! Decoding is as defensive here as on the socket: list payloads pass
//! through [`chats_from_value`], single chats through canonicalization, so
//! the coordinator only ever sees normalized shapes.

use async_trait::async_trait;
use serde_json::Value;

use tidemark_proto::{
    Chat, JoinLocalGroupResponse, Message, RawChat, SendMessageResponse, chats_from_value,
};

use crate::event::{HttpCall, HttpResponse};

/// REST transport failure.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Network failure or non-success status.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// 2xx response whose body does not match the endpoint's contract.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

/// Executor for coordinator-issued HTTP calls.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Perform one call and decode its response.
    async fn execute(&self, call: HttpCall) -> Result<HttpResponse, ApiError>;
}

/// Production [`ChatApi`] over the backend's REST surface.
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
}

impl RestClient {
    /// Create a client rooted at `base_url` (no trailing slash required).
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { http: reqwest::Client::new(), base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn decode_chat(raw: RawChat) -> Result<Chat, ApiError> {
        raw.canonicalize().ok_or_else(|| ApiError::Decode("chat payload without an id".to_owned()))
    }
}

#[async_trait]
impl ChatApi for RestClient {
    async fn execute(&self, call: HttpCall) -> Result<HttpResponse, ApiError> {
        match call {
            HttpCall::FetchChatList { user_id } => {
                let value: Value = self
                    .http
                    .get(self.url(&format!("/chat/list/{user_id}")))
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                Ok(HttpResponse::ChatList(chats_from_value(&value)))
            },
            HttpCall::FetchChat { chat_id } => {
                let raw: RawChat = self
                    .http
                    .get(self.url(&format!("/chat/{chat_id}")))
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                Ok(HttpResponse::Chat(Self::decode_chat(raw)?))
            },
            HttpCall::FetchMessages { chat_id } => {
                let messages: Vec<Message> = self
                    .http
                    .get(self.url(&format!("/chat/{chat_id}/messages")))
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                Ok(HttpResponse::Messages(messages))
            },
            HttpCall::SendMessage { chat_id, body } => {
                let sent: SendMessageResponse = self
                    .http
                    .post(self.url(&format!("/chat/{chat_id}/messages")))
                    .json(&body)
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                Ok(HttpResponse::MessageSent(sent))
            },
            HttpCall::MarkRead { body } => {
                self.http
                    .post(self.url("/chat/read"))
                    .json(&body)
                    .send()
                    .await?
                    .error_for_status()?;
                Ok(HttpResponse::Ack)
            },
            HttpCall::CreateChat { body } => {
                let raw: RawChat = self
                    .http
                    .post(self.url("/chat/create"))
                    .json(&body)
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                Ok(HttpResponse::ChatCreated(Self::decode_chat(raw)?))
            },
            HttpCall::AddMembers { chat_id, body } => {
                self.http
                    .post(self.url(&format!("/chat/{chat_id}/add-members")))
                    .json(&body)
                    .send()
                    .await?
                    .error_for_status()?;
                Ok(HttpResponse::Ack)
            },
            HttpCall::RemoveMember { chat_id, member_id } => {
                self.http
                    .delete(self.url(&format!("/chat/{chat_id}/remove-member")))
                    .query(&[("member_id", member_id.as_str())])
                    .send()
                    .await?
                    .error_for_status()?;
                Ok(HttpResponse::Ack)
            },
            HttpCall::DeleteChat { chat_id } => {
                self.http
                    .delete(self.url(&format!("/chat/{chat_id}")))
                    .send()
                    .await?
                    .error_for_status()?;
                Ok(HttpResponse::Ack)
            },
            HttpCall::JoinLocalGroup { body } => {
                let joined: JoinLocalGroupResponse = self
                    .http
                    .post(self.url("/chat/local-groups/join"))
                    .json(&body)
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                Ok(HttpResponse::LocalGroupJoined(joined))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slashes_are_trimmed() {
        let client = RestClient::new("https://api.example.com///");
        assert_eq!(client.url("/chat/read"), "https://api.example.com/chat/read");
    }
}
