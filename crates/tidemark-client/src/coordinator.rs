//! Synchronization coordinator state machine.
//!
//! The `Coordinator` is the top-level state machine that keeps the
//! [`ChatStore`] consistent under interleaved inputs: REST completions,
//! socket pushes, user intents, and connectivity transitions. It owns no I/O;
//! it consumes [`SyncEvent`]s and produces [`SyncAction`]s for the caller to
//! execute, feeding HTTP completions back as further events.
//!
//! # Ordering and idempotence
//!
//! - Timelines keep append order; the idempotent store append makes the
//!   overlap between a history fetch and a socket push harmless.
//! - The offline-queue flush is strictly sequential per chat: the next send
//!   is issued only when the previous completes, so the server never sees
//!   concurrent sends that it could reorder.
//! - Fetches carry generation tokens; a completion that is not the latest
//!   issued for its resource is dropped rather than clobbering newer state.

use std::collections::{HashMap, VecDeque};

use tidemark_core::{ChatStore, Debouncer, env::Environment};
use tidemark_proto::{
    AddMembersRequest, ChatId, ClientEvent, CreateChatRequest, JoinLocalGroupRequest, Message,
    MessageType, ReadReceiptRequest, SendMessageRequest, SenderRef, ServerEvent, TypingPayload,
    UserId, chats_from_value,
};

use crate::event::{HttpCall, HttpResponse, HttpToken, SyncAction, SyncEvent};

/// Quiet window for collapsing `chat:list_update` bursts.
const LIST_UPDATE_WINDOW: std::time::Duration = std::time::Duration::from_millis(200);

/// Local typing inactivity before emitting `chat:typing_stop`.
const TYPING_IDLE: std::time::Duration = std::time::Duration::from_millis(1500);

/// Intent recorded for an in-flight HTTP call.
#[derive(Debug, Clone)]
enum PendingCall {
    /// Active chat list fetch.
    ChatList,
    /// Single-chat metadata fetch.
    ChatMeta { chat_id: ChatId },
    /// Full history fetch.
    Messages { chat_id: ChatId },
    /// Online user-submitted send.
    DirectSend { chat_id: ChatId, content: String, message_type: MessageType },
    /// One entry of an offline-queue flush.
    FlushSend { entry: Message },
    /// Best-effort read receipt.
    MarkRead { chat_id: ChatId },
    /// Group creation from the draft staging list.
    CreateGroup,
    /// Membership addition.
    AddMembers { chat_id: ChatId },
    /// Membership removal.
    RemoveMember { chat_id: ChatId },
    /// Chat deletion.
    DeleteChat { chat_id: ChatId },
    /// Location-based group join.
    JoinLocalGroup,
}

/// Client-side chat synchronization state machine.
pub struct Coordinator<E: Environment> {
    /// Environment for time and randomness.
    env: E,

    /// Session user.
    user_id: UserId,

    /// The normalized chat state this coordinator maintains.
    store: ChatStore,

    /// Last known connectivity.
    online: bool,

    /// Monotonic source for HTTP correlation tokens.
    next_token: u64,

    /// In-flight HTTP calls by token.
    pending: HashMap<HttpToken, PendingCall>,

    /// Latest chat-list fetch; older completions are stale.
    latest_list_fetch: Option<HttpToken>,

    /// Latest metadata fetch per chat.
    latest_chat_fetch: HashMap<ChatId, HttpToken>,

    /// Latest history fetch per chat.
    latest_messages_fetch: HashMap<ChatId, HttpToken>,

    /// Debounced `chat:list_update` payloads, last snapshot wins.
    list_debounce: Debouncer<serde_json::Value, E::Instant>,

    /// Chats where we have emitted `typing_start`, with last input time.
    typing_out: HashMap<ChatId, E::Instant>,

    /// Flush entries not yet issued, per chat. The in-flight entry lives in
    /// `pending`, so a non-empty map here means a flush is mid-pass.
    flushing: HashMap<ChatId, VecDeque<Message>>,
}

impl<E: Environment> Coordinator<E> {
    /// Create a coordinator for the given session user.
    ///
    /// Starts offline; the caller reports connectivity via
    /// [`SyncEvent::ConnectivityChanged`].
    pub fn new(env: E, user_id: UserId) -> Self {
        let session_nonce = env.random_u64();
        Self {
            env,
            user_id,
            store: ChatStore::new(session_nonce),
            online: false,
            next_token: 0,
            pending: HashMap::new(),
            latest_list_fetch: None,
            latest_chat_fetch: HashMap::new(),
            latest_messages_fetch: HashMap::new(),
            list_debounce: Debouncer::new(LIST_UPDATE_WINDOW),
            typing_out: HashMap::new(),
            flushing: HashMap::new(),
        }
    }

    /// Session user id.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Last known connectivity.
    pub fn is_online(&self) -> bool {
        self.online
    }

    /// The chat state, for rendering.
    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    /// Issue the initial chat-list fetch for a fresh session.
    pub fn bootstrap(&mut self) -> Vec<SyncAction> {
        vec![self.issue_list_fetch()]
    }

    /// Wind the session down.
    ///
    /// A snapshot still waiting out its debounce window is applied
    /// immediately so it is not lost, and every armed typing indicator gets
    /// its `typing_stop`, since no further input will ever arrive.
    pub fn shutdown(&mut self) -> Vec<SyncAction> {
        if let Some(snapshot) = self.list_debounce.flush() {
            self.store.replace_active_chats(chats_from_value(&snapshot));
        }
        let typing: Vec<ChatId> = self.typing_out.drain().map(|(chat_id, _)| chat_id).collect();
        typing.into_iter().map(|chat_id| self.emit_typing_stop(chat_id)).collect()
    }

    /// Process an event and return actions for the caller to execute.
    pub fn handle(&mut self, event: SyncEvent<E::Instant>) -> Vec<SyncAction> {
        match event {
            SyncEvent::Tick { now } => self.handle_tick(now),
            SyncEvent::ConnectivityChanged { online } => self.handle_connectivity(online),
            SyncEvent::Socket(server_event) => self.handle_socket(server_event),
            SyncEvent::OpenChat { chat_id } => self.handle_open_chat(chat_id),
            SyncEvent::CloseChat { chat_id } => self.handle_close_chat(&chat_id),
            SyncEvent::SubmitMessage { chat_id, content } => self.handle_submit(chat_id, content),
            SyncEvent::InputChanged { chat_id } => self.handle_input_changed(chat_id),
            SyncEvent::ViewedLatest { chat_id } => self.handle_viewed_latest(&chat_id),
            SyncEvent::AddDraftUser(member) => {
                self.store.add_draft_user(member);
                vec![]
            },
            SyncEvent::RemoveDraftUser(member_id) => {
                self.store.remove_draft_user(&member_id);
                vec![]
            },
            SyncEvent::ClearDraftUsers => {
                self.store.clear_draft_users();
                vec![]
            },
            SyncEvent::CreateGroup { name } => self.handle_create_group(name),
            SyncEvent::AddMembers { chat_id, member_ids } => {
                vec![
                    self.issue(
                        HttpCall::AddMembers {
                            chat_id: chat_id.clone(),
                            body: AddMembersRequest { member_ids },
                        },
                        PendingCall::AddMembers { chat_id },
                    ),
                ]
            },
            SyncEvent::RemoveMember { chat_id, member_id } => {
                vec![
                    self.issue(
                        HttpCall::RemoveMember { chat_id: chat_id.clone(), member_id },
                        PendingCall::RemoveMember { chat_id },
                    ),
                ]
            },
            SyncEvent::DeleteChat { chat_id } => {
                vec![
                    self.issue(
                        HttpCall::DeleteChat { chat_id: chat_id.clone() },
                        PendingCall::DeleteChat { chat_id },
                    ),
                ]
            },
            SyncEvent::JoinLocalGroup { latitude, longitude, address } => {
                let body = JoinLocalGroupRequest {
                    user_id: self.user_id.clone(),
                    latitude,
                    longitude,
                    address,
                };
                vec![self.issue(HttpCall::JoinLocalGroup { body }, PendingCall::JoinLocalGroup)]
            },
            SyncEvent::HttpSucceeded { token, response } => self.handle_success(token, response),
            SyncEvent::HttpFailed { token, error } => self.handle_failure(token, &error),
        }
    }

    // ---- Time ----

    fn handle_tick(&mut self, now: E::Instant) -> Vec<SyncAction> {
        let mut actions = Vec::new();

        if let Some(snapshot) = self.list_debounce.poll(now) {
            self.store.replace_active_chats(chats_from_value(&snapshot));
        }

        let expired: Vec<ChatId> = self
            .typing_out
            .iter()
            .filter(|(_, last_input)| now - **last_input >= TYPING_IDLE)
            .map(|(chat_id, _)| chat_id.clone())
            .collect();
        for chat_id in expired {
            self.typing_out.remove(&chat_id);
            actions.push(self.emit_typing_stop(chat_id));
        }

        actions
    }

    // ---- Connectivity and flush ----

    fn handle_connectivity(&mut self, online: bool) -> Vec<SyncAction> {
        self.online = online;
        if online { self.start_flushes() } else { Vec::new() }
    }

    /// Begin a sequential flush for every chat with queued messages.
    ///
    /// Per chat, only the first entry is issued here; each completion issues
    /// the next, which is what keeps the replay ordered.
    fn start_flushes(&mut self) -> Vec<SyncAction> {
        let mut actions = Vec::new();
        for chat_id in self.store.queued_chat_ids() {
            if self.flushing.contains_key(&chat_id) {
                // A pass for this chat is already mid-flight
                continue;
            }
            let mut remaining: VecDeque<Message> = self.store.take_queue(&chat_id).into();
            if let Some(entry) = remaining.pop_front() {
                self.flushing.insert(chat_id, remaining);
                actions.push(self.issue_flush_send(entry));
            }
        }
        actions
    }

    fn issue_flush_send(&mut self, entry: Message) -> SyncAction {
        let call = HttpCall::SendMessage {
            chat_id: entry.chat_id.clone(),
            body: SendMessageRequest {
                sender_id: entry.sender.id.clone(),
                message: entry.content.clone(),
                message_type: entry.message_type,
            },
        };
        self.issue(call, PendingCall::FlushSend { entry })
    }

    /// Issue the next flush entry for a chat, or finish the pass.
    fn continue_flush(&mut self, chat_id: &ChatId) -> Vec<SyncAction> {
        if !self.online {
            // Connectivity dropped mid-pass: park the remainder for the next
            // reconnect
            if let Some(remaining) = self.flushing.remove(chat_id) {
                for entry in remaining {
                    self.store.requeue(chat_id, entry);
                }
            }
            return Vec::new();
        }

        match self.flushing.get_mut(chat_id).and_then(VecDeque::pop_front) {
            Some(entry) => vec![self.issue_flush_send(entry)],
            None => {
                self.flushing.remove(chat_id);
                Vec::new()
            },
        }
    }

    // ---- Socket pushes ----

    fn handle_socket(&mut self, event: ServerEvent) -> Vec<SyncAction> {
        match event {
            ServerEvent::NewMessage(message) => {
                self.store.append_message(message);
            },
            ServerEvent::TypingStart(payload) => {
                if payload.user_id == self.user_id {
                    // No self-typing indicator
                    return Vec::new();
                }
                let member = self
                    .store
                    .chat(&payload.chat_id)
                    .and_then(|chat| chat.member(&payload.user_id))
                    .cloned();
                match member {
                    Some(member) => self.store.add_typing_user(&payload.chat_id, member),
                    None => tracing::debug!(
                        chat_id = %payload.chat_id,
                        user_id = %payload.user_id,
                        "typing_start from unknown member ignored"
                    ),
                }
            },
            ServerEvent::TypingStop(payload) => {
                self.store.remove_typing_user(&payload.chat_id, &payload.user_id);
            },
            ServerEvent::ListUpdate(snapshot) => {
                let now = self.env.now();
                self.list_debounce.offer(snapshot, now);
            },
        }
        Vec::new()
    }

    // ---- Chat room lifecycle ----

    fn handle_open_chat(&mut self, chat_id: ChatId) -> Vec<SyncAction> {
        let mut actions =
            vec![SyncAction::Emit(ClientEvent::JoinChat { chat_id: chat_id.clone() })];
        if self.store.messages(&chat_id).is_empty() {
            actions.push(self.issue_messages_fetch(chat_id.clone()));
        }
        // Metadata is refetched unconditionally to catch out-of-band
        // membership changes
        actions.push(self.issue_chat_fetch(chat_id));
        actions
    }

    fn handle_close_chat(&mut self, chat_id: &ChatId) -> Vec<SyncAction> {
        let mut actions = Vec::new();
        if self.typing_out.remove(chat_id).is_some() {
            actions.push(self.emit_typing_stop(chat_id.clone()));
        }
        actions.push(SyncAction::Emit(ClientEvent::LeaveChat { chat_id: chat_id.clone() }));
        actions
    }

    // ---- Sending ----

    fn handle_submit(&mut self, chat_id: ChatId, content: String) -> Vec<SyncAction> {
        self.typing_out.remove(&chat_id);
        // Sending always stops the typing indicator, timer or not
        let mut actions = vec![self.emit_typing_stop(chat_id.clone())];

        if self.online {
            let body = SendMessageRequest {
                sender_id: self.user_id.clone(),
                message: content.clone(),
                message_type: MessageType::Text,
            };
            actions.push(self.issue(
                HttpCall::SendMessage { chat_id: chat_id.clone(), body },
                PendingCall::DirectSend { chat_id, content, message_type: MessageType::Text },
            ));
        } else {
            let now_ms = self.env.unix_millis();
            let user_id = self.user_id.clone();
            self.store.queue_message(&chat_id, &user_id, &content, now_ms);
        }
        actions
    }

    fn handle_input_changed(&mut self, chat_id: ChatId) -> Vec<SyncAction> {
        let now = self.env.now();
        let newly_typing = self.typing_out.insert(chat_id.clone(), now).is_none();
        if newly_typing {
            vec![SyncAction::Emit(ClientEvent::TypingStart(TypingPayload {
                chat_id,
                user_id: self.user_id.clone(),
            }))]
        } else {
            Vec::new()
        }
    }

    // ---- Read tracking ----

    fn handle_viewed_latest(&mut self, chat_id: &ChatId) -> Vec<SyncAction> {
        let Some(latest_id) = self.store.latest_message(chat_id).map(|m| m.id.clone()) else {
            return Vec::new();
        };
        self.store.set_last_read(chat_id, latest_id.clone());
        let body = ReadReceiptRequest { user_id: self.user_id.clone(), message_id: latest_id };
        vec![self.issue(
            HttpCall::MarkRead { body },
            PendingCall::MarkRead { chat_id: chat_id.clone() },
        )]
    }

    // ---- Group creation ----

    fn handle_create_group(&mut self, name: String) -> Vec<SyncAction> {
        let participant_ids: Vec<UserId> =
            self.store.draft_users().iter().map(|m| m.id.clone()).collect();
        if participant_ids.is_empty() {
            return vec![SyncAction::Notify {
                message: "Select at least one member to create a group".to_owned(),
            }];
        }
        let body = CreateChatRequest {
            user_id: self.user_id.clone(),
            participant_ids,
            is_group: true,
            group_name: Some(name),
        };
        vec![self.issue(HttpCall::CreateChat { body }, PendingCall::CreateGroup)]
    }

    // ---- HTTP completions ----

    fn handle_success(&mut self, token: HttpToken, response: HttpResponse) -> Vec<SyncAction> {
        let Some(intent) = self.pending.remove(&token) else {
            tracing::debug!(?token, "completion for unknown token dropped");
            return Vec::new();
        };

        match (intent, response) {
            (PendingCall::ChatList, HttpResponse::ChatList(chats)) => {
                if self.latest_list_fetch == Some(token) {
                    self.latest_list_fetch = None;
                    self.store.replace_active_chats(chats);
                } else {
                    tracing::debug!(?token, "stale chat list response dropped");
                }
                Vec::new()
            },
            (PendingCall::ChatMeta { chat_id }, HttpResponse::Chat(chat)) => {
                if self.latest_chat_fetch.get(&chat_id) == Some(&token) {
                    self.latest_chat_fetch.remove(&chat_id);
                    self.store.upsert_chat(chat);
                } else {
                    tracing::debug!(%chat_id, "stale chat metadata response dropped");
                }
                Vec::new()
            },
            (PendingCall::Messages { chat_id }, HttpResponse::Messages(messages)) => {
                if self.latest_messages_fetch.get(&chat_id) == Some(&token) {
                    self.latest_messages_fetch.remove(&chat_id);
                    self.store.replace_messages(&chat_id, messages);
                } else {
                    tracing::debug!(%chat_id, "stale history response dropped");
                }
                Vec::new()
            },
            (
                PendingCall::DirectSend { chat_id, content, message_type },
                HttpResponse::MessageSent(sent),
            ) => {
                let confirmed = Message {
                    id: sent.message_id,
                    chat_id,
                    sender: SenderRef { id: self.user_id.clone() },
                    content,
                    message_type,
                    timestamp: self.env.unix_millis(),
                    status: None,
                };
                // Idempotent append: the socket echo may already be in
                self.store.append_message(confirmed);
                Vec::new()
            },
            (PendingCall::FlushSend { entry }, HttpResponse::MessageSent(sent)) => {
                let chat_id = entry.chat_id.clone();
                let confirmed = Message {
                    id: sent.message_id,
                    chat_id: chat_id.clone(),
                    sender: entry.sender.clone(),
                    content: entry.content.clone(),
                    message_type: entry.message_type,
                    timestamp: entry.timestamp,
                    status: None,
                };
                self.store.resolve_pending(&chat_id, &entry.id, confirmed);
                self.continue_flush(&chat_id)
            },
            (PendingCall::MarkRead { .. }, _) => Vec::new(),
            (PendingCall::CreateGroup, HttpResponse::ChatCreated(chat)) => {
                self.store.clear_draft_users();
                let chat_id = chat.id.clone();
                self.store.upsert_chat(chat);
                vec![SyncAction::Emit(ClientEvent::JoinChat { chat_id })]
            },
            (
                PendingCall::AddMembers { chat_id } | PendingCall::RemoveMember { chat_id },
                HttpResponse::Ack,
            ) => {
                // Refresh membership so the store reflects the change
                vec![self.issue_chat_fetch(chat_id)]
            },
            (PendingCall::DeleteChat { chat_id }, HttpResponse::Ack) => {
                self.store.remove_chat(&chat_id);
                vec![SyncAction::Emit(ClientEvent::LeaveChat { chat_id })]
            },
            (PendingCall::JoinLocalGroup, HttpResponse::LocalGroupJoined(joined)) => {
                vec![self.issue_chat_fetch(joined.chat_id)]
            },
            (intent, response) => {
                tracing::warn!(?intent, ?response, "mismatched response for intent");
                Vec::new()
            },
        }
    }

    fn handle_failure(&mut self, token: HttpToken, error: &str) -> Vec<SyncAction> {
        let Some(intent) = self.pending.remove(&token) else {
            return Vec::new();
        };

        match intent {
            PendingCall::MarkRead { chat_id } => {
                // Best effort: re-scrolling retries naturally
                tracing::debug!(%chat_id, error, "read receipt failed");
                Vec::new()
            },
            PendingCall::FlushSend { entry } => {
                let chat_id = entry.chat_id.clone();
                tracing::warn!(%chat_id, error, "queued send failed; will retry next reconnect");
                self.store.requeue(&chat_id, entry);
                self.continue_flush(&chat_id)
            },
            PendingCall::ChatList => {
                if self.latest_list_fetch == Some(token) {
                    self.latest_list_fetch = None;
                }
                vec![notify("Could not load chats", error)]
            },
            PendingCall::ChatMeta { chat_id } => {
                self.latest_chat_fetch.remove(&chat_id);
                vec![notify("Could not load chat", error)]
            },
            PendingCall::Messages { chat_id } => {
                self.latest_messages_fetch.remove(&chat_id);
                vec![notify("Could not load messages", error)]
            },
            PendingCall::DirectSend { .. } => vec![notify("Message failed to send", error)],
            PendingCall::CreateGroup => vec![notify("Could not create group", error)],
            PendingCall::AddMembers { .. } => vec![notify("Could not add members", error)],
            PendingCall::RemoveMember { .. } => vec![notify("Could not remove member", error)],
            PendingCall::DeleteChat { .. } => vec![notify("Could not delete chat", error)],
            PendingCall::JoinLocalGroup => vec![notify("Could not join local group", error)],
        }
    }

    // ---- Helpers ----

    fn issue(&mut self, call: HttpCall, intent: PendingCall) -> SyncAction {
        self.next_token += 1;
        let token = HttpToken(self.next_token);
        self.pending.insert(token, intent);
        SyncAction::Http { token, call }
    }

    fn issue_list_fetch(&mut self) -> SyncAction {
        let action = self.issue(
            HttpCall::FetchChatList { user_id: self.user_id.clone() },
            PendingCall::ChatList,
        );
        if let SyncAction::Http { token, .. } = &action {
            self.latest_list_fetch = Some(*token);
        }
        action
    }

    fn issue_chat_fetch(&mut self, chat_id: ChatId) -> SyncAction {
        let action = self.issue(
            HttpCall::FetchChat { chat_id: chat_id.clone() },
            PendingCall::ChatMeta { chat_id: chat_id.clone() },
        );
        if let SyncAction::Http { token, .. } = &action {
            self.latest_chat_fetch.insert(chat_id, *token);
        }
        action
    }

    fn issue_messages_fetch(&mut self, chat_id: ChatId) -> SyncAction {
        let action = self.issue(
            HttpCall::FetchMessages { chat_id: chat_id.clone() },
            PendingCall::Messages { chat_id: chat_id.clone() },
        );
        if let SyncAction::Http { token, .. } = &action {
            self.latest_messages_fetch.insert(chat_id, *token);
        }
        action
    }

    fn emit_typing_stop(&self, chat_id: ChatId) -> SyncAction {
        SyncAction::Emit(ClientEvent::TypingStop(TypingPayload {
            chat_id,
            user_id: self.user_id.clone(),
        }))
    }
}

fn notify(what: &str, error: &str) -> SyncAction {
    SyncAction::Notify { message: format!("{what}: {error}") }
}

#[cfg(test)]
mod tests {
    use tidemark_harness::SimEnv;
    use tidemark_proto::{Chat, Member, MemberRole, MessageId};

    use super::*;

    fn coordinator() -> Coordinator<SimEnv> {
        Coordinator::new(SimEnv::with_seed(42), UserId::from("me"))
    }

    fn chat_with_members(id: &str, member_ids: &[&str]) -> Chat {
        Chat {
            id: ChatId::from(id),
            name: None,
            is_group: true,
            members: member_ids
                .iter()
                .map(|m| Member {
                    id: UserId::from(*m),
                    name: (*m).to_owned(),
                    role: MemberRole::Member,
                    avatar: None,
                })
                .collect(),
            created_by: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn http_token(action: &SyncAction) -> HttpToken {
        match action {
            SyncAction::Http { token, .. } => *token,
            other => panic!("expected Http action, got {other:?}"),
        }
    }

    #[test]
    fn bootstrap_fetches_chat_list() {
        let mut coord = coordinator();
        let actions = coord.bootstrap();
        assert!(matches!(
            actions.as_slice(),
            [SyncAction::Http { call: HttpCall::FetchChatList { .. }, .. }]
        ));
    }

    #[test]
    fn open_chat_with_history_skips_message_fetch() {
        let mut coord = coordinator();
        let c1 = ChatId::from("c1");
        let _ = coord.handle(SyncEvent::Socket(ServerEvent::NewMessage(Message {
            id: MessageId::from("m1"),
            chat_id: c1.clone(),
            sender: SenderRef { id: UserId::from("u2") },
            content: "hi".into(),
            message_type: MessageType::Text,
            timestamp: 0,
            status: None,
        })));

        let actions = coord.handle(SyncEvent::OpenChat { chat_id: c1 });
        let fetches_messages = actions
            .iter()
            .any(|a| matches!(a, SyncAction::Http { call: HttpCall::FetchMessages { .. }, .. }));
        let fetches_meta = actions
            .iter()
            .any(|a| matches!(a, SyncAction::Http { call: HttpCall::FetchChat { .. }, .. }));
        assert!(!fetches_messages);
        // Metadata is always refreshed
        assert!(fetches_meta);
    }

    #[test]
    fn own_typing_events_are_ignored() {
        let mut coord = coordinator();
        let _ = coord.handle(SyncEvent::Socket(ServerEvent::TypingStart(TypingPayload {
            chat_id: ChatId::from("c1"),
            user_id: UserId::from("me"),
        })));
        assert!(coord.store().typing_users(&ChatId::from("c1")).is_empty());
    }

    #[test]
    fn typing_from_unknown_member_is_ignored() {
        let mut coord = coordinator();
        let _ = coord.handle(SyncEvent::Socket(ServerEvent::TypingStart(TypingPayload {
            chat_id: ChatId::from("c1"),
            user_id: UserId::from("stranger"),
        })));
        assert!(coord.store().typing_users(&ChatId::from("c1")).is_empty());
    }

    #[test]
    fn typing_from_known_member_lands_in_store() {
        let mut coord = coordinator();
        let chat = chat_with_members("c1", &["me", "u2"]);
        let list = serde_json::to_value(vec![&chat]).unwrap();
        let _ = coord.handle(SyncEvent::Socket(ServerEvent::ListUpdate(list)));
        let _ = coord.handle(SyncEvent::Tick { now: advance(&coord, 250) });

        let _ = coord.handle(SyncEvent::Socket(ServerEvent::TypingStart(TypingPayload {
            chat_id: ChatId::from("c1"),
            user_id: UserId::from("u2"),
        })));
        assert_eq!(coord.store().typing_users(&ChatId::from("c1")).len(), 1);
    }

    /// Advance the coordinator's clock and return the new now.
    fn advance(coord: &Coordinator<SimEnv>, ms: u64) -> tidemark_harness::SimInstant {
        coord.env.advance(std::time::Duration::from_millis(ms));
        coord.env.now()
    }

    #[test]
    fn offline_submit_queues_with_local_echo() {
        let mut coord = coordinator();
        let c1 = ChatId::from("c1");
        let actions = coord.handle(SyncEvent::SubmitMessage { chat_id: c1.clone(), content: "hi".into() });
        // typing_stop only, no HTTP
        assert!(actions.iter().all(|a| !matches!(a, SyncAction::Http { .. })));
        assert_eq!(coord.store().queued(&c1).len(), 1);
        assert_eq!(coord.store().messages(&c1).len(), 1);
        assert!(coord.store().messages(&c1)[0].is_pending());
    }

    #[test]
    fn online_submit_sends_and_appends_confirmation() {
        let mut coord = coordinator();
        let c1 = ChatId::from("c1");
        let _ = coord.handle(SyncEvent::ConnectivityChanged { online: true });
        let actions = coord.handle(SyncEvent::SubmitMessage { chat_id: c1.clone(), content: "hi".into() });
        let send = actions
            .iter()
            .find(|a| matches!(a, SyncAction::Http { call: HttpCall::SendMessage { .. }, .. }))
            .expect("send action");
        assert!(coord.store().queued(&c1).is_empty());

        let _ = coord.handle(SyncEvent::HttpSucceeded {
            token: http_token(send),
            response: HttpResponse::MessageSent(tidemark_proto::SendMessageResponse {
                message_id: MessageId::from("m1"),
            }),
        });
        assert_eq!(coord.store().messages(&c1).len(), 1);
        assert!(!coord.store().messages(&c1)[0].is_pending());
    }

    #[test]
    fn stale_history_response_is_dropped() {
        let mut coord = coordinator();
        let c1 = ChatId::from("c1");

        let first = coord.handle(SyncEvent::OpenChat { chat_id: c1.clone() });
        let first_fetch = first
            .iter()
            .find(|a| matches!(a, SyncAction::Http { call: HttpCall::FetchMessages { .. }, .. }))
            .cloned()
            .expect("first history fetch");

        // A second open supersedes the first fetch
        let second = coord.handle(SyncEvent::OpenChat { chat_id: c1.clone() });
        let second_fetch = second
            .iter()
            .find(|a| matches!(a, SyncAction::Http { call: HttpCall::FetchMessages { .. }, .. }))
            .cloned()
            .expect("second history fetch");

        let stale = vec![Message {
            id: MessageId::from("old"),
            chat_id: c1.clone(),
            sender: SenderRef { id: UserId::from("u2") },
            content: "stale".into(),
            message_type: MessageType::Text,
            timestamp: 0,
            status: None,
        }];
        let _ = coord.handle(SyncEvent::HttpSucceeded {
            token: http_token(&first_fetch),
            response: HttpResponse::Messages(stale),
        });
        assert!(coord.store().messages(&c1).is_empty());

        let fresh = vec![Message {
            id: MessageId::from("new"),
            chat_id: c1.clone(),
            sender: SenderRef { id: UserId::from("u2") },
            content: "fresh".into(),
            message_type: MessageType::Text,
            timestamp: 0,
            status: None,
        }];
        let _ = coord.handle(SyncEvent::HttpSucceeded {
            token: http_token(&second_fetch),
            response: HttpResponse::Messages(fresh),
        });
        assert_eq!(coord.store().messages(&c1).len(), 1);
        assert_eq!(coord.store().messages(&c1)[0].id.as_str(), "new");
    }

    #[test]
    fn viewed_latest_marks_read_and_issues_receipt() {
        let mut coord = coordinator();
        let c1 = ChatId::from("c1");
        let _ = coord.handle(SyncEvent::Socket(ServerEvent::NewMessage(Message {
            id: MessageId::from("m5"),
            chat_id: c1.clone(),
            sender: SenderRef { id: UserId::from("u2") },
            content: "hi".into(),
            message_type: MessageType::Text,
            timestamp: 0,
            status: None,
        })));
        assert!(coord.store().has_unread(&c1));

        let actions = coord.handle(SyncEvent::ViewedLatest { chat_id: c1.clone() });
        assert!(matches!(
            actions.as_slice(),
            [SyncAction::Http { call: HttpCall::MarkRead { .. }, .. }]
        ));
        assert!(!coord.store().has_unread(&c1));

        // Receipt failure is swallowed
        let token = http_token(&actions[0]);
        let follow_up = coord.handle(SyncEvent::HttpFailed { token, error: "503".into() });
        assert!(follow_up.is_empty());
    }

    #[test]
    fn viewed_latest_on_empty_chat_is_a_noop() {
        let mut coord = coordinator();
        let actions = coord.handle(SyncEvent::ViewedLatest { chat_id: ChatId::from("empty") });
        assert!(actions.is_empty());
    }

    #[test]
    fn create_group_uses_draft_list_and_clears_it() {
        let mut coord = coordinator();
        let _ = coord.handle(SyncEvent::AddDraftUser(Member {
            id: UserId::from("u2"),
            name: "u2".into(),
            role: MemberRole::Member,
            avatar: None,
        }));

        let actions = coord.handle(SyncEvent::CreateGroup { name: "crew".into() });
        let token = http_token(&actions[0]);
        let _ = coord.handle(SyncEvent::HttpSucceeded {
            token,
            response: HttpResponse::ChatCreated(chat_with_members("g1", &["me", "u2"])),
        });
        assert!(coord.store().draft_users().is_empty());
        assert_eq!(coord.store().active_chats()[0].id.as_str(), "g1");
    }

    #[test]
    fn create_group_with_no_drafts_notifies() {
        let mut coord = coordinator();
        let actions = coord.handle(SyncEvent::CreateGroup { name: "crew".into() });
        assert!(matches!(actions.as_slice(), [SyncAction::Notify { .. }]));
    }

    #[test]
    fn shutdown_applies_snapshot_still_inside_its_window() {
        let mut coord = coordinator();
        let chat = chat_with_members("c1", &["me"]);
        let list = serde_json::to_value(vec![&chat]).unwrap();
        let _ = coord.handle(SyncEvent::Socket(ServerEvent::ListUpdate(list)));
        // No tick, no window elapse: the snapshot is still debounced
        assert!(coord.store().active_chats().is_empty());

        let actions = coord.shutdown();
        assert!(actions.is_empty());
        assert_eq!(coord.store().active_chats()[0].id.as_str(), "c1");
    }

    #[test]
    fn shutdown_stops_armed_typing_indicators() {
        let mut coord = coordinator();
        let _ = coord.handle(SyncEvent::InputChanged { chat_id: ChatId::from("c1") });

        let actions = coord.shutdown();
        assert!(matches!(
            actions.as_slice(),
            [SyncAction::Emit(ClientEvent::TypingStop(_))]
        ));
        // Idempotent: a second shutdown has nothing left to do
        assert!(coord.shutdown().is_empty());
    }

    #[test]
    fn delete_chat_removes_locally_on_ack() {
        let mut coord = coordinator();
        let chat = chat_with_members("c1", &["me"]);
        let list = serde_json::to_value(vec![&chat]).unwrap();
        let _ = coord.handle(SyncEvent::Socket(ServerEvent::ListUpdate(list)));
        let _ = coord.handle(SyncEvent::Tick { now: advance(&coord, 250) });
        assert_eq!(coord.store().active_chats().len(), 1);

        let actions = coord.handle(SyncEvent::DeleteChat { chat_id: ChatId::from("c1") });
        let _ = coord.handle(SyncEvent::HttpSucceeded {
            token: http_token(&actions[0]),
            response: HttpResponse::Ack,
        });
        assert!(coord.store().active_chats().is_empty());
    }
}
