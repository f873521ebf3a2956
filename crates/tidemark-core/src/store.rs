//! Normalized in-memory chat state.
//!
//! The [`ChatStore`] holds everything a session knows about its chats: the
//! active list, per-chat message timelines, last-read markers, offline send
//! queues, typing sets, and the draft-group staging list. It is created empty
//! at session start, populated by the coordinator's initial fetch, mutated
//! continuously, and discarded at logout. Nothing here persists to disk.
//!
//! Every operation is a synchronous, self-contained transition. Operations
//! never fail and never perform I/O; malformed input is coerced at the decode
//! boundary before it reaches this type. Idempotence and last-write-wins
//! semantics are chosen so that interleavings of independently triggered
//! callbacks (REST resolution, socket delivery, timers) cannot corrupt state.

use std::collections::HashMap;

use tidemark_proto::{
    Chat, ChatId, DeliveryStatus, Member, Message, MessageId, MessageType, SenderRef, UserId,
};

/// Session-scoped chat state.
///
/// Timelines are ordered oldest-to-newest in append order; the store never
/// re-sorts on insert. Callers append in the order they want displayed.
#[derive(Debug, Clone)]
pub struct ChatStore {
    /// Active chat list, caller-determined order (unshift-on-create,
    /// replace-on-fetch). At most one entry per canonical id.
    active_chats: Vec<Chat>,
    /// Per-chat message timelines.
    messages: HashMap<ChatId, Vec<Message>>,
    /// Last message id the user has acknowledged, per chat.
    last_read: HashMap<ChatId, MessageId>,
    /// Locally originated messages awaiting server confirmation.
    queued: HashMap<ChatId, Vec<Message>>,
    /// Currently typing members, set semantics keyed by member id.
    typing: HashMap<ChatId, Vec<Member>>,
    /// Staging list for composing a new group chat.
    draft_group: Vec<Member>,
    /// Session nonce mixed into temporary message ids.
    session_nonce: u64,
    /// Monotonic counter for temporary message ids.
    temp_seq: u64,
}

impl ChatStore {
    /// Create an empty store.
    ///
    /// `session_nonce` is mixed into temporary message ids so that echoes
    /// from different sessions can never collide.
    pub fn new(session_nonce: u64) -> Self {
        Self {
            active_chats: Vec::new(),
            messages: HashMap::new(),
            last_read: HashMap::new(),
            queued: HashMap::new(),
            typing: HashMap::new(),
            draft_group: Vec::new(),
            session_nonce,
            temp_seq: 0,
        }
    }

    // ---- Active chat list ----

    /// Wholesale replace of the active chat list.
    pub fn replace_active_chats(&mut self, chats: Vec<Chat>) {
        self.active_chats = chats;
    }

    /// Replace a chat in place when its id exists (position preserved), else
    /// insert at the front of the list.
    ///
    /// Used both for "just created" and "fetched single chat" flows; both
    /// follow identical merge semantics.
    pub fn upsert_chat(&mut self, chat: Chat) {
        if let Some(existing) = self.active_chats.iter_mut().find(|c| c.id == chat.id) {
            *existing = chat;
        } else {
            self.active_chats.insert(0, chat);
        }
    }

    /// Remove a chat and all of its per-chat state.
    ///
    /// The timeline must go (the chat no longer renders); clearing the
    /// read/queue/typing entries as well keeps the maps tight.
    pub fn remove_chat(&mut self, chat_id: &ChatId) {
        self.active_chats.retain(|c| &c.id != chat_id);
        self.messages.remove(chat_id);
        self.last_read.remove(chat_id);
        self.queued.remove(chat_id);
        self.typing.remove(chat_id);
    }

    /// All active chats, in list order.
    pub fn active_chats(&self) -> &[Chat] {
        &self.active_chats
    }

    /// Look up an active chat by canonical id.
    pub fn chat(&self, chat_id: &ChatId) -> Option<&Chat> {
        self.active_chats.iter().find(|c| &c.id == chat_id)
    }

    // ---- Timelines ----

    /// Append a message to its chat's timeline.
    ///
    /// Idempotent: a message whose id is already present is a no-op. This
    /// tolerates duplicate delivery from an overlapping REST fetch and
    /// socket push.
    pub fn append_message(&mut self, message: Message) {
        let timeline = self.messages.entry(message.chat_id.clone()).or_default();
        if timeline.iter().any(|m| m.id == message.id) {
            return;
        }
        timeline.push(message);
    }

    /// Wholesale replace of a chat's timeline (after a full fetch).
    pub fn replace_messages(&mut self, chat_id: &ChatId, messages: Vec<Message>) {
        self.messages.insert(chat_id.clone(), messages);
    }

    /// A chat's timeline, oldest to newest. Empty when nothing is known.
    pub fn messages(&self, chat_id: &ChatId) -> &[Message] {
        self.messages.get(chat_id).map_or(&[], Vec::as_slice)
    }

    /// The newest message in a chat's timeline.
    pub fn latest_message(&self, chat_id: &ChatId) -> Option<&Message> {
        self.messages.get(chat_id).and_then(|m| m.last())
    }

    // ---- Offline queue ----

    /// Queue a locally originated message while offline.
    ///
    /// Generates a session-unique temporary id, marks the message pending,
    /// and stores it in both the queue and the timeline so the user sees it
    /// immediately. Returns the temporary id.
    pub fn queue_message(
        &mut self,
        chat_id: &ChatId,
        sender_id: &UserId,
        content: &str,
        now_ms: u64,
    ) -> MessageId {
        self.temp_seq += 1;
        let id = MessageId::temp(self.session_nonce, self.temp_seq);
        let message = Message {
            id: id.clone(),
            chat_id: chat_id.clone(),
            sender: SenderRef { id: sender_id.clone() },
            content: content.to_owned(),
            message_type: MessageType::Text,
            timestamp: now_ms,
            status: Some(DeliveryStatus::Pending),
        };
        self.queued.entry(chat_id.clone()).or_default().push(message.clone());
        self.append_message(message);
        id
    }

    /// Drain a chat's queue for a flush pass. Timeline entries stay put.
    pub fn take_queue(&mut self, chat_id: &ChatId) -> Vec<Message> {
        self.queued.remove(chat_id).unwrap_or_default()
    }

    /// Put a message back on the queue after a failed flush send.
    ///
    /// Failed entries keep their relative order because the flush replays
    /// strictly sequentially.
    pub fn requeue(&mut self, chat_id: &ChatId, message: Message) {
        self.queued.entry(chat_id.clone()).or_default().push(message);
    }

    /// Drop a chat's queue entry; the timeline is untouched.
    pub fn clear_queue(&mut self, chat_id: &ChatId) {
        self.queued.remove(chat_id);
    }

    /// A chat's queued messages, in original submit order.
    pub fn queued(&self, chat_id: &ChatId) -> &[Message] {
        self.queued.get(chat_id).map_or(&[], Vec::as_slice)
    }

    /// Chat ids with a non-empty queue, in stable (sorted) order.
    pub fn queued_chat_ids(&self) -> Vec<ChatId> {
        let mut ids: Vec<ChatId> =
            self.queued.iter().filter(|(_, q)| !q.is_empty()).map(|(id, _)| id.clone()).collect();
        ids.sort();
        ids
    }

    /// Replace a temporary timeline entry with its confirmed counterpart.
    ///
    /// Removes the entry with `temp_id` from the timeline and the queue,
    /// then appends `confirmed` idempotently (a socket echo of the same
    /// message may already have landed).
    pub fn resolve_pending(&mut self, chat_id: &ChatId, temp_id: &MessageId, confirmed: Message) {
        if let Some(timeline) = self.messages.get_mut(chat_id) {
            timeline.retain(|m| &m.id != temp_id);
        }
        if let Some(queue) = self.queued.get_mut(chat_id) {
            queue.retain(|m| &m.id != temp_id);
        }
        self.append_message(confirmed);
    }

    // ---- Read tracking ----

    /// Record the most recent message the user has acknowledged.
    ///
    /// Unconditional: last caller wins.
    pub fn set_last_read(&mut self, chat_id: &ChatId, message_id: MessageId) {
        self.last_read.insert(chat_id.clone(), message_id);
    }

    /// Last acknowledged message id for a chat.
    pub fn last_read(&self, chat_id: &ChatId) -> Option<&MessageId> {
        self.last_read.get(chat_id)
    }

    /// Whether a chat has unread messages.
    ///
    /// True iff a newest message exists and its id differs from the
    /// last-read marker. A chat with no messages is never unread.
    pub fn has_unread(&self, chat_id: &ChatId) -> bool {
        self.latest_message(chat_id)
            .is_some_and(|latest| self.last_read.get(chat_id) != Some(&latest.id))
    }

    // ---- Typing sets ----

    /// Add a member to a chat's typing set. Re-adding is a no-op.
    pub fn add_typing_user(&mut self, chat_id: &ChatId, member: Member) {
        let set = self.typing.entry(chat_id.clone()).or_default();
        if set.iter().any(|m| m.id == member.id) {
            return;
        }
        set.push(member);
    }

    /// Remove a member from a chat's typing set. Absent members are a no-op.
    pub fn remove_typing_user(&mut self, chat_id: &ChatId, member_id: &UserId) {
        if let Some(set) = self.typing.get_mut(chat_id) {
            set.retain(|m| &m.id != member_id);
        }
    }

    /// Members currently typing in a chat.
    pub fn typing_users(&self, chat_id: &ChatId) -> &[Member] {
        self.typing.get(chat_id).map_or(&[], Vec::as_slice)
    }

    // ---- Draft group staging ----

    /// Stage a member for a new group chat. Deduped by member id.
    pub fn add_draft_user(&mut self, member: Member) {
        if self.draft_group.iter().any(|m| m.id == member.id) {
            return;
        }
        self.draft_group.push(member);
    }

    /// Unstage a member.
    pub fn remove_draft_user(&mut self, member_id: &UserId) {
        self.draft_group.retain(|m| &m.id != member_id);
    }

    /// Clear the staging list (after successful group creation).
    pub fn clear_draft_users(&mut self) {
        self.draft_group.clear();
    }

    /// Currently staged members.
    pub fn draft_users(&self) -> &[Member] {
        &self.draft_group
    }
}
