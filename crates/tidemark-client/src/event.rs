//! Coordinator events and actions.

use tidemark_proto::{
    AddMembersRequest, Chat, ChatId, ClientEvent, CreateChatRequest, JoinLocalGroupRequest,
    JoinLocalGroupResponse, Member, Message, ReadReceiptRequest, SendMessageRequest,
    SendMessageResponse, ServerEvent, UserId,
};

/// Correlation token for an issued HTTP call.
///
/// Completions carry the token back so the coordinator can match them to
/// intent and discard responses superseded by a later fetch of the same
/// resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HttpToken(pub u64);

/// Events the caller feeds into the coordinator.
///
/// The caller is responsible for:
/// - Receiving socket events and connectivity transitions from the transport
/// - Driving time forward via ticks
/// - Forwarding user intents (open chat, submit message, etc.)
/// - Executing HTTP actions and feeding their completions back
///
/// Generic over `I` (Instant type) to support both production
/// (`std::time::Instant`) and simulation environments.
#[derive(Debug, Clone)]
pub enum SyncEvent<I = std::time::Instant> {
    /// Time tick for debounce and typing-expiry processing.
    ///
    /// The caller should send ticks periodically; the coordinator performs
    /// no housekeeping between events.
    Tick {
        /// Current time from the environment.
        now: I,
    },

    /// Network connectivity changed.
    ///
    /// Coming online triggers the offline-queue flush.
    ConnectivityChanged {
        /// Whether the network is reachable.
        online: bool,
    },

    /// Push event from the socket.
    Socket(ServerEvent),

    /// User opened a chat room screen.
    OpenChat {
        /// Chat being opened.
        chat_id: ChatId,
    },

    /// User left a chat room screen.
    CloseChat {
        /// Chat being closed.
        chat_id: ChatId,
    },

    /// User submitted a message.
    SubmitMessage {
        /// Target chat.
        chat_id: ChatId,
        /// Message body.
        content: String,
    },

    /// User changed the text input of a chat (typing emission).
    InputChanged {
        /// Chat whose input changed.
        chat_id: ChatId,
    },

    /// The user is looking at the newest message (read tracking).
    ViewedLatest {
        /// Chat being viewed.
        chat_id: ChatId,
    },

    /// Stage a member for a new group chat.
    AddDraftUser(Member),

    /// Unstage a member.
    RemoveDraftUser(UserId),

    /// Clear the group staging list.
    ClearDraftUsers,

    /// Create a group chat from the staged members.
    CreateGroup {
        /// Group name.
        name: String,
    },

    /// Add members to an existing chat.
    AddMembers {
        /// Target chat.
        chat_id: ChatId,
        /// Users to add.
        member_ids: Vec<UserId>,
    },

    /// Remove a member from a chat.
    RemoveMember {
        /// Target chat.
        chat_id: ChatId,
        /// User to remove.
        member_id: UserId,
    },

    /// Delete a chat.
    DeleteChat {
        /// Chat to delete.
        chat_id: ChatId,
    },

    /// Join the location-based local group.
    JoinLocalGroup {
        /// Device latitude.
        latitude: f64,
        /// Device longitude.
        longitude: f64,
        /// Reverse-geocoded address label.
        address: String,
    },

    /// An issued HTTP call completed successfully.
    HttpSucceeded {
        /// Token of the completed call.
        token: HttpToken,
        /// Decoded response.
        response: HttpResponse,
    },

    /// An issued HTTP call failed (network or server error).
    HttpFailed {
        /// Token of the failed call.
        token: HttpToken,
        /// Failure description.
        error: String,
    },
}

/// REST calls the coordinator asks the caller to perform.
///
/// Paths mirror the backend contract; the transport layer maps each call to
/// its method, URL, and body.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpCall {
    /// `GET /chat/list/{userId}`
    FetchChatList {
        /// Owning user.
        user_id: UserId,
    },
    /// `GET /chat/{chatId}`
    FetchChat {
        /// Chat to fetch.
        chat_id: ChatId,
    },
    /// `GET /chat/{chatId}/messages`
    FetchMessages {
        /// Chat whose history to fetch.
        chat_id: ChatId,
    },
    /// `POST /chat/{chatId}/messages`
    SendMessage {
        /// Target chat.
        chat_id: ChatId,
        /// Request body.
        body: SendMessageRequest,
    },
    /// `POST /chat/read`
    MarkRead {
        /// Request body.
        body: ReadReceiptRequest,
    },
    /// `POST /chat/create`
    CreateChat {
        /// Request body.
        body: CreateChatRequest,
    },
    /// `POST /chat/{chatId}/add-members`
    AddMembers {
        /// Target chat.
        chat_id: ChatId,
        /// Request body.
        body: AddMembersRequest,
    },
    /// `DELETE /chat/{chatId}/remove-member?member_id=...`
    RemoveMember {
        /// Target chat.
        chat_id: ChatId,
        /// User to remove.
        member_id: UserId,
    },
    /// `DELETE /chat/{chatId}`
    DeleteChat {
        /// Chat to delete.
        chat_id: ChatId,
    },
    /// `POST /chat/local-groups/join`
    JoinLocalGroup {
        /// Request body.
        body: JoinLocalGroupRequest,
    },
}

/// Decoded responses, paired with [`HttpCall`] variants by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpResponse {
    /// Chat list (already defensively decoded).
    ChatList(Vec<Chat>),
    /// A single chat, canonicalized.
    Chat(Chat),
    /// A chat's full message history.
    Messages(Vec<Message>),
    /// Send confirmation.
    MessageSent(SendMessageResponse),
    /// Created chat, canonicalized.
    ChatCreated(Chat),
    /// Body-less acknowledgment (read receipts, membership, deletion).
    Ack,
    /// Local-group placement.
    LocalGroupJoined(JoinLocalGroupResponse),
}

/// Actions the coordinator produces for the caller to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    /// Perform an HTTP call and feed the completion back with this token.
    Http {
        /// Correlation token.
        token: HttpToken,
        /// Call to perform.
        call: HttpCall,
    },

    /// Emit an event on the socket (dropped silently while disconnected).
    Emit(ClientEvent),

    /// Surface a failure to the user (toast/alert is the UI's call).
    Notify {
        /// Human-readable description.
        message: String,
    },
}
