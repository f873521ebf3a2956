//! Property tests for store and coordinator invariants.
//!
//! Random operation sequences must never violate the structural invariants:
//! timeline ids stay unique, queued echoes stay visible and pending, and
//! socket input can never panic the coordinator.

use std::collections::HashSet;
use std::time::Duration;

use proptest::prelude::*;
use tidemark_client::{Coordinator, SyncEvent};
use tidemark_core::env::Environment;
use tidemark_core::ChatStore;
use tidemark_harness::SimEnv;
use tidemark_proto::{
    ChatId, Message, MessageId, MessageType, SenderRef, ServerEvent, TypingPayload, UserId,
};

fn confirmed(chat: &ChatId, id: u8) -> Message {
    Message {
        id: MessageId::from(format!("m{id}").as_str()),
        chat_id: chat.clone(),
        sender: SenderRef { id: UserId::from("u1") },
        content: String::new(),
        message_type: MessageType::Text,
        timestamp: 0,
        status: None,
    }
}

/// One store mutation in a randomized sequence.
#[derive(Debug, Clone)]
enum StoreOp {
    /// Append a confirmed message with an id from a small pool (collisions
    /// intended).
    Append(u8),
    /// Queue a local message while offline.
    Queue(String),
    /// Confirm the oldest queued entry under a server id from the pool.
    ResolveOldest(u8),
    /// Drain the queue and put everything back, as a failed flush pass does.
    DrainAndRequeue,
    /// Drop the queue without touching the timeline.
    ClearQueue,
}

fn store_op() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        (0u8..16).prop_map(StoreOp::Append),
        "[a-z]{0,8}".prop_map(StoreOp::Queue),
        (0u8..16).prop_map(StoreOp::ResolveOldest),
        Just(StoreOp::DrainAndRequeue),
        Just(StoreOp::ClearQueue),
    ]
}

fn apply(store: &mut ChatStore, chat: &ChatId, op: StoreOp) {
    match op {
        StoreOp::Append(id) => store.append_message(confirmed(chat, id)),
        StoreOp::Queue(content) => {
            let _ = store.queue_message(chat, &UserId::from("u1"), &content, 0);
        },
        StoreOp::ResolveOldest(id) => {
            if let Some(oldest) = store.queued(chat).first().cloned() {
                store.resolve_pending(chat, &oldest.id, confirmed(chat, id));
            }
        },
        StoreOp::DrainAndRequeue => {
            for entry in store.take_queue(chat) {
                store.requeue(chat, entry);
            }
        },
        StoreOp::ClearQueue => store.clear_queue(chat),
    }
}

proptest! {
    /// No operation sequence can produce duplicate ids within a timeline.
    #[test]
    fn timeline_ids_stay_unique(ops in prop::collection::vec(store_op(), 0..40)) {
        let chat = ChatId::from("c1");
        let mut store = ChatStore::new(99);
        for op in ops {
            apply(&mut store, &chat, op);
            let mut seen = HashSet::new();
            for message in store.messages(&chat) {
                prop_assert!(seen.insert(message.id.clone()), "duplicate id {}", message.id);
            }
        }
    }

    /// Every queued entry is a pending temp echo that is also on the timeline.
    #[test]
    fn queued_entries_are_pending_echoes(ops in prop::collection::vec(store_op(), 0..40)) {
        let chat = ChatId::from("c1");
        let mut store = ChatStore::new(99);
        for op in ops {
            apply(&mut store, &chat, op);
            for entry in store.queued(&chat) {
                prop_assert!(entry.id.is_temp());
                prop_assert!(entry.is_pending());
                prop_assert!(
                    store.messages(&chat).iter().any(|m| m.id == entry.id),
                    "queued {} missing from timeline", entry.id
                );
            }
        }
    }
}

/// One inbound socket event in a randomized stream.
fn server_event() -> impl Strategy<Value = ServerEvent> {
    let chat = (0u8..3).prop_map(|n| ChatId::from(format!("c{n}").as_str()));
    let user = (0u8..4).prop_map(|n| UserId::from(format!("u{n}").as_str()));
    prop_oneof![
        ((0u8..10), chat.clone(), user.clone()).prop_map(|(id, chat_id, sender)| {
            ServerEvent::NewMessage(Message {
                id: MessageId::from(format!("m{id}").as_str()),
                chat_id,
                sender: SenderRef { id: sender },
                content: "x".to_owned(),
                message_type: MessageType::Text,
                timestamp: 0,
                status: None,
            })
        }),
        (chat.clone(), user.clone())
            .prop_map(|(chat_id, user_id)| ServerEvent::TypingStart(TypingPayload {
                chat_id,
                user_id
            })),
        (chat, user).prop_map(|(chat_id, user_id)| ServerEvent::TypingStop(TypingPayload {
            chat_id,
            user_id
        })),
        prop_oneof![
            Just(serde_json::Value::Null),
            Just(serde_json::json!("noise")),
            Just(serde_json::json!([{ "id": "c0" }, 17])),
        ]
        .prop_map(ServerEvent::ListUpdate),
    ]
}

proptest! {
    /// Arbitrary socket streams never panic the coordinator, and the state
    /// they leave behind is structurally sound.
    #[test]
    fn socket_streams_keep_state_sound(
        events in prop::collection::vec(server_event(), 0..60),
        ticks in prop::collection::vec(0u64..500, 0..10),
    ) {
        let env = SimEnv::with_seed(3);
        let mut coord = Coordinator::new(env.clone(), UserId::from("me"));
        let mut ticks = ticks.into_iter();

        for event in events {
            let _ = coord.handle(SyncEvent::Socket(event));
            if let Some(ms) = ticks.next() {
                env.advance(Duration::from_millis(ms));
                let _ = coord.handle(SyncEvent::Tick { now: env.now() });
            }
        }

        for chat in coord.store().active_chats() {
            let timeline = coord.store().messages(&chat.id);
            let ids: HashSet<_> = timeline.iter().map(|m| &m.id).collect();
            prop_assert_eq!(ids.len(), timeline.len());

            let typing = coord.store().typing_users(&chat.id);
            let typing_ids: HashSet<_> = typing.iter().map(|m| &m.id).collect();
            prop_assert_eq!(typing_ids.len(), typing.len());
        }
    }
}
