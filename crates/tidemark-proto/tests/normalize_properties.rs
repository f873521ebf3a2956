//! Property tests for boundary normalization.
//!
//! The decode boundary must never panic and must coerce malformed chat-list
//! payloads to the empty list, for arbitrary JSON input.

use proptest::prelude::*;
use serde_json::{Value, json};
use tidemark_proto::{ServerEvent, chats_from_value};

/// Arbitrary JSON values, bounded in depth and width.
fn value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-z0-9_:-]{0,12}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
            prop::collection::btree_map("[a-z_]{1,8}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn chats_from_value_never_panics(value in value_strategy()) {
        let _ = chats_from_value(&value);
    }

    #[test]
    fn non_array_payloads_coerce_to_empty(value in value_strategy()) {
        prop_assume!(!value.is_array());
        prop_assert!(chats_from_value(&value).is_empty());
    }

    #[test]
    fn every_decoded_chat_has_a_nonempty_id(value in value_strategy()) {
        for chat in chats_from_value(&value) {
            prop_assert!(!chat.id.as_str().is_empty());
        }
    }

    #[test]
    fn decoder_never_panics_on_arbitrary_frames(text in ".{0,64}") {
        let _ = ServerEvent::decode(&text);
    }

    #[test]
    fn decoder_never_panics_on_arbitrary_envelopes(name in "[a-z:_]{0,16}", data in value_strategy()) {
        let frame = json!({ "event": name, "data": data }).to_string();
        let _ = ServerEvent::decode(&frame);
    }
}
