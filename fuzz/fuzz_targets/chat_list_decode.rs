//! Fuzz target for chats_from_value
//!
//! `chat:list_update` payloads are fully untrusted. Normalization must never
//! panic: non-arrays coerce to an empty list and undecodable entries are
//! dropped. Every chat that survives must carry a non-empty canonical id.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tidemark_proto::chats_from_value;

fuzz_target!(|data: &[u8]| {
    if let Ok(value) = serde_json::from_slice(data) {
        for chat in chats_from_value(&value) {
            assert!(!chat.id.as_str().is_empty());
        }
    }
});
