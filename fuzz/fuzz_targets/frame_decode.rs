//! Fuzz target for ServerEvent::decode
//!
//! Socket frames arrive as untrusted text. Decoding must never panic:
//! malformed JSON, missing envelopes, unknown event names, and bad payloads
//! all return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tidemark_proto::ServerEvent;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = ServerEvent::decode(text);
    }
});
