//! Decode errors for socket frames.
//!
//! These are boundary errors: the transport logs and drops frames that fail
//! to decode, so nothing here is fatal to the session.

use thiserror::Error;

/// Errors produced while decoding an inbound socket frame.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Frame was not a valid JSON envelope.
    #[error("malformed socket frame: {0}")]
    Frame(#[from] serde_json::Error),

    /// Envelope carried no event name.
    #[error("socket frame missing event name")]
    MissingEvent,

    /// Event name is not one this client understands.
    #[error("unknown socket event: {0}")]
    UnknownEvent(String),

    /// Event name was recognized but the payload did not decode.
    #[error("bad payload for {event}: {reason}")]
    Payload {
        /// Event name the payload belonged to.
        event: &'static str,
        /// Underlying decode failure.
        reason: String,
    },
}
