//! Action-based chat synchronization client.
//!
//! The heart of this crate is the [`Coordinator`], a state machine with no
//! I/O of its own: feed it [`SyncEvent`]s (user intents, socket pushes,
//! connectivity transitions, HTTP completions, time ticks) and execute the
//! [`SyncAction`]s it returns. This keeps every synchronization rule
//! deterministic and testable against a virtual clock.
//!
//! The optional `transport` feature adds production I/O:
//!
//! - [`ConnectionManager`]: websocket lifecycle over `tokio-tungstenite`
//! - [`RestClient`]: the backend's REST surface over `reqwest`
//! - [`SyncRuntime`]: the event loop wiring both to a coordinator
//!
//! Without the feature, the crate is pure logic and compiles without an
//! async runtime, which is how the deterministic tests consume it.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod coordinator;
mod event;

pub use coordinator::Coordinator;
pub use event::{HttpCall, HttpResponse, HttpToken, SyncAction, SyncEvent};

#[cfg(feature = "transport")]
mod connection;
#[cfg(feature = "transport")]
mod http;
#[cfg(feature = "transport")]
mod runtime;

#[cfg(feature = "transport")]
pub use connection::{ConnectionManager, SocketSignal, TransportError};
#[cfg(feature = "transport")]
pub use http::{ApiError, ChatApi, RestClient};
#[cfg(feature = "transport")]
pub use runtime::{SyncHandle, SyncRuntime};
