//! Core state for the Tidemark chat synchronization engine.
//!
//! Everything in this crate is synchronous and I/O-free. The [`ChatStore`] is
//! the single shared mutable resource of the engine; it is mutated only
//! through discrete operations whose merge semantics (idempotent append,
//! upsert-by-id, wholesale replace) make interleaved REST completions, socket
//! pushes, and timers safe without locking.
//!
//! # Components
//!
//! - [`ChatStore`]: normalized session state (chat list, timelines, read
//!   markers, offline queues, typing sets, draft group staging)
//! - [`Debouncer`]: reusable burst-collapsing utility for push storms
//! - [`typing_text`]: pure typing-indicator formatting
//! - [`env::Environment`]: time/randomness abstraction for deterministic
//!   simulation

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;

mod debounce;
mod presence;
mod store;

pub use debounce::Debouncer;
pub use presence::typing_text;
pub use store::ChatStore;
