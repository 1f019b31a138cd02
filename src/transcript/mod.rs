//! Transcript store for conversation history
//!
//! Owns the ordered sequence of turns replayed to the chat backend as
//! context. Append-only: turns are never edited or removed once pushed.

mod store;

pub use store::{Role, Transcript, Turn};
