//! Speech gateway module
//!
//! Typed boundary to the external speech subsystem. The dialogue
//! controller issues commands (prepare, listen, speak) and receives
//! lifecycle events (ready, recognised, listen-complete, speak-complete)
//! over channels; it never observes the subsystem directly.

mod console;
mod gateway;

pub use console::ConsoleGateway;
pub use gateway::{SpeechCommand, SpeechEvent};
