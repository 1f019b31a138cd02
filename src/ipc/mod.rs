//! IPC module for daemon-UI communication
//!
//! The Unix socket surface carries the start trigger and the
//! human-readable status label for whatever renders UI state.

mod protocol;
mod server;

pub use protocol::{Notification, Request, Response, SessionStatus};
pub use server::Server;
