//! Dialogue state machine module
//!
//! The orchestrator of the turn-taking loop:
//! - Idle: waiting for the external start trigger
//! - Prepare: speech subsystem warming up
//! - Speak: playing the latest assistant turn
//! - Listen: capturing recognized speech as user turns
//! - AwaitReply: one backend call per turn, fallback text on failure

mod controller;

pub use controller::{DialogueController, Phase, FALLBACK_REPLY};
