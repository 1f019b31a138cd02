//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::dialogue::Phase;
use crate::events::DialogueEvent;

/// Requests from UI to daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request current session status
    GetStatus,

    /// Begin the dialogue session (the "click" trigger)
    Start,

    /// Ping to check connectivity
    Ping,

    /// Switch this connection to push notifications
    Subscribe,
}

/// Responses from daemon to UI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current session status
    Status(SessionStatus),

    /// Session started
    Started,

    /// Pong response to ping
    Pong,

    /// Subscription confirmed; notifications follow on this connection
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

/// Push notification from daemon to subscribed UI clients
///
/// Adjacently tagged so the wrapped event keeps its own `type` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Notification {
    /// A dialogue event occurred
    Event(DialogueEvent),
}

/// Full session status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Daemon version
    pub version: String,

    /// Current dialogue phase
    pub phase: Phase,

    /// Human-readable state label for display
    pub label: String,

    /// Number of turns in the transcript
    pub turns: usize,

    /// Most recently recognized utterance
    pub last_utterance: String,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            phase: Phase::default(),
            label: label_for(Phase::default()).to_string(),
            turns: 2,
            last_utterance: String::new(),
            uptime_secs: 0,
        }
    }
}

/// Display label for a phase, shown on the UI trigger surface
pub fn label_for(phase: Phase) -> &'static str {
    match phase {
        Phase::Idle => "Click to start",
        Phase::Prepare => "Preparing...",
        Phase::Speak => "Speaking...",
        Phase::Listen => "Listening...",
        Phase::AwaitReply => "Thinking...",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let req = Request::Start;
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("start"));

        let parsed: Request = serde_json::from_str(r#"{"type":"get_status"}"#).unwrap();
        assert!(matches!(parsed, Request::GetStatus));
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::Status(SessionStatus::default());
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("status"));
        assert!(json.contains("idle"));
    }

    #[test]
    fn test_notification_serialization() {
        let note = Notification::Event(DialogueEvent::PhaseChanged {
            from: Phase::Idle,
            to: Phase::Prepare,
        });
        let json = serde_json::to_string(&note).unwrap();
        assert!(json.contains("event"));
        assert!(json.contains("phase_changed"));
    }

    #[test]
    fn test_labels_cover_all_phases() {
        assert_eq!(label_for(Phase::Listen), "Listening...");
        assert_eq!(label_for(Phase::AwaitReply), "Thinking...");
    }
}
