//! Command and event types for the speech subsystem boundary
//!
//! Commands are fire-and-forget: results only arrive as events. The
//! subsystem is half-duplex, so the controller must never have two
//! commands outstanding at once; that invariant is enforced by the
//! dialogue state machine, not here.

/// Commands the controller sends to the speech subsystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechCommand {
    /// Initialize the subsystem; it eventually answers with [`SpeechEvent::Ready`].
    /// Must be sent once before any other command.
    Prepare,
    /// Start recognizing speech; zero or more `Recognised` events may
    /// arrive, followed by exactly one `ListenComplete`.
    Listen,
    /// Synthesize and play the utterance; answered with `SpeakComplete`.
    Speak { utterance: String },
}

impl std::fmt::Display for SpeechCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpeechCommand::Prepare => write!(f, "PREPARE"),
            SpeechCommand::Listen => write!(f, "LISTEN"),
            SpeechCommand::Speak { utterance } => write!(f, "SPEAK({utterance})"),
        }
    }
}

/// Lifecycle events the speech subsystem sends back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// Subsystem finished preparing and accepts listen/speak commands
    Ready,
    /// A candidate utterance was recognized during an active listen
    Recognised { utterance: String },
    /// The active listen finished (fires even when nothing was recognized)
    ListenComplete,
    /// The active speak finished playback
    SpeakComplete,
}

impl std::fmt::Display for SpeechEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpeechEvent::Ready => write!(f, "READY"),
            SpeechEvent::Recognised { utterance } => write!(f, "RECOGNISED({utterance})"),
            SpeechEvent::ListenComplete => write!(f, "LISTEN_COMPLETE"),
            SpeechEvent::SpeakComplete => write!(f, "SPEAK_COMPLETE"),
        }
    }
}
