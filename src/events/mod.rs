//! Events module for dialogue observability
//!
//! Structured events broadcast by the dialogue controller on every
//! phase transition and transcript change. The IPC layer consumes them
//! to keep its status snapshot current.

use serde::{Deserialize, Serialize};

use crate::dialogue::Phase;
use crate::transcript::Role;

/// Events emitted by the dialogue controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DialogueEvent {
    /// The state machine moved to a new phase
    PhaseChanged { from: Phase, to: Phase },

    /// A turn was appended to the transcript
    TurnAppended { role: Role },

    /// The speech subsystem recognized an utterance during a listen
    UtteranceRecognised { utterance: String },
}

impl std::fmt::Display for DialogueEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DialogueEvent::PhaseChanged { from, to } => {
                write!(f, "PHASE_CHANGED ({from} -> {to})")
            }
            DialogueEvent::TurnAppended { role } => write!(f, "TURN_APPENDED ({role})"),
            DialogueEvent::UtteranceRecognised { utterance } => {
                write!(f, "UTTERANCE_RECOGNISED ({utterance})")
            }
        }
    }
}
