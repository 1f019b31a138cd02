//! Append-only conversation history
//!
//! A transcript always starts with one system turn (the instruction
//! preamble) and one seed assistant turn (the greeting). The dialogue
//! controller is the only writer; ordering is enforced by the state
//! machine, not by the store.

use serde::{Deserialize, Serialize};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Fixed instruction preamble, set once at initialization
    System,
    /// Recognized speech from the human
    User,
    /// Backend reply or fallback text
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One role-tagged utterance in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

/// Ordered history of turns, insertion order significant
#[derive(Debug, Clone)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// Create the initial two-turn transcript: system prompt + greeting
    pub fn new(system_prompt: impl Into<String>, greeting: impl Into<String>) -> Self {
        Self {
            turns: vec![
                Turn {
                    role: Role::System,
                    content: system_prompt.into(),
                },
                Turn {
                    role: Role::Assistant,
                    content: greeting.into(),
                },
            ],
        }
    }

    /// Append one turn. Empty content is tolerated and stored as-is.
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push(Turn {
            role,
            content: content.into(),
        });
    }

    /// The most recent turn with the given role, if any
    pub fn latest(&self, role: Role) -> Option<&Turn> {
        self.turns.iter().rev().find(|t| t.role == role)
    }

    /// All turns in insertion order
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of turns
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Never true for a constructed transcript, but keeps clippy honest
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
