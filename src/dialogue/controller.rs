//! Core dialogue state machine implementation
//!
//! Drives the Prepare -> Speak -> Listen -> AwaitReply loop. The
//! controller is the only writer of the transcript and never has two
//! of {speak, listen, backend call} outstanding at once: each phase
//! dispatches one command and suspends until its completion event, and
//! the backend call is awaited inline during AwaitReply.

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::backend::ChatBackend;
use crate::events::DialogueEvent;
use crate::speech::{SpeechCommand, SpeechEvent};
use crate::transcript::{Role, Transcript};

/// Spoken in place of a reply when the backend call fails
pub const FALLBACK_REPLY: &str = "Sorry, I could not understand that. Could you try again?";

/// The five phases of the dialogue state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Waiting for the start trigger
    Idle,
    /// Speech subsystem preparing, awaiting ready
    Prepare,
    /// Speaking the latest assistant turn, awaiting speak-complete
    Speak,
    /// Recognizing speech, awaiting listen-complete
    Listen,
    /// Backend call in flight
    AwaitReply,
}

impl Default for Phase {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "Idle"),
            Phase::Prepare => write!(f, "Prepare"),
            Phase::Speak => write!(f, "Speak"),
            Phase::Listen => write!(f, "Listen"),
            Phase::AwaitReply => write!(f, "AwaitReply"),
        }
    }
}

/// The state machine that manages the turn-taking loop
pub struct DialogueController<B> {
    /// Current phase
    phase: Phase,
    /// Conversation history, append-only, single writer
    transcript: Transcript,
    /// Most recently recognized raw utterance, kept for diagnostics
    last_utterance: String,
    /// Chat backend, one call per turn
    backend: B,
    /// Channel for commands to the speech gateway
    command_tx: mpsc::Sender<SpeechCommand>,
    /// Channel for emitting dialogue events
    event_tx: broadcast::Sender<DialogueEvent>,
}

impl<B: ChatBackend> DialogueController<B> {
    /// Create a new controller with the initial two-turn transcript
    pub fn new(
        backend: B,
        command_tx: mpsc::Sender<SpeechCommand>,
        event_tx: broadcast::Sender<DialogueEvent>,
        system_prompt: impl Into<String>,
        greeting: impl Into<String>,
    ) -> Self {
        Self {
            phase: Phase::Idle,
            transcript: Transcript::new(system_prompt, greeting),
            last_utterance: String::new(),
            backend,
            command_tx,
            event_tx,
        }
    }

    /// Get the current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The conversation so far
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Most recently recognized raw utterance
    pub fn last_utterance(&self) -> &str {
        &self.last_utterance
    }

    /// Run the controller: wait for the start trigger, then process
    /// speech events until the gateway channel closes. The loop has no
    /// terminal phase of its own.
    pub async fn run(
        &mut self,
        mut start_rx: mpsc::Receiver<()>,
        mut speech_rx: mpsc::Receiver<SpeechEvent>,
    ) {
        info!("dialogue controller started in Idle phase");

        if start_rx.recv().await.is_none() {
            info!("start channel closed before trigger, controller exiting");
            return;
        }
        self.start().await;

        while let Some(event) = speech_rx.recv().await {
            self.handle_speech_event(event).await;
        }

        info!("dialogue controller stopped");
    }

    /// Begin the session: Idle -> Prepare, prepare command dispatched
    pub async fn start(&mut self) {
        if self.phase != Phase::Idle {
            warn!(phase = %self.phase, "start trigger ignored, session already running");
            return;
        }
        self.transition_to(Phase::Prepare);
        self.send_command(SpeechCommand::Prepare).await;
    }

    /// Advance the state machine by one speech event
    pub async fn handle_speech_event(&mut self, event: SpeechEvent) {
        debug!(phase = %self.phase, %event, "speech event");

        match (self.phase, event) {
            (Phase::Prepare, SpeechEvent::Ready) => self.enter_speak().await,
            (Phase::Speak, SpeechEvent::SpeakComplete) => self.enter_listen().await,
            (Phase::Listen, SpeechEvent::Recognised { utterance }) => {
                self.capture_utterance(utterance);
            }
            (Phase::Listen, SpeechEvent::ListenComplete) => self.enter_await_reply().await,
            (phase, event) => {
                warn!(%phase, %event, "unexpected speech event, ignoring");
            }
        }
    }

    /// Speak the latest assistant turn; with none to speak, fall
    /// straight through to listening
    async fn enter_speak(&mut self) {
        self.transition_to(Phase::Speak);

        match self.transcript.latest(Role::Assistant) {
            Some(turn) => {
                let utterance = turn.content.clone();
                self.send_command(SpeechCommand::Speak { utterance }).await;
            }
            None => {
                debug!("no assistant turn to speak");
                self.enter_listen().await;
            }
        }
    }

    async fn enter_listen(&mut self) {
        self.transition_to(Phase::Listen);
        self.send_command(SpeechCommand::Listen).await;
    }

    /// Every recognized utterance becomes its own user turn, in event
    /// order; the phase stays Listen until listen-complete
    fn capture_utterance(&mut self, utterance: String) {
        info!(%utterance, "utterance recognized");
        self.last_utterance = utterance.clone();
        let _ = self.event_tx.send(DialogueEvent::UtteranceRecognised {
            utterance: utterance.clone(),
        });
        self.append(Role::User, utterance);
    }

    /// One backend call with the current transcript; failures become
    /// the fallback turn and the loop always returns to Speak
    async fn enter_await_reply(&mut self) {
        self.transition_to(Phase::AwaitReply);

        match self.backend.complete(&self.transcript).await {
            Ok(reply) => {
                info!(bytes = reply.len(), "backend reply received");
                self.append(Role::Assistant, reply);
            }
            Err(e) => {
                warn!(%e, "backend call failed, substituting fallback reply");
                self.append(Role::Assistant, FALLBACK_REPLY);
            }
        }

        self.enter_speak().await;
    }

    /// Append a turn and emit the corresponding event
    fn append(&mut self, role: Role, content: impl Into<String>) {
        self.transcript.append(role, content);
        debug!(%role, turns = self.transcript.len(), "turn appended");
        let _ = self.event_tx.send(DialogueEvent::TurnAppended { role });
    }

    /// Perform a phase transition
    fn transition_to(&mut self, new_phase: Phase) {
        let old_phase = self.phase;
        if new_phase == old_phase {
            return;
        }

        info!(
            from = %old_phase,
            to = %new_phase,
            "phase transition"
        );

        self.phase = new_phase;
        let _ = self.event_tx.send(DialogueEvent::PhaseChanged {
            from: old_phase,
            to: new_phase,
        });
    }

    /// Dispatch a command to the speech gateway
    async fn send_command(&self, command: SpeechCommand) {
        debug!(%command, "dispatching speech command");
        if self.command_tx.send(command).await.is_err() {
            warn!("speech gateway channel closed, command dropped");
        }
    }
}
