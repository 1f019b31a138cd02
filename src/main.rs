//! voiceloop-daemon: Background daemon for a voice-driven dialogue manager
//!
//! The daemon coordinates turn-taking between a human speaker and a
//! language-model chat backend, mediating through a speech subsystem:
//! - Explicit dialogue state machine (Prepare, Speak, Listen, AwaitReply)
//! - Speech gateway boundary with a console (stdio) implementation
//! - One non-streaming chat-completion call per turn, fallback on failure
//! - IPC server for the start trigger and status display

mod backend;
mod config;
mod dialogue;
mod events;
mod ipc;
mod lifecycle;
mod speech;
mod transcript;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::backend::OllamaClient;
use crate::config::Config;
use crate::dialogue::DialogueController;
use crate::events::DialogueEvent;
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::speech::ConsoleGateway;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "voiceloop-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, backend_url = %config.backend_url, model = %config.model, "configuration loaded");

    // Create shutdown signal handler
    let shutdown = ShutdownSignal::new();

    // Create channels for inter-component communication
    // Controller -> speech gateway (commands)
    let (command_tx, command_rx) = mpsc::channel(32);
    // Speech gateway -> controller (events)
    let (speech_tx, speech_rx) = mpsc::channel(32);
    // IPC server -> controller (start trigger, fires once)
    let (start_tx, start_rx) = mpsc::channel(1);
    // Controller -> IPC server and subscribers (dialogue events)
    let (event_tx, _event_rx) = broadcast::channel::<DialogueEvent>(64);

    // Create the chat backend client
    let chat_backend = OllamaClient::new(config.backend_url.as_str(), config.model.as_str())?;

    // Create the dialogue controller
    let mut controller = DialogueController::new(
        chat_backend,
        command_tx,
        event_tx.clone(),
        config.system_prompt.as_str(),
        config.greeting.as_str(),
    );

    // Start the console speech gateway (runs as its own task)
    let gateway = ConsoleGateway::new(command_rx, speech_tx, config.no_input_timeout);
    let gateway_handle = tokio::spawn(gateway.run());
    info!("console speech gateway started");

    // Create IPC server carrying the start trigger and event stream
    let server = Server::new(&config.socket_path, event_tx.clone(), start_tx)?;

    // Subscribe to dialogue events for status updates
    let mut status_event_rx = event_tx.subscribe();
    let server_for_events = &server;

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        // Run the dialogue controller (waits for start, then loops)
        _ = controller.run(start_rx, speech_rx) => {
            info!("dialogue controller exited");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Fold dialogue events into the IPC status snapshot
        _ = async {
            loop {
                match status_event_rx.recv().await {
                    Ok(event) => {
                        debug!(%event, "dialogue event");
                        server_for_events.apply_event(&event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "dialogue event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        } => {
            info!("dialogue event handler exited");
        }

        // Wait for shutdown signal
        result = shutdown.wait() => {
            match result {
                Ok(()) => info!("shutdown signal received"),
                Err(e) => error!(?e, "signal handler error"),
            }
        }
    }

    // Cleanup
    info!("shutting down...");

    gateway_handle.abort();
    server.shutdown().await;

    info!("voiceloop-daemon stopped");

    Ok(())
}
