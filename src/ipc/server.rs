//! Unix domain socket server for IPC
//!
//! Provides request-response communication (status queries, the start
//! trigger) and push notifications for dialogue events to subscribed
//! clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, error, info, warn};

use crate::events::DialogueEvent;

use super::protocol::{label_for, Notification, Request, Response, SessionStatus};

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    state: Arc<RwLock<ServerState>>,
    shutdown_tx: broadcast::Sender<()>,
    /// Dialogue events, re-broadcast to subscribed clients
    events: broadcast::Sender<DialogueEvent>,
    /// Delivers the start trigger to the dialogue controller
    start_tx: mpsc::Sender<()>,
}

/// Shared server state
struct ServerState {
    status: SessionStatus,
    start_time: std::time::Instant,
    /// The start trigger fires at most once per session
    started: bool,
}

impl Server {
    /// Create a new IPC server bound to the given socket path
    pub fn new(
        socket_path: &Path,
        events: broadcast::Sender<DialogueEvent>,
        start_tx: mpsc::Sender<()>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        let state = Arc::new(RwLock::new(ServerState {
            status: SessionStatus::default(),
            start_time: std::time::Instant::now(),
            started: false,
        }));

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            state,
            shutdown_tx,
            events,
            start_tx,
        })
    }

    /// Fold a dialogue event into the status snapshot
    pub async fn apply_event(&self, event: &DialogueEvent) {
        let mut state = self.state.write().await;
        match event {
            DialogueEvent::PhaseChanged { to, .. } => {
                state.status.phase = *to;
                state.status.label = label_for(*to).to_string();
                debug!(phase = %to, "IPC server: status phase updated");
            }
            DialogueEvent::TurnAppended { .. } => {
                state.status.turns += 1;
            }
            DialogueEvent::UtteranceRecognised { utterance } => {
                state.status.last_utterance = utterance.clone();
            }
        }
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let state = Arc::clone(&self.state);
                    let start_tx = self.start_tx.clone();
                    let event_rx = self.events.subscribe();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, state, start_tx, event_rx) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(
        mut stream: UnixStream,
        state: Arc<RwLock<ServerState>>,
        start_tx: mpsc::Sender<()>,
        event_rx: broadcast::Receiver<DialogueEvent>,
    ) -> Result<()> {
        let mut len_buf = [0u8; 4];

        loop {
            // Read message length (4-byte little-endian)
            match stream.read_exact(&mut len_buf).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    debug!("client disconnected");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len > 1024 * 1024 {
                warn!(len, "message too large, disconnecting");
                return Ok(());
            }

            // Read message body
            let mut msg_buf = vec![0u8; len];
            stream.read_exact(&mut msg_buf).await?;

            // Parse request
            let request: Request =
                serde_json::from_slice(&msg_buf).context("failed to parse request")?;

            debug!(?request, "received request");

            // Process request
            let (response, subscribe) = Self::process_request(request, &state, &start_tx).await;

            // Send response
            Self::send_message(&mut stream, &response).await?;

            // A subscribed connection becomes push-only: no further
            // requests are read, dialogue events are forwarded instead
            if subscribe {
                debug!("client subscribed to notifications");
                return Self::push_notifications(stream, event_rx).await;
            }
        }
    }

    /// Forward dialogue events to a subscribed client until it goes away
    async fn push_notifications(
        mut stream: UnixStream,
        mut event_rx: broadcast::Receiver<DialogueEvent>,
    ) -> Result<()> {
        loop {
            match event_rx.recv().await {
                Ok(event) => {
                    let note = Notification::Event(event);
                    if Self::send_message(&mut stream, &note).await.is_err() {
                        debug!("subscribed client disconnected");
                        return Ok(());
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "subscribed client lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Ok(());
                }
            }
        }
    }

    /// Send a length-prefixed JSON message
    async fn send_message<T: serde::Serialize>(stream: &mut UnixStream, msg: &T) -> Result<()> {
        let msg_bytes = serde_json::to_vec(msg)?;
        let msg_len = (msg_bytes.len() as u32).to_le_bytes();

        stream.write_all(&msg_len).await?;
        stream.write_all(&msg_bytes).await?;

        Ok(())
    }

    /// Process a request and return a response
    /// Returns (Response, should_subscribe)
    async fn process_request(
        request: Request,
        state: &Arc<RwLock<ServerState>>,
        start_tx: &mpsc::Sender<()>,
    ) -> (Response, bool) {
        match request {
            Request::Ping => (Response::Pong, false),

            Request::GetStatus => {
                let mut state = state.write().await;
                state.status.uptime_secs = state.start_time.elapsed().as_secs();
                (Response::Status(state.status.clone()), false)
            }

            Request::Start => {
                let mut state = state.write().await;
                if state.started {
                    return (
                        Response::Error {
                            code: "already_started".to_string(),
                            message: "dialogue session is already running".to_string(),
                        },
                        false,
                    );
                }
                match start_tx.try_send(()) {
                    Ok(()) => {
                        state.started = true;
                        info!("session started via IPC");
                        (Response::Started, false)
                    }
                    Err(e) => {
                        warn!(?e, "failed to deliver start trigger");
                        (
                            Response::Error {
                                code: "start_failed".to_string(),
                                message: "dialogue controller is not accepting the trigger"
                                    .to_string(),
                            },
                            false,
                        )
                    }
                }
            }

            Request::Subscribe => (Response::Subscribed, true),
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::Phase;

    fn create_state() -> Arc<RwLock<ServerState>> {
        Arc::new(RwLock::new(ServerState {
            status: SessionStatus::default(),
            start_time: std::time::Instant::now(),
            started: false,
        }))
    }

    #[tokio::test]
    async fn test_ping() {
        let state = create_state();
        let (start_tx, _start_rx) = mpsc::channel(1);
        let (resp, subscribe) = Server::process_request(Request::Ping, &state, &start_tx).await;
        assert!(matches!(resp, Response::Pong));
        assert!(!subscribe);
    }

    #[tokio::test]
    async fn test_start_delivers_trigger_once() {
        let state = create_state();
        let (start_tx, mut start_rx) = mpsc::channel(1);

        let (resp, _) = Server::process_request(Request::Start, &state, &start_tx).await;
        assert!(matches!(resp, Response::Started));
        assert!(start_rx.try_recv().is_ok());

        let (resp, _) = Server::process_request(Request::Start, &state, &start_tx).await;
        assert!(matches!(resp, Response::Error { code, .. } if code == "already_started"));
        assert!(start_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_status_reflects_applied_events() {
        let (events, _) = broadcast::channel(8);
        let (start_tx, _start_rx) = mpsc::channel(1);
        let dir = std::env::temp_dir().join(format!("voiceloop-test-{}", std::process::id()));
        let socket = dir.join("status.sock");
        let server = Server::new(&socket, events, start_tx).unwrap();

        server
            .apply_event(&DialogueEvent::PhaseChanged {
                from: Phase::Idle,
                to: Phase::Listen,
            })
            .await;
        server
            .apply_event(&DialogueEvent::TurnAppended {
                role: crate::transcript::Role::User,
            })
            .await;
        server
            .apply_event(&DialogueEvent::UtteranceRecognised {
                utterance: "hello".to_string(),
            })
            .await;

        let state = server.state.read().await;
        assert_eq!(state.status.phase, Phase::Listen);
        assert_eq!(state.status.label, "Listening...");
        assert_eq!(state.status.turns, 3);
        assert_eq!(state.status.last_utterance, "hello");
        drop(state);

        server.shutdown().await;
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_subscribe_flags_connection() {
        let state = create_state();
        let (start_tx, _start_rx) = mpsc::channel(1);
        let (resp, subscribe) =
            Server::process_request(Request::Subscribe, &state, &start_tx).await;
        assert!(matches!(resp, Response::Subscribed));
        assert!(subscribe);
    }
}
