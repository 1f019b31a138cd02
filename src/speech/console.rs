//! Console speech gateway
//!
//! Stands in for a real speech stack so the daemon can run anywhere:
//! speak writes the utterance to stdout, listen reads one line from
//! stdin. A listen with no input before the no-input timeout completes
//! empty, matching how a recognizer times out on silence.

use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::{SpeechCommand, SpeechEvent};

/// Bridges the speech command/event channels to stdio
pub struct ConsoleGateway {
    command_rx: mpsc::Receiver<SpeechCommand>,
    event_tx: mpsc::Sender<SpeechEvent>,
    no_input_timeout: Duration,
}

impl ConsoleGateway {
    pub fn new(
        command_rx: mpsc::Receiver<SpeechCommand>,
        event_tx: mpsc::Sender<SpeechEvent>,
        no_input_timeout: Duration,
    ) -> Self {
        Self {
            command_rx,
            event_tx,
            no_input_timeout,
        }
    }

    /// Run against real stdin until the command channel closes
    pub async fn run(self) {
        let stdin = BufReader::new(tokio::io::stdin());
        self.run_with_input(stdin).await;
    }

    /// Run against an arbitrary line source (stdin in production)
    pub async fn run_with_input<R>(mut self, input: R)
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();

        while let Some(command) = self.command_rx.recv().await {
            debug!(%command, "gateway command");
            let done = match command {
                SpeechCommand::Prepare => {
                    info!("console gateway ready");
                    self.emit(SpeechEvent::Ready).await
                }
                SpeechCommand::Speak { utterance } => {
                    println!("{utterance}");
                    self.emit(SpeechEvent::SpeakComplete).await
                }
                SpeechCommand::Listen => self.listen_once(&mut lines).await,
            };
            if done {
                break;
            }
        }

        debug!("console gateway stopped");
    }

    /// Read at most one line within the no-input timeout, then complete
    async fn listen_once<R>(&self, lines: &mut Lines<R>) -> bool
    where
        R: AsyncBufRead + Unpin,
    {
        match timeout(self.no_input_timeout, lines.next_line()).await {
            Ok(Ok(Some(line))) => {
                let utterance = line.trim().to_string();
                if !utterance.is_empty() && self.emit(SpeechEvent::Recognised { utterance }).await {
                    return true;
                }
            }
            Ok(Ok(None)) => {
                debug!("input closed, completing listen empty");
            }
            Ok(Err(e)) => {
                warn!(?e, "input read error, completing listen empty");
            }
            Err(_) => {
                debug!("no input before timeout");
            }
        }
        self.emit(SpeechEvent::ListenComplete).await
    }

    /// Send an event; returns true when the controller side is gone
    async fn emit(&self, event: SpeechEvent) -> bool {
        self.event_tx.send(event).await.is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_gateway(
        timeout: Duration,
    ) -> (
        mpsc::Sender<SpeechCommand>,
        mpsc::Receiver<SpeechEvent>,
        ConsoleGateway,
    ) {
        let (command_tx, command_rx) = mpsc::channel(8);
        let (event_tx, event_rx) = mpsc::channel(8);
        let gateway = ConsoleGateway::new(command_rx, event_tx, timeout);
        (command_tx, event_rx, gateway)
    }

    #[tokio::test]
    async fn test_prepare_answers_ready() {
        let (command_tx, mut event_rx, gateway) = create_gateway(Duration::from_millis(50));
        tokio::spawn(gateway.run_with_input(&b""[..]));

        command_tx.send(SpeechCommand::Prepare).await.unwrap();
        assert_eq!(event_rx.recv().await.unwrap(), SpeechEvent::Ready);
    }

    #[tokio::test]
    async fn test_speak_completes() {
        let (command_tx, mut event_rx, gateway) = create_gateway(Duration::from_millis(50));
        tokio::spawn(gateway.run_with_input(&b""[..]));

        command_tx
            .send(SpeechCommand::Speak {
                utterance: "hello there".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(event_rx.recv().await.unwrap(), SpeechEvent::SpeakComplete);
    }

    #[tokio::test]
    async fn test_listen_recognises_line_then_completes() {
        let (command_tx, mut event_rx, gateway) = create_gateway(Duration::from_secs(1));
        tokio::spawn(gateway.run_with_input(&b"what time is it\n"[..]));

        command_tx.send(SpeechCommand::Listen).await.unwrap();
        assert_eq!(
            event_rx.recv().await.unwrap(),
            SpeechEvent::Recognised {
                utterance: "what time is it".to_string()
            }
        );
        assert_eq!(event_rx.recv().await.unwrap(), SpeechEvent::ListenComplete);
    }

    #[tokio::test]
    async fn test_listen_on_closed_input_completes_empty() {
        let (command_tx, mut event_rx, gateway) = create_gateway(Duration::from_secs(1));
        tokio::spawn(gateway.run_with_input(&b""[..]));

        command_tx.send(SpeechCommand::Listen).await.unwrap();
        assert_eq!(event_rx.recv().await.unwrap(), SpeechEvent::ListenComplete);
    }

    #[tokio::test]
    async fn test_listen_timeout_completes_empty() {
        let (command_tx, mut event_rx, gateway) = create_gateway(Duration::from_millis(20));
        // A pending duplex never yields a line, forcing the timeout path.
        let (_keep_open, reader) = tokio::io::duplex(16);
        tokio::spawn(gateway.run_with_input(BufReader::new(reader)));

        command_tx.send(SpeechCommand::Listen).await.unwrap();
        assert_eq!(event_rx.recv().await.unwrap(), SpeechEvent::ListenComplete);
    }

    #[tokio::test]
    async fn test_blank_line_is_silence() {
        let (command_tx, mut event_rx, gateway) = create_gateway(Duration::from_secs(1));
        tokio::spawn(gateway.run_with_input(&b"   \n"[..]));

        command_tx.send(SpeechCommand::Listen).await.unwrap();
        assert_eq!(event_rx.recv().await.unwrap(), SpeechEvent::ListenComplete);
    }
}
