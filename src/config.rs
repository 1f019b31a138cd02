//! Configuration loading and management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_BACKEND_URL: &str = "http://localhost:11434/api/chat";
const DEFAULT_MODEL: &str = "gemma2:latest";
const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful voice assistant. Keep your answers short enough to be spoken aloud.";
const DEFAULT_GREETING: &str = "Hello! How can I help you today?";
const DEFAULT_NO_INPUT_TIMEOUT_MS: u64 = 5000;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Chat backend endpoint (non-streaming JSON chat)
    pub backend_url: String,

    /// Model identifier sent with every backend request
    pub model: String,

    /// Instruction preamble, first turn of every transcript
    pub system_prompt: String,

    /// Seed assistant turn, spoken when the session starts
    pub greeting: String,

    /// How long a listen waits for input before completing empty
    pub no_input_timeout: Duration,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("voiceloop");

        let socket_path = match std::env::var("VOICELOOP_SOCKET") {
            Ok(path) => PathBuf::from(path),
            Err(_) => data_dir.join("daemon.sock"),
        };

        let no_input_timeout_ms = match std::env::var("VOICELOOP_NO_INPUT_TIMEOUT_MS") {
            Ok(raw) => raw
                .parse::<u64>()
                .context("VOICELOOP_NO_INPUT_TIMEOUT_MS must be an integer")?,
            Err(_) => DEFAULT_NO_INPUT_TIMEOUT_MS,
        };

        Ok(Self {
            socket_path,
            data_dir,
            backend_url: env_or("VOICELOOP_BACKEND_URL", DEFAULT_BACKEND_URL),
            model: env_or("VOICELOOP_MODEL", DEFAULT_MODEL),
            system_prompt: env_or("VOICELOOP_SYSTEM_PROMPT", DEFAULT_SYSTEM_PROMPT),
            greeting: env_or("VOICELOOP_GREETING", DEFAULT_GREETING),
            no_input_timeout: Duration::from_millis(no_input_timeout_ms),
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 6] = [
        "VOICELOOP_SOCKET",
        "VOICELOOP_BACKEND_URL",
        "VOICELOOP_MODEL",
        "VOICELOOP_SYSTEM_PROMPT",
        "VOICELOOP_GREETING",
        "VOICELOOP_NO_INPUT_TIMEOUT_MS",
    ];

    /// Pin the environment so assertions hold regardless of the host.
    /// Defaults and overrides share one test because the vars are
    /// process-global and tests run in parallel.
    #[test]
    fn test_config_load() {
        std::env::set_var("HOME", "/tmp/voiceloop-test-home");
        for key in VARS {
            std::env::remove_var(key);
        }

        let config = Config::load().unwrap();
        assert!(config.socket_path.to_string_lossy().contains("voiceloop"));
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.no_input_timeout, Duration::from_millis(5000));
        assert!(!config.greeting.is_empty());
        assert!(!config.system_prompt.is_empty());

        std::env::set_var("VOICELOOP_SOCKET", "/tmp/voiceloop-test-home/alt.sock");
        std::env::set_var("VOICELOOP_BACKEND_URL", "http://localhost:9999/api/chat");
        std::env::set_var("VOICELOOP_MODEL", "llama3:latest");
        std::env::set_var("VOICELOOP_NO_INPUT_TIMEOUT_MS", "250");

        let config = Config::load().unwrap();
        assert_eq!(
            config.socket_path,
            PathBuf::from("/tmp/voiceloop-test-home/alt.sock")
        );
        assert_eq!(config.backend_url, "http://localhost:9999/api/chat");
        assert_eq!(config.model, "llama3:latest");
        assert_eq!(config.no_input_timeout, Duration::from_millis(250));

        std::env::set_var("VOICELOOP_NO_INPUT_TIMEOUT_MS", "not-a-number");
        assert!(Config::load().is_err());

        for key in VARS {
            std::env::remove_var(key);
        }
    }
}
