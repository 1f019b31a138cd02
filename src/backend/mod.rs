//! Chat backend module
//!
//! One asynchronous chat-completion request per dialogue turn. The
//! controller only sees the [`ChatBackend`] trait, so tests can inject
//! mock backends; the concrete client talks to a local Ollama endpoint.

mod client;

pub use client::OllamaClient;

use async_trait::async_trait;
use thiserror::Error;

use crate::transcript::Transcript;

/// Failures of a single chat-completion attempt
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport-level failure (connection refused, timeout, ...)
    #[error("backend request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Backend answered with a non-success HTTP status
    #[error("backend returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Response body did not match the expected chat shape
    #[error("malformed backend response: {0}")]
    Malformed(String),
}

/// Boundary to the conversational-reply service
///
/// Implementations perform exactly one attempt; retry policy, if any,
/// belongs to the caller.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Replay the transcript as context and return the reply text
    async fn complete(&self, transcript: &Transcript) -> Result<String, BackendError>;
}
