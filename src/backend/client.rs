//! Ollama chat client
//!
//! Non-streaming POST to the `/api/chat` endpoint with a fixed model
//! identifier. The reply text lives at `message.content` in the
//! response body.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::transcript::{Transcript, Turn};

use super::{BackendError, ChatBackend};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP client for a local Ollama chat endpoint
pub struct OllamaClient {
    client: reqwest::Client,
    url: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl OllamaClient {
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    async fn complete(&self, transcript: &Transcript) -> Result<String, BackendError> {
        let request = ChatRequest {
            model: &self.model,
            messages: transcript.turns(),
            stream: false,
        };

        debug!(url = %self.url, model = %self.model, turns = transcript.len(), "calling backend");

        let response = self.client.post(&self.url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;

        Ok(body.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Role;

    #[test]
    fn test_request_serialization() {
        let mut transcript = Transcript::new("You are helpful.", "Hello!");
        transcript.append(Role::User, "what time is it");

        let request = ChatRequest {
            model: "gemma2:latest",
            messages: transcript.turns(),
            stream: false,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""model":"gemma2:latest""#));
        assert!(json.contains(r#""stream":false"#));
        assert!(json.contains(r#""role":"system""#));
        assert!(json.contains(r#""content":"what time is it""#));
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{
            "model": "gemma2:latest",
            "created_at": "2024-01-01T00:00:00Z",
            "message": {"role": "assistant", "content": "It's 3 PM."},
            "done": true
        }"#;

        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.message.content, "It's 3 PM.");
    }

    #[test]
    fn test_response_missing_message_is_malformed() {
        let json = r#"{"done": true}"#;
        assert!(serde_json::from_str::<ChatResponse>(json).is_err());
    }
}
