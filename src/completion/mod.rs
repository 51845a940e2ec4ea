//! Completion adapter: transcript in, one assistant reply out.
//!
//! [`CompletionClient`] is the seam the controller calls.
//! [`ChatCompletionClient`] talks to any OpenAI-compatible
//! `/v1/chat/completions` endpoint (Groq by default, Ollama in OpenAI mode,
//! OpenAI itself …).  The persona lives in [`prompt`].

pub mod client;
pub mod prompt;

use async_trait::async_trait;
use thiserror::Error;

use crate::session::TranscriptEntry;

pub use client::ChatCompletionClient;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    /// Transport-level failure (DNS, refused, reset …).
    #[error("completion request failed: {0}")]
    Network(String),

    #[error("completion request timed out")]
    Timeout,

    /// 401 / 403 from the endpoint.
    #[error("completion endpoint rejected the API key: {0}")]
    Auth(String),

    /// Any other non-2xx status, or a body without a usable reply.
    #[error("completion endpoint error: {0}")]
    Upstream(String),
}

impl From<reqwest::Error> for CompletionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CompletionError::Timeout
        } else {
            CompletionError::Network(e.to_string())
        }
    }
}

/// One request yields exactly one reply or one error.
///
/// `transcript` starts with the system entry and ends with the newest user
/// turn.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, transcript: &[TranscriptEntry]) -> Result<String, CompletionError>;
}
