//! Hosted bidirectional voice session.
//!
//! In Hosted mode the provider runs transcription, the model and the voice
//! itself; the app only starts the call, listens for lifecycle events and
//! stops it.  [`VoiceSessionClient`] is the seam; [`HttpVoiceSession`] is
//! the REST implementation.

pub mod http;
pub mod request;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

pub use http::HttpVoiceSession;
pub use request::{AssistantSpec, VoiceSessionRequest};

/// Lifecycle notifications from the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceSessionEvent {
    CallStarted,
    SpeechStarted,
    SpeechEnded,
    CallEnded,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoiceSessionError {
    #[error("voice provider unreachable: {0}")]
    Network(String),

    #[error("voice provider rejected the key: {0}")]
    Auth(String),

    #[error("voice provider error: {0}")]
    Upstream(String),

    #[error("voice session fault: {0}")]
    Provider(String),
}

impl From<reqwest::Error> for VoiceSessionError {
    fn from(e: reqwest::Error) -> Self {
        VoiceSessionError::Network(e.to_string())
    }
}

/// Provider-managed call.
///
/// `start` resolves once the provider accepted the call; lifecycle events
/// then arrive on every registered listener until the call ends.
#[async_trait]
pub trait VoiceSessionClient: Send + Sync {
    async fn start(
        &self,
        request: &VoiceSessionRequest,
        listener: mpsc::Sender<VoiceSessionEvent>,
    ) -> Result<(), VoiceSessionError>;

    /// End the live call.  Ok when nothing is live.
    async fn stop(&self) -> Result<(), VoiceSessionError>;

    /// Drop every registered listener.
    fn remove_all_listeners(&self);
}
