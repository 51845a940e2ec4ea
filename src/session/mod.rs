//! Session lifecycle: state, transcript, errors and the controller that
//! drives them.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use growth_assistant::completion::ChatCompletionClient;
//! use growth_assistant::config::AppConfig;
//! use growth_assistant::input::MicrophoneCapture;
//! use growth_assistant::output::SpeakerOutput;
//! use growth_assistant::session::{new_shared_panel, Adapters, AssistantCommand, SessionController};
//! use growth_assistant::stt::WhisperRecognizer;
//! use growth_assistant::voice::HttpVoiceSession;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = AppConfig::load()?;
//! let recognizer = Arc::new(WhisperRecognizer::load("models/ggml-base.en.bin", "en")?);
//! let adapters = Adapters {
//!     capture: Arc::new(MicrophoneCapture::new(recognizer, config.speech.clone())),
//!     completion: Arc::new(ChatCompletionClient::from_config(&config.completion)),
//!     speech: Arc::new(SpeakerOutput::from_config(&config.tts)),
//!     voice: Arc::new(HttpVoiceSession::from_config(&config.voice)),
//! };
//!
//! let panel = new_shared_panel();
//! let (tx, rx) = tokio::sync::mpsc::channel(16);
//! tokio::spawn(SessionController::new(config, adapters, panel.clone()).run(rx));
//! tx.send(AssistantCommand::ToggleCall).await?;
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod error;
pub mod events;
pub mod state;
pub mod transcript;

#[cfg(test)]
pub(crate) mod test_support;

pub use controller::{Adapters, SessionController, TICK_INTERVAL};
pub use error::{AssistantError, ErrorKind};
pub use events::{
    AssistantCommand, Completion, CompletionTicket, DeliveryStatus, SessionEvent, TaggedEvent,
};
pub use state::{
    format_elapsed, new_shared_panel, CallMode, PanelSnapshot, Session, SessionState, SharedPanel,
};
pub use transcript::{Role, Transcript, TranscriptEntry};
