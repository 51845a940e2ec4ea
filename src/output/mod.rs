//! Output adapter: speak one reply, report how it ended.
//!
//! [`SpeechOutput::speak`] resolves once playback finished or was
//! interrupted.  [`SpeechOutput::interrupt`] stops the current reply and is
//! a no-op when nothing is playing.

pub mod speaker;

use async_trait::async_trait;
use thiserror::Error;

pub use speaker::SpeakerOutput;

/// How a `speak` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Finished,
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// No output device, or it could not be opened.
    #[error("output device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The speech synthesis request failed.
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    /// The synthesised audio could not be decoded.
    #[error("could not decode synthesised audio: {0}")]
    Decode(String),
}

#[async_trait]
pub trait SpeechOutput: Send + Sync {
    async fn speak(&self, text: &str) -> Result<PlaybackOutcome, PlaybackError>;

    fn interrupt(&self);

    fn is_playing(&self) -> bool;
}
