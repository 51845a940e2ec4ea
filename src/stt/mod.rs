//! Speech recognition.
//!
//! [`Recognizer`] turns one finished 16 kHz mono clip into text.  It is
//! blocking and CPU-bound; callers run it on a dedicated thread or inside
//! `spawn_blocking`.
//!
//! ```rust,no_run
//! use growth_assistant::stt::{Recognizer, WhisperRecognizer};
//!
//! let engine = WhisperRecognizer::load("models/ggml-base.en.bin", "en").unwrap();
//! let text = engine.recognize(&vec![0.0; 16_000]).unwrap();
//! println!("{text}");
//! ```

pub mod whisper;

use thiserror::Error;

pub use whisper::WhisperRecognizer;

/// Shortest clip handed to Whisper (0.5 s).  Shorter clips are padded.
pub const MIN_CLIP_SAMPLES: usize = 8_000;
/// Longest clip handed to Whisper (60 s).
pub const MAX_CLIP_SAMPLES: usize = 960_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SttError {
    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("whisper initialisation failed: {0}")]
    ContextInit(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("clip length {0} samples is outside the supported range")]
    ClipLength(usize),
}

/// Object-safe, thread-safe speech-to-text engine.
///
/// `audio` must be 16 kHz mono `f32` between [`MIN_CLIP_SAMPLES`] and
/// [`MAX_CLIP_SAMPLES`] long.  An empty string means nothing was recognised.
pub trait Recognizer: Send + Sync {
    fn recognize(&self, audio: &[f32]) -> Result<String, SttError>;
}

fn check_clip(audio: &[f32]) -> Result<(), SttError> {
    if (MIN_CLIP_SAMPLES..=MAX_CLIP_SAMPLES).contains(&audio.len()) {
        Ok(())
    } else {
        Err(SttError::ClipLength(audio.len()))
    }
}

/// Canned recogniser for tests.
#[cfg(test)]
pub struct MockRecognizer {
    response: Result<String, SttError>,
}

#[cfg(test)]
impl MockRecognizer {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
        }
    }

    pub fn err(error: SttError) -> Self {
        Self {
            response: Err(error),
        }
    }
}

#[cfg(test)]
impl Recognizer for MockRecognizer {
    fn recognize(&self, audio: &[f32]) -> Result<String, SttError> {
        check_clip(audio)?;
        self.response.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_returns_configured_text() {
        let engine = MockRecognizer::ok("hello there");
        assert_eq!(
            engine.recognize(&vec![0.0; MIN_CLIP_SAMPLES]).unwrap(),
            "hello there"
        );
    }

    #[test]
    fn short_clip_is_rejected() {
        let engine = MockRecognizer::ok("x");
        let err = engine.recognize(&vec![0.0; 10]).unwrap_err();
        assert_eq!(err, SttError::ClipLength(10));
    }

    #[test]
    fn recognizer_is_object_safe() {
        let boxed: Box<dyn Recognizer> = Box::new(MockRecognizer::err(SttError::Inference(
            "boom".into(),
        )));
        assert!(boxed.recognize(&vec![0.0; MIN_CLIP_SAMPLES]).is_err());
    }
}
