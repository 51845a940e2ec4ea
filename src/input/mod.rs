//! Input adapter: single-utterance speech capture.
//!
//! [`UtteranceCapture`] is the seam the controller talks to: one call to
//! [`capture`](UtteranceCapture::capture) acquires the microphone, waits for
//! one utterance (or an error), and releases the microphone again.  Nothing
//! restarts on its own; the controller decides when to re-arm.
//!
//! [`MicrophoneCapture`] is the production implementation (cpal + Whisper).
//! The hosted bidirectional variant lives in [`crate::voice`].

pub mod microphone;

use std::time::Instant;

use async_trait::async_trait;
use thiserror::Error;

pub use microphone::MicrophoneCapture;

// ---------------------------------------------------------------------------
// Utterance
// ---------------------------------------------------------------------------

/// One unit of captured user speech or typed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    pub captured_at: Instant,
}

impl Utterance {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            captured_at: Instant::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Why a capture produced no utterance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// The OS or the user refused microphone access.  Carries remediation text.
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),

    /// No input device, or the device went away.
    #[error("input device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Nothing intelligible was heard.
    #[error("no speech detected")]
    NoResult,

    /// The recogniser itself failed.
    #[error("speech recognition failed: {0}")]
    Provider(String),
}

// ---------------------------------------------------------------------------
// UtteranceCapture
// ---------------------------------------------------------------------------

/// Single-shot capture source.
///
/// Contract:
/// - each `capture()` yields exactly one `Ok(Utterance)` or one error;
/// - `cancel()` makes an in-progress `capture()` release the device promptly
///   and is a no-op when idle;
/// - `capture()` never restarts itself.
#[async_trait]
pub trait UtteranceCapture: Send + Sync {
    async fn capture(&self) -> Result<Utterance, CaptureError>;

    fn cancel(&self);

    /// `true` while the microphone is held.
    fn is_active(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utterance_records_capture_time() {
        let before = Instant::now();
        let u = Utterance::new("hello");
        assert_eq!(u.text, "hello");
        assert!(u.captured_at >= before);
    }

    #[test]
    fn capture_error_display() {
        assert_eq!(CaptureError::NoResult.to_string(), "no speech detected");
        assert!(CaptureError::DeviceUnavailable("usb mic".into())
            .to_string()
            .contains("usb mic"));
    }
}
