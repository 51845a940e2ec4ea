//! Controller-level error taxonomy.
//!
//! Every adapter has its own `thiserror` enum; they all convert into
//! [`AssistantError`] at the controller boundary so the state machine only
//! ever deals with one classified type.

use thiserror::Error;

use crate::completion::CompletionError;
use crate::input::CaptureError;
use crate::output::PlaybackError;
use crate::voice::VoiceSessionError;

use super::state::SessionState;

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Coarse classification used for logging and user-facing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    PermissionDenied,
    DeviceUnavailable,
    NoResult,
    Network,
    Auth,
    Upstream,
    Provider,
    InvalidState,
}

// ---------------------------------------------------------------------------
// AssistantError
// ---------------------------------------------------------------------------

/// Errors surfaced by the session controller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssistantError {
    /// A required credential or identifier is missing.  Never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The microphone was refused by the OS or the user.
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),

    /// No usable input/output device.
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Capture finished without any recognisable speech.
    #[error("no speech detected")]
    NoResult,

    /// Transport failure or timeout talking to a remote service.
    #[error("network error: {0}")]
    Network(String),

    /// The remote service rejected our credential.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The remote service answered with an error or an unusable body.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The voice or speech provider reported a fault.
    #[error("provider error: {0}")]
    Provider(String),

    /// The requested operation is not legal in the current state.
    #[error("{operation} is not allowed while {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },
}

impl AssistantError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AssistantError::Configuration(_) => ErrorKind::Configuration,
            AssistantError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            AssistantError::DeviceUnavailable(_) => ErrorKind::DeviceUnavailable,
            AssistantError::NoResult => ErrorKind::NoResult,
            AssistantError::Network(_) => ErrorKind::Network,
            AssistantError::Auth(_) => ErrorKind::Auth,
            AssistantError::Upstream(_) => ErrorKind::Upstream,
            AssistantError::Provider(_) => ErrorKind::Provider,
            AssistantError::InvalidState { .. } => ErrorKind::InvalidState,
        }
    }

    /// Short text shown in the panel while in the Error state.
    ///
    /// Transport-type failures share one generic message; the detail only
    /// goes to the log.
    pub fn user_message(&self) -> String {
        match self {
            AssistantError::Configuration(detail) => {
                format!("Assistant is not set up yet: {detail}")
            }
            AssistantError::PermissionDenied(hint) => {
                format!("Microphone blocked. {hint}")
            }
            AssistantError::DeviceUnavailable(_) => {
                "No microphone or speaker found.".to_string()
            }
            AssistantError::NoResult => "I didn't catch that. Tap to try again.".to_string(),
            AssistantError::Network(_)
            | AssistantError::Auth(_)
            | AssistantError::Upstream(_)
            | AssistantError::Provider(_) => {
                "Connection issue. Please try again.".to_string()
            }
            AssistantError::InvalidState { .. } => "Please wait a moment.".to_string(),
        }
    }

    /// `true` for results the controller may re-arm without telling the user.
    pub fn is_silently_rearmable(&self) -> bool {
        matches!(self, AssistantError::NoResult)
    }
}

// ---------------------------------------------------------------------------
// Adapter conversions
// ---------------------------------------------------------------------------

impl From<CaptureError> for AssistantError {
    fn from(e: CaptureError) -> Self {
        match e {
            CaptureError::PermissionDenied(hint) => AssistantError::PermissionDenied(hint),
            CaptureError::DeviceUnavailable(detail) => AssistantError::DeviceUnavailable(detail),
            CaptureError::NoResult => AssistantError::NoResult,
            CaptureError::Provider(detail) => AssistantError::Provider(detail),
        }
    }
}

impl From<CompletionError> for AssistantError {
    fn from(e: CompletionError) -> Self {
        match e {
            CompletionError::Network(detail) => AssistantError::Network(detail),
            CompletionError::Timeout => AssistantError::Network("request timed out".into()),
            CompletionError::Auth(detail) => AssistantError::Auth(detail),
            CompletionError::Upstream(detail) => AssistantError::Upstream(detail),
        }
    }
}

impl From<PlaybackError> for AssistantError {
    fn from(e: PlaybackError) -> Self {
        match e {
            PlaybackError::DeviceUnavailable(detail) => AssistantError::DeviceUnavailable(detail),
            PlaybackError::Synthesis(detail) => AssistantError::Provider(detail),
            PlaybackError::Decode(detail) => AssistantError::Provider(detail),
        }
    }
}

impl From<VoiceSessionError> for AssistantError {
    fn from(e: VoiceSessionError) -> Self {
        match e {
            VoiceSessionError::Network(detail) => AssistantError::Network(detail),
            VoiceSessionError::Auth(detail) => AssistantError::Auth(detail),
            VoiceSessionError::Upstream(detail) => AssistantError::Upstream(detail),
            VoiceSessionError::Provider(detail) => AssistantError::Provider(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_share_generic_message() {
        let msgs: Vec<String> = [
            AssistantError::Network("dns".into()),
            AssistantError::Auth("401".into()),
            AssistantError::Upstream("500".into()),
        ]
        .iter()
        .map(AssistantError::user_message)
        .collect();

        assert!(msgs.iter().all(|m| m == "Connection issue. Please try again."));
    }

    #[test]
    fn permission_message_keeps_remediation_hint() {
        let e = AssistantError::from(CaptureError::PermissionDenied(
            "Allow microphone access in system settings.".into(),
        ));
        assert_eq!(e.kind(), ErrorKind::PermissionDenied);
        assert!(e.user_message().contains("system settings"));
    }

    #[test]
    fn configuration_message_differs_from_transport_message() {
        let cfg = AssistantError::Configuration("key missing".into());
        let net = AssistantError::Network("refused".into());
        assert_ne!(cfg.user_message(), net.user_message());
    }

    #[test]
    fn completion_timeout_is_classified_as_network() {
        let e = AssistantError::from(CompletionError::Timeout);
        assert_eq!(e.kind(), ErrorKind::Network);
    }

    #[test]
    fn only_no_result_is_silently_rearmable() {
        assert!(AssistantError::NoResult.is_silently_rearmable());
        assert!(!AssistantError::DeviceUnavailable("x".into()).is_silently_rearmable());
        assert!(!AssistantError::Provider("x".into()).is_silently_rearmable());
    }
}
