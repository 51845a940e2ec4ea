//! Typed messages flowing into the controller.
//!
//! UI intents arrive as [`AssistantCommand`]s.  Adapter results arrive as
//! [`SessionEvent`]s wrapped in a [`TaggedEvent`] that records the session
//! generation the work was started under.

use crate::input::{CaptureError, Utterance};
use crate::output::PlaybackError;

use super::error::AssistantError;

/// Intents sent by the panel and the hotkey listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantCommand {
    Open,
    Close,
    /// Open when closed, close (with teardown) when open.
    TogglePanel,
    StartCall,
    EndCall,
    ToggleCall,
    SubmitUtterance(String),
    /// Tear down and stop `run`, even while other senders are still alive.
    Shutdown,
}

/// Identifies one completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionTicket {
    pub generation: u64,
    /// Transcript length when the request was issued.
    pub transcript_len: usize,
}

/// Delivery status of a [`Completion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Pending,
    Delivered,
    Failed,
}

/// One assistant reply and the request it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub ticket: CompletionTicket,
    pub status: DeliveryStatus,
}

/// Adapter outcomes, the closed set the transition function understands.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Local call is ready (or hosted provider reported call start).
    SessionStarted,
    /// Hosted provider ended the call.
    SessionEnded,
    /// Hosted provider fault.
    ProviderError(String),
    /// The hosted call could not be placed.
    ConnectFailed(AssistantError),
    /// Hosted assistant started talking.
    AssistantSpeechStarted,
    /// Hosted assistant stopped talking.
    AssistantSpeechEnded,
    CaptureResult(Utterance),
    CaptureError(CaptureError),
    CompletionReady(Completion),
    CompletionFailed {
        ticket: CompletionTicket,
        error: AssistantError,
    },
    PlaybackStarted,
    PlaybackFinished,
    PlaybackInterrupted,
    PlaybackFailed(PlaybackError),
}

/// A [`SessionEvent`] stamped with the generation it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedEvent {
    pub generation: u64,
    pub event: SessionEvent,
}

impl TaggedEvent {
    pub fn new(generation: u64, event: SessionEvent) -> Self {
        Self { generation, event }
    }
}
