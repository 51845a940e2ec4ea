//! Session state machine types and the shared panel snapshot.
//!
//! [`Session`] is owned exclusively by the controller.  The UI never sees it
//! directly; it reads a [`PanelSnapshot`] through [`SharedPanel`], which the
//! controller rewrites after every transition.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::error::AssistantError;
use super::transcript::{Transcript, TranscriptEntry};

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// States of one assistant engagement.
///
/// ```text
/// Idle ──start_call──▶ Connecting ──session started──▶ Listening
///   Listening ──utterance──▶ Thinking ──reply──▶ Speaking ──finished──▶ Listening
/// any ──fault──▶ Error ──timeout──▶ Idle
/// any ──end_call / close──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Connecting,
    Listening,
    Thinking,
    Speaking,
    Error,
}

impl SessionState {
    /// `true` whenever a teardown has something to release.
    pub fn is_engaged(&self) -> bool {
        !matches!(self, SessionState::Idle | SessionState::Error)
    }

    /// Status line shown under the avatar.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "Ready for your free audit?",
            SessionState::Connecting => "Connecting secure line...",
            SessionState::Listening => "Listening...",
            SessionState::Thinking => "Thinking...",
            SessionState::Speaking => "Speaking...",
            SessionState::Error => "Call failed",
        }
    }
}

// ---------------------------------------------------------------------------
// CallMode
// ---------------------------------------------------------------------------

/// Which call, if any, is currently live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallMode {
    /// No call; typed messages only.
    #[default]
    None,
    /// Microphone + completion + speech loop driven by the controller.
    Local,
    /// Provider-managed voice session.
    Hosted,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The unit of one assistant engagement.
#[derive(Debug)]
pub struct Session {
    pub state: SessionState,
    pub started_at: Option<Instant>,
    pub transcript: Transcript,
    pub last_error: Option<AssistantError>,
    /// When the current Error state was entered.
    pub error_since: Option<Instant>,
    /// Bumped on every teardown; results tagged with an older value are stale.
    pub generation: u64,
    pub call: CallMode,
}

impl Session {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            state: SessionState::Idle,
            started_at: None,
            transcript: Transcript::new(system_prompt),
            last_error: None,
            error_since: None,
            generation: 0,
            call: CallMode::None,
        }
    }

    /// Start a fresh engagement: empty transcript, new start time.
    pub fn begin(&mut self, now: Instant, call: CallMode) {
        self.transcript.reset();
        self.started_at = Some(now);
        self.last_error = None;
        self.error_since = None;
        self.call = call;
    }

    /// Destroy the engagement and invalidate everything still in flight.
    pub fn reset(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.state = SessionState::Idle;
        self.started_at = None;
        self.transcript.reset();
        self.last_error = None;
        self.error_since = None;
        self.call = CallMode::None;
    }

    /// Abandon the engagement after an unrecoverable fault.  In-flight work
    /// is invalidated like a teardown; the error stays visible until the
    /// controller returns to Idle.
    pub fn fail(&mut self, error: AssistantError, now: Instant) {
        self.generation = self.generation.wrapping_add(1);
        self.state = SessionState::Error;
        self.call = CallMode::None;
        self.last_error = Some(error);
        self.error_since = Some(now);
    }

    /// Something exists that a teardown must destroy: a call, an in-progress
    /// turn, or a conversation started by typing.
    pub fn is_live(&self) -> bool {
        self.state.is_engaged()
            || self.call != CallMode::None
            || self.started_at.is_some()
            || self.transcript.len() > 1
    }

    /// Elapsed call time, derived from the start timestamp.
    pub fn elapsed(&self, now: Instant) -> Duration {
        self.started_at
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// PanelSnapshot / SharedPanel
// ---------------------------------------------------------------------------

/// Everything the panel renders, copied out of the controller.
#[derive(Debug, Clone, Default)]
pub struct PanelSnapshot {
    pub open: bool,
    pub state: SessionState,
    pub call: CallMode,
    pub elapsed: Duration,
    pub error_message: Option<String>,
    /// Conversation turns (system prompt excluded).
    pub turns: Vec<TranscriptEntry>,
}

impl PanelSnapshot {
    /// The status line under the avatar.
    pub fn status_line(&self) -> String {
        match self.state {
            SessionState::Error => self
                .error_message
                .clone()
                .unwrap_or_else(|| SessionState::Error.label().to_string()),
            SessionState::Listening if self.call == CallMode::Hosted => {
                format!("{} - Call in progress", format_elapsed(self.elapsed))
            }
            SessionState::Listening | SessionState::Speaking | SessionState::Thinking
                if self.call != CallMode::None =>
            {
                format!("{} - {}", format_elapsed(self.elapsed), self.state.label())
            }
            other => other.label().to_string(),
        }
    }

    /// A call is live (the hang-up button is shown).
    pub fn in_call(&self) -> bool {
        self.call != CallMode::None
            || matches!(self.state, SessionState::Connecting)
    }
}

/// `MM:SS`, minutes keep counting past an hour.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Thread-safe handle to the latest [`PanelSnapshot`].
///
/// Lock for a short critical section only; never hold it across `.await`.
pub type SharedPanel = Arc<Mutex<PanelSnapshot>>;

pub fn new_shared_panel() -> SharedPanel {
    Arc::new(Mutex::new(PanelSnapshot::default()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_idle() {
        assert_eq!(SessionState::default(), SessionState::Idle);
    }

    #[test]
    fn engaged_states() {
        assert!(!SessionState::Idle.is_engaged());
        assert!(!SessionState::Error.is_engaged());
        assert!(SessionState::Connecting.is_engaged());
        assert!(SessionState::Listening.is_engaged());
        assert!(SessionState::Thinking.is_engaged());
        assert!(SessionState::Speaking.is_engaged());
    }

    #[test]
    fn reset_bumps_generation_and_clears_transcript() {
        let mut s = Session::new("prompt");
        s.begin(Instant::now(), CallMode::Local);
        s.state = SessionState::Speaking;
        s.transcript.push_user("Hi");

        s.reset();

        assert_eq!(s.generation, 1);
        assert_eq!(s.state, SessionState::Idle);
        assert_eq!(s.transcript.len(), 1);
        assert_eq!(s.call, CallMode::None);
        assert!(s.started_at.is_none());
    }

    #[test]
    fn fail_invalidates_in_flight_work() {
        let mut s = Session::new("prompt");
        s.begin(Instant::now(), CallMode::Local);
        s.state = SessionState::Thinking;

        s.fail(AssistantError::Network("reset".into()), Instant::now());

        assert_eq!(s.generation, 1);
        assert_eq!(s.state, SessionState::Error);
        assert_eq!(s.call, CallMode::None);
        assert!(s.error_since.is_some());
    }

    #[test]
    fn typed_conversation_is_live_until_reset() {
        let mut s = Session::new("prompt");
        assert!(!s.is_live());

        s.begin(Instant::now(), CallMode::None);
        s.transcript.push_user("Hi");
        s.transcript.push_assistant("Hello!");
        assert_eq!(s.state, SessionState::Idle);
        assert!(s.is_live());

        s.reset();
        assert!(!s.is_live());
    }

    #[test]
    fn elapsed_is_derived_from_start() {
        let mut s = Session::new("prompt");
        let t0 = Instant::now();
        s.begin(t0, CallMode::Hosted);
        assert_eq!(s.elapsed(t0 + Duration::from_secs(75)), Duration::from_secs(75));
    }

    #[test]
    fn elapsed_without_start_is_zero() {
        let s = Session::new("prompt");
        assert_eq!(s.elapsed(Instant::now()), Duration::ZERO);
    }

    #[test]
    fn format_elapsed_pads_minutes_and_seconds() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00:00");
        assert_eq!(format_elapsed(Duration::from_secs(75)), "01:15");
        assert_eq!(format_elapsed(Duration::from_secs(3725)), "62:05");
    }

    #[test]
    fn status_line_for_hosted_call_shows_timer() {
        let snap = PanelSnapshot {
            state: SessionState::Listening,
            call: CallMode::Hosted,
            elapsed: Duration::from_secs(9),
            ..PanelSnapshot::default()
        };
        assert_eq!(snap.status_line(), "00:09 - Call in progress");
    }

    #[test]
    fn status_line_for_error_uses_message() {
        let snap = PanelSnapshot {
            state: SessionState::Error,
            error_message: Some("Connection issue. Please try again.".into()),
            ..PanelSnapshot::default()
        };
        assert_eq!(snap.status_line(), "Connection issue. Please try again.");
    }

    #[test]
    fn shared_panel_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedPanel>();
    }
}
