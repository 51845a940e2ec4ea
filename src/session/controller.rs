//! Session controller: the single owner of the assistant's state.
//!
//! [`SessionController`] is an actor.  UI intents arrive as
//! [`AssistantCommand`]s, adapter work runs in spawned tokio tasks, and every
//! adapter outcome comes back as a [`TaggedEvent`] stamped with the session
//! generation it was started under.  [`SessionController::handle_event`] is
//! the only place results change the session; events from an older
//! generation are dropped there.
//!
//! # Flow
//!
//! ```text
//! start_call ─▶ Connecting ─▶ SessionStarted ─▶ Listening ─▶ capture task
//!   CaptureResult ─▶ Thinking ─▶ completion task
//!   CompletionReady ─▶ Speaking ─▶ speak task
//!   PlaybackFinished ─▶ Listening ─▶ capture task (re-armed)
//! end_call / close ─▶ interrupt, cancel, stop, abort ─▶ generation + 1 ─▶ Idle
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::completion::{prompt, CompletionClient, CompletionError};
use crate::config::{AppConfig, AssistantMode};
use crate::input::UtteranceCapture;
use crate::output::{PlaybackOutcome, SpeechOutput};
use crate::voice::{VoiceSessionClient, VoiceSessionEvent, VoiceSessionRequest};

use super::error::AssistantError;
use super::events::{
    AssistantCommand, Completion, CompletionTicket, DeliveryStatus, SessionEvent, TaggedEvent,
};
use super::state::{CallMode, PanelSnapshot, Session, SessionState, SharedPanel};

/// How often `run` ticks (elapsed timer refresh, Error auto-return).
pub const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// The four adapter seams the controller drives.
#[derive(Clone)]
pub struct Adapters {
    pub capture: Arc<dyn UtteranceCapture>,
    pub completion: Arc<dyn CompletionClient>,
    pub speech: Arc<dyn SpeechOutput>,
    pub voice: Arc<dyn VoiceSessionClient>,
}

pub struct SessionController {
    config: AppConfig,
    adapters: Adapters,
    session: Session,
    open: bool,
    panel: SharedPanel,
    events_tx: mpsc::UnboundedSender<TaggedEvent>,
    events_rx: mpsc::UnboundedReceiver<TaggedEvent>,
    /// Capture, completion and hosted-session tasks.
    tasks: Vec<JoinHandle<()>>,
    /// The current reply's playback task.
    speak_task: Option<JoinHandle<()>>,
    silent_rearms: u32,
    last_toggle_teardown: Option<Instant>,
}

impl SessionController {
    pub fn new(config: AppConfig, adapters: Adapters, panel: SharedPanel) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            config,
            adapters,
            session: Session::new(prompt::SYSTEM_PROMPT),
            open: false,
            panel,
            events_tx,
            events_rx,
            tasks: Vec::new(),
            speak_task: None,
            silent_rearms: 0,
            last_toggle_teardown: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.session.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Adapter tasks that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.tasks
            .iter()
            .chain(self.speak_task.iter())
            .filter(|t| !t.is_finished())
            .count()
    }

    // -----------------------------------------------------------------------
    // Main loop
    // -----------------------------------------------------------------------

    /// Run until [`AssistantCommand::Shutdown`] arrives or the command
    /// channel closes; a live call is torn down on exit.
    pub async fn run(mut self, mut commands: mpsc::Receiver<AssistantCommand>) {
        let mut tick = tokio::time::interval(TICK_INTERVAL);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        self.publish();

        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(AssistantCommand::Shutdown) | None => break,
                    Some(cmd) => self.dispatch(cmd).await,
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event).await,
                _ = tick.tick() => self.tick(Instant::now()),
            }
        }

        log::info!("session: shutting down");
        self.teardown().await;
        self.open = false;
        self.publish();
    }

    /// Handle the next adapter event, waiting for one if none is queued.
    pub async fn step(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => {
                self.handle_event(event).await;
                true
            }
            None => false,
        }
    }

    async fn dispatch(&mut self, cmd: AssistantCommand) {
        log::debug!("session: command {cmd:?} in {:?}", self.session.state);
        let result = match cmd {
            AssistantCommand::Open => self.open().await,
            AssistantCommand::Close | AssistantCommand::Shutdown => {
                self.close().await;
                Ok(())
            }
            AssistantCommand::TogglePanel if self.open => {
                self.close().await;
                Ok(())
            }
            AssistantCommand::TogglePanel => self.open().await,
            AssistantCommand::StartCall => self.start_call().await,
            AssistantCommand::EndCall => {
                self.end_call().await;
                Ok(())
            }
            AssistantCommand::ToggleCall => self.toggle_call().await,
            AssistantCommand::SubmitUtterance(text) => self.submit_utterance(&text).await,
        };
        if let Err(e) = result {
            log::warn!("session: command rejected: {e}");
        }
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Show the panel.  Optionally dials straight away.
    pub async fn open(&mut self) -> Result<(), AssistantError> {
        self.open = true;
        self.publish();
        if self.config.assistant.connect_on_open && self.session.state == SessionState::Idle {
            return self.start_call().await;
        }
        Ok(())
    }

    /// Hide the panel.  The session, call or typed conversation alike, does
    /// not survive it.
    pub async fn close(&mut self) {
        if self.session.is_live() || self.in_flight() > 0 {
            self.teardown().await;
        }
        self.open = false;
        self.publish();
    }

    /// Place a call in the configured mode.
    ///
    /// Credentials are checked before any device or network access.  While a
    /// call is already connecting or live this ends it instead.
    pub async fn start_call(&mut self) -> Result<(), AssistantError> {
        match self.session.state {
            SessionState::Idle | SessionState::Error => {}
            _ => {
                self.end_call().await;
                return Ok(());
            }
        }

        if let Err(e) = self.config.validate_for_call() {
            log::warn!("session: cannot start call: {e}");
            self.reject(e.clone());
            return Err(e);
        }

        self.silent_rearms = 0;
        let now = Instant::now();
        match self.config.assistant.mode {
            AssistantMode::Local => {
                self.session.begin(now, CallMode::Local);
                self.set_state(SessionState::Connecting);
                self.post(SessionEvent::SessionStarted);
            }
            AssistantMode::Hosted => {
                self.session.begin(now, CallMode::Hosted);
                self.set_state(SessionState::Connecting);
                self.connect_hosted();
            }
        }
        Ok(())
    }

    /// Start when idle, end otherwise.
    pub async fn toggle_call(&mut self) -> Result<(), AssistantError> {
        let now = Instant::now();
        match self.session.state {
            SessionState::Idle | SessionState::Error => {
                let debounce = Duration::from_millis(self.config.assistant.toggle_debounce_ms);
                if let Some(at) = self.last_toggle_teardown {
                    if now.saturating_duration_since(at) < debounce {
                        log::debug!("session: ignoring toggle right after hang-up");
                        return Ok(());
                    }
                }
                self.start_call().await
            }
            _ => {
                self.end_call().await;
                self.last_toggle_teardown = Some(now);
                Ok(())
            }
        }
    }

    /// Tear everything down and return to Idle.  Never fails.
    pub async fn end_call(&mut self) {
        log::info!("session: ending call from {:?}", self.session.state);
        self.teardown().await;
    }

    /// Feed one typed (or otherwise externally captured) user turn.
    pub async fn submit_utterance(&mut self, text: &str) -> Result<(), AssistantError> {
        let text = text.trim();
        let state = self.session.state;

        let busy = matches!(
            state,
            SessionState::Thinking | SessionState::Listening | SessionState::Connecting
        );
        if busy || self.session.call == CallMode::Hosted {
            return Err(AssistantError::InvalidState {
                operation: "submit_utterance",
                state,
            });
        }
        if text.is_empty() {
            return Ok(());
        }

        match state {
            SessionState::Speaking => {
                log::debug!("session: barge-in, interrupting playback");
                self.stop_playback();
            }
            _ => {
                if let Err(e) = self.config.validate_for_chat() {
                    log::warn!("session: cannot send message: {e}");
                    self.reject(e.clone());
                    return Err(e);
                }
                if state == SessionState::Error {
                    self.session.reset();
                }
                if self.session.started_at.is_none() {
                    self.session.begin(Instant::now(), CallMode::None);
                }
            }
        }

        self.accept_utterance(text);
        Ok(())
    }

    /// Leave the Error state once its message has been shown long enough.
    pub fn tick(&mut self, now: Instant) {
        if self.session.state == SessionState::Error {
            let shown_for = Duration::from_secs(self.config.assistant.error_display_secs);
            let expired = self
                .session
                .error_since
                .map_or(true, |at| now.saturating_duration_since(at) >= shown_for);
            if expired {
                log::debug!("session: Error → Idle");
                self.session.reset();
            }
        }
        self.publish_at(now);
    }

    // -----------------------------------------------------------------------
    // Transition function
    // -----------------------------------------------------------------------

    pub async fn handle_event(&mut self, tagged: TaggedEvent) {
        if tagged.generation != self.session.generation {
            log::warn!(
                "session: discarding stale {:?} (generation {} != {})",
                tagged.event,
                tagged.generation,
                self.session.generation
            );
            return;
        }

        let state = self.session.state;
        let call = self.session.call;

        match tagged.event {
            SessionEvent::SessionStarted if state == SessionState::Connecting => {
                log::info!("session: call connected ({call:?})");
                self.set_state(SessionState::Listening);
                if call == CallMode::Local {
                    self.arm_capture();
                }
            }
            SessionEvent::SessionEnded => {
                log::info!("session: provider ended the call");
                self.teardown().await;
                self.open = false;
                self.publish();
            }
            SessionEvent::ProviderError(detail) => {
                log::error!("session: voice provider fault: {detail}");
                self.fail(AssistantError::Provider(detail)).await;
            }
            SessionEvent::ConnectFailed(error) => {
                log::error!("session: could not connect: {error}");
                self.fail(error).await;
            }
            SessionEvent::AssistantSpeechStarted
                if call == CallMode::Hosted && state == SessionState::Listening =>
            {
                self.set_state(SessionState::Speaking);
            }
            SessionEvent::AssistantSpeechEnded
                if call == CallMode::Hosted && state == SessionState::Speaking =>
            {
                self.set_state(SessionState::Listening);
            }
            SessionEvent::CaptureResult(utterance) if state == SessionState::Listening => {
                self.silent_rearms = 0;
                self.accept_utterance(&utterance.text);
            }
            SessionEvent::CaptureError(error) if state == SessionState::Listening => {
                let error = AssistantError::from(error);
                if error.is_silently_rearmable()
                    && self.silent_rearms < self.config.speech.max_silent_rearms
                {
                    self.silent_rearms += 1;
                    log::debug!("session: nothing heard, re-arming ({})", self.silent_rearms);
                    self.arm_capture();
                } else {
                    log::warn!("session: capture failed: {error}");
                    self.fail(error).await;
                }
            }
            SessionEvent::CompletionReady(completion) => self.on_completion(completion),
            SessionEvent::CompletionFailed { ticket, error } if state == SessionState::Thinking => {
                log::warn!(
                    "session: completion for turn {} failed: {error}",
                    ticket.transcript_len
                );
                self.fail(error).await;
            }
            SessionEvent::PlaybackStarted => log::debug!("session: playback started"),
            SessionEvent::PlaybackFinished if state == SessionState::Speaking => {
                self.speak_task = None;
                if call == CallMode::Local {
                    self.set_state(SessionState::Listening);
                    self.arm_capture();
                } else {
                    self.set_state(SessionState::Idle);
                }
            }
            SessionEvent::PlaybackFailed(error) if state == SessionState::Speaking => {
                log::warn!("session: playback failed: {error}");
                self.fail(error.into()).await;
            }
            other => log::debug!("session: ignoring {other:?} in {state:?}"),
        }
    }

    fn on_completion(&mut self, completion: Completion) {
        let current = CompletionTicket {
            generation: self.session.generation,
            transcript_len: self.session.transcript.len(),
        };
        if self.session.state != SessionState::Thinking || completion.ticket != current {
            log::warn!(
                "session: discarding reply for {:?} (now {:?} in {:?})",
                completion.ticket,
                current,
                self.session.state
            );
            return;
        }

        log::debug!("session: reply received ({} chars)", completion.text.len());
        self.session.transcript.push_assistant(completion.text.as_str());
        self.set_state(SessionState::Speaking);
        self.speak(completion.text);
    }

    // -----------------------------------------------------------------------
    // Adapter work
    // -----------------------------------------------------------------------

    fn accept_utterance(&mut self, text: &str) {
        self.session.transcript.push_user(text);
        self.set_state(SessionState::Thinking);
        self.request_completion();
    }

    fn arm_capture(&mut self) {
        let capture = Arc::clone(&self.adapters.capture);
        let events = self.events_tx.clone();
        let generation = self.session.generation;

        self.spawn(async move {
            let event = match capture.capture().await {
                Ok(utterance) => SessionEvent::CaptureResult(utterance),
                Err(e) => SessionEvent::CaptureError(e),
            };
            let _ = events.send(TaggedEvent::new(generation, event));
        });
    }

    fn request_completion(&mut self) {
        let client = Arc::clone(&self.adapters.completion);
        let events = self.events_tx.clone();
        let entries = self.session.transcript.entries().to_vec();
        let ticket = CompletionTicket {
            generation: self.session.generation,
            transcript_len: entries.len(),
        };
        let limit = Duration::from_secs(self.config.completion.timeout_secs);

        self.spawn(async move {
            let event = match tokio::time::timeout(limit, client.complete(&entries)).await {
                Ok(Ok(text)) => SessionEvent::CompletionReady(Completion {
                    text,
                    ticket,
                    status: DeliveryStatus::Delivered,
                }),
                Ok(Err(e)) => SessionEvent::CompletionFailed {
                    ticket,
                    error: e.into(),
                },
                Err(_) => SessionEvent::CompletionFailed {
                    ticket,
                    error: CompletionError::Timeout.into(),
                },
            };
            let _ = events.send(TaggedEvent::new(ticket.generation, event));
        });
    }

    fn speak(&mut self, text: String) {
        let speech = Arc::clone(&self.adapters.speech);
        let events = self.events_tx.clone();
        let generation = self.session.generation;

        self.speak_task = Some(tokio::spawn(async move {
            let _ = events.send(TaggedEvent::new(generation, SessionEvent::PlaybackStarted));
            let event = match speech.speak(&text).await {
                Ok(PlaybackOutcome::Finished) => SessionEvent::PlaybackFinished,
                Ok(PlaybackOutcome::Interrupted) => SessionEvent::PlaybackInterrupted,
                Err(e) => SessionEvent::PlaybackFailed(e),
            };
            let _ = events.send(TaggedEvent::new(generation, event));
        }));
    }

    fn connect_hosted(&mut self) {
        let voice = Arc::clone(&self.adapters.voice);
        let events = self.events_tx.clone();
        let generation = self.session.generation;
        let request = VoiceSessionRequest::from_config(
            &self.config.voice,
            prompt::SYSTEM_PROMPT,
            prompt::GREETING,
        );

        self.spawn(async move {
            let (tx, mut rx) = mpsc::channel(16);
            if let Err(e) = voice.start(&request, tx).await {
                let _ = events.send(TaggedEvent::new(
                    generation,
                    SessionEvent::ConnectFailed(e.into()),
                ));
                return;
            }

            while let Some(event) = rx.recv().await {
                let mapped = match event {
                    VoiceSessionEvent::CallStarted => SessionEvent::SessionStarted,
                    VoiceSessionEvent::SpeechStarted => SessionEvent::AssistantSpeechStarted,
                    VoiceSessionEvent::SpeechEnded => SessionEvent::AssistantSpeechEnded,
                    VoiceSessionEvent::CallEnded => SessionEvent::SessionEnded,
                    VoiceSessionEvent::Error(detail) => SessionEvent::ProviderError(detail),
                };
                if events.send(TaggedEvent::new(generation, mapped)).is_err() {
                    break;
                }
            }
        });
    }

    fn spawn<F>(&mut self, work: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.tasks.retain(|t| !t.is_finished());
        self.tasks.push(tokio::spawn(work));
    }

    fn post(&self, event: SessionEvent) {
        let _ = self
            .events_tx
            .send(TaggedEvent::new(self.session.generation, event));
    }

    fn stop_playback(&mut self) {
        self.adapters.speech.interrupt();
        if let Some(task) = self.speak_task.take() {
            task.abort();
        }
    }

    /// Release the speaker, the microphone and the hosted session, and
    /// abort every task.  Errors are logged only.
    async fn release_resources(&mut self) {
        self.stop_playback();
        self.adapters.capture.cancel();
        // Abort first so a hosted connect cannot register a call after stop.
        for task in self.tasks.drain(..) {
            task.abort();
        }
        if let Err(e) = self.adapters.voice.stop().await {
            log::warn!("session: stopping voice session failed: {e}");
        }
        self.adapters.voice.remove_all_listeners();
    }

    async fn teardown(&mut self) {
        self.release_resources().await;
        self.session.reset();
        self.silent_rearms = 0;
        self.publish();
    }

    async fn fail(&mut self, error: AssistantError) {
        self.release_resources().await;
        self.session.fail(error, Instant::now());
        self.silent_rearms = 0;
        self.publish();
    }

    /// Show a configuration problem.  Only reached from Idle or Error, so
    /// there is nothing to release.
    fn reject(&mut self, error: AssistantError) {
        self.session.fail(error, Instant::now());
        self.publish();
    }

    // -----------------------------------------------------------------------
    // Snapshot
    // -----------------------------------------------------------------------

    fn set_state(&mut self, next: SessionState) {
        log::debug!("session: {:?} → {:?}", self.session.state, next);
        if next != SessionState::Error {
            self.session.last_error = None;
            self.session.error_since = None;
        }
        self.session.state = next;
        self.publish();
    }

    fn publish(&self) {
        self.publish_at(Instant::now());
    }

    fn publish_at(&self, now: Instant) {
        let snapshot = PanelSnapshot {
            open: self.open,
            state: self.session.state,
            call: self.session.call,
            elapsed: self.session.elapsed(now),
            error_message: self.session.last_error.as_ref().map(AssistantError::user_message),
            turns: self.session.transcript.turns().to_vec(),
        };
        let mut panel = self
            .panel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *panel = snapshot;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
