//! Hand-written adapter fakes for controller tests.
//!
//! Every fake counts its calls and appends to a shared [`CallLog`] so tests
//! can assert ordering across adapters (e.g. interrupt before Idle).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};

use crate::completion::{CompletionClient, CompletionError};
use crate::input::{CaptureError, Utterance, UtteranceCapture};
use crate::output::{PlaybackError, PlaybackOutcome, SpeechOutput};
use crate::voice::{VoiceSessionClient, VoiceSessionError, VoiceSessionEvent, VoiceSessionRequest};

use super::transcript::TranscriptEntry;

#[derive(Default)]
pub struct CallLog(Mutex<Vec<&'static str>>);

impl CallLog {
    pub fn push(&self, entry: &'static str) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

/// Returns queued results in order; with an empty queue it holds the
/// "microphone" until cancelled.
pub struct FakeCapture {
    log: Arc<CallLog>,
    results: Mutex<VecDeque<Result<Utterance, CaptureError>>>,
    active: AtomicBool,
    released: Notify,
    pub captures: AtomicUsize,
    pub cancels: AtomicUsize,
}

impl FakeCapture {
    pub fn new(log: Arc<CallLog>) -> Self {
        Self {
            log,
            results: Mutex::new(VecDeque::new()),
            active: AtomicBool::new(false),
            released: Notify::new(),
            captures: AtomicUsize::new(0),
            cancels: AtomicUsize::new(0),
        }
    }

    pub fn queue(&self, result: Result<Utterance, CaptureError>) {
        self.results.lock().unwrap().push_back(result);
    }
}

#[async_trait]
impl UtteranceCapture for FakeCapture {
    async fn capture(&self) -> Result<Utterance, CaptureError> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        self.log.push("capture");
        let queued = self.results.lock().unwrap().pop_front();
        if let Some(result) = queued {
            return result;
        }
        self.active.store(true, Ordering::SeqCst);
        self.released.notified().await;
        Err(CaptureError::NoResult)
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        self.log.push("cancel");
        if self.active.swap(false, Ordering::SeqCst) {
            self.released.notify_one();
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

pub struct FakeCompletion {
    reply: Result<String, CompletionError>,
    pub calls: AtomicUsize,
    pub last_request: Mutex<Vec<TranscriptEntry>>,
}

impl FakeCompletion {
    pub fn replying(text: &str) -> Self {
        Self::with(Ok(text.to_string()))
    }

    pub fn failing(error: CompletionError) -> Self {
        Self::with(Err(error))
    }

    fn with(reply: Result<String, CompletionError>) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CompletionClient for FakeCompletion {
    async fn complete(&self, transcript: &[TranscriptEntry]) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = transcript.to_vec();
        self.reply.clone()
    }
}

// ---------------------------------------------------------------------------
// Speech
// ---------------------------------------------------------------------------

/// Plays until interrupted, unless built with [`FakeSpeech::finishing`].
pub struct FakeSpeech {
    log: Arc<CallLog>,
    auto_finish: bool,
    playing: AtomicBool,
    stopped: Notify,
    pub speaks: AtomicUsize,
    pub interrupts: AtomicUsize,
}

impl FakeSpeech {
    pub fn holding(log: Arc<CallLog>) -> Self {
        Self::new(log, false)
    }

    pub fn finishing(log: Arc<CallLog>) -> Self {
        Self::new(log, true)
    }

    fn new(log: Arc<CallLog>, auto_finish: bool) -> Self {
        Self {
            log,
            auto_finish,
            playing: AtomicBool::new(false),
            stopped: Notify::new(),
            speaks: AtomicUsize::new(0),
            interrupts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SpeechOutput for FakeSpeech {
    async fn speak(&self, _text: &str) -> Result<PlaybackOutcome, PlaybackError> {
        self.speaks.fetch_add(1, Ordering::SeqCst);
        self.log.push("speak");
        if self.auto_finish {
            return Ok(PlaybackOutcome::Finished);
        }
        self.playing.store(true, Ordering::SeqCst);
        self.stopped.notified().await;
        Ok(PlaybackOutcome::Interrupted)
    }

    fn interrupt(&self) {
        self.interrupts.fetch_add(1, Ordering::SeqCst);
        self.log.push("interrupt");
        if self.playing.swap(false, Ordering::SeqCst) {
            self.stopped.notify_one();
        }
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Voice session
// ---------------------------------------------------------------------------

pub struct FakeVoice {
    log: Arc<CallLog>,
    start_error: Option<VoiceSessionError>,
    listener: Mutex<Option<mpsc::Sender<VoiceSessionEvent>>>,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub removals: AtomicUsize,
}

impl FakeVoice {
    pub fn new(log: Arc<CallLog>) -> Self {
        Self::with(log, None)
    }

    pub fn rejecting(log: Arc<CallLog>, error: VoiceSessionError) -> Self {
        Self::with(log, Some(error))
    }

    fn with(log: Arc<CallLog>, start_error: Option<VoiceSessionError>) -> Self {
        Self {
            log,
            start_error,
            listener: Mutex::new(None),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            removals: AtomicUsize::new(0),
        }
    }

    /// Deliver a provider event to the registered listener.
    pub async fn emit(&self, event: VoiceSessionEvent) {
        let tx = self.listener.lock().unwrap().clone();
        if let Some(tx) = tx {
            let _ = tx.send(event).await;
        }
    }

    pub fn has_listener(&self) -> bool {
        self.listener.lock().unwrap().is_some()
    }
}

#[async_trait]
impl VoiceSessionClient for FakeVoice {
    async fn start(
        &self,
        _request: &VoiceSessionRequest,
        listener: mpsc::Sender<VoiceSessionEvent>,
    ) -> Result<(), VoiceSessionError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.log.push("voice_start");
        if let Some(e) = &self.start_error {
            return Err(e.clone());
        }
        *self.listener.lock().unwrap() = Some(listener);
        Ok(())
    }

    async fn stop(&self) -> Result<(), VoiceSessionError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.log.push("voice_stop");
        Ok(())
    }

    fn remove_all_listeners(&self) {
        self.removals.fetch_add(1, Ordering::SeqCst);
        self.listener.lock().unwrap().take();
    }
}
