//! Production [`UtteranceCapture`]: cpal microphone + endpointer + Whisper.
//!
//! Each `capture()` runs on its own OS thread (cpal streams are not `Send`):
//! open the default input, stream 16 kHz mono into an [`Endpointer`] until
//! it reports an end, drop the stream, then recognise the trimmed clip.  The
//! result comes back over a oneshot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::audio::{trim_silence, Endpoint, Endpointer, InputDevice};
use crate::config::SpeechConfig;
use crate::stt::{Recognizer, MAX_CLIP_SAMPLES, MIN_CLIP_SAMPLES};

use super::{CaptureError, Utterance, UtteranceCapture};

const POLL: Duration = Duration::from_millis(50);
const RELEASE_WAIT_POLLS: u32 = 25;

pub struct MicrophoneCapture {
    recognizer: Arc<dyn Recognizer>,
    settings: SpeechConfig,
    active: Arc<AtomicBool>,
    /// Cancel token of the most recent capture.  Replaced under the lock
    /// together with `active`, so `cancel()` always reaches the capture that
    /// holds (or is about to hold) the device.
    current: Mutex<Option<Arc<AtomicBool>>>,
}

impl MicrophoneCapture {
    pub fn new(recognizer: Arc<dyn Recognizer>, settings: SpeechConfig) -> Self {
        Self {
            recognizer,
            settings,
            active: Arc::new(AtomicBool::new(false)),
            current: Mutex::new(None),
        }
    }

    fn endpointer(&self) -> Endpointer {
        Endpointer::new(
            self.settings.vad_threshold,
            Duration::from_millis(self.settings.end_silence_ms),
            Duration::from_secs(self.settings.no_speech_timeout_secs),
            Duration::from_secs(self.settings.max_utterance_secs),
        )
    }

    /// A cancelled recording still holds the device for at most one poll.
    fn release_pending(&self) -> bool {
        self.active.load(Ordering::SeqCst)
            && lock(&self.current)
                .as_ref()
                .map_or(false, |token| token.load(Ordering::SeqCst))
    }

    /// Claim the device and register a fresh cancel token for this capture.
    fn claim(&self) -> Result<(ActiveGuard, Arc<AtomicBool>), CaptureError> {
        let mut current = lock(&self.current);
        if self.active.swap(true, Ordering::SeqCst) {
            return Err(CaptureError::DeviceUnavailable(
                "microphone is already in use".into(),
            ));
        }
        let token = Arc::new(AtomicBool::new(false));
        *current = Some(Arc::clone(&token));
        Ok((ActiveGuard(Arc::clone(&self.active)), token))
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Clears the active flag once the recording thread lets go of the device.
#[derive(Debug)]
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl UtteranceCapture for MicrophoneCapture {
    async fn capture(&self) -> Result<Utterance, CaptureError> {
        for _ in 0..RELEASE_WAIT_POLLS {
            if !self.release_pending() {
                break;
            }
            tokio::time::sleep(POLL / 5).await;
        }
        let (guard, token) = self.claim()?;

        let recognizer = Arc::clone(&self.recognizer);
        let endpointer = self.endpointer();
        let threshold = self.settings.vad_threshold;
        let (tx, rx) = oneshot::channel();

        thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || {
                // Stop on cancel, and also when the awaiting task was aborted.
                let recorded =
                    record(endpointer, &|| token.load(Ordering::SeqCst) || tx.is_closed());
                drop(guard);
                let result = recorded.and_then(|clip| {
                    if token.load(Ordering::SeqCst) {
                        return Err(CaptureError::NoResult);
                    }
                    finish_utterance(recognizer.as_ref(), &clip, threshold)
                });
                let _ = tx.send(result);
            })
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;

        rx.await
            .unwrap_or_else(|_| Err(CaptureError::Provider("capture thread exited".into())))
    }

    fn cancel(&self) {
        if let Some(token) = lock(&self.current).as_ref() {
            if !token.swap(true, Ordering::SeqCst) && self.active.load(Ordering::SeqCst) {
                log::debug!("cancelling microphone capture");
            }
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Record until the endpointer decides, the stream faults, or `stopped`
/// turns true.
fn record(
    mut endpointer: Endpointer,
    stopped: &dyn Fn() -> bool,
) -> Result<Vec<f32>, CaptureError> {
    let device = InputDevice::open_default()?;
    let (tx, rx) = mpsc::channel::<Vec<f32>>();
    let (fault_tx, fault_rx) = mpsc::channel::<CaptureError>();
    let _stream = device.start(tx, fault_tx)?;

    let mut clip = Vec::new();
    loop {
        if stopped() {
            return Err(CaptureError::NoResult);
        }
        if let Ok(fault) = fault_rx.try_recv() {
            return Err(fault);
        }
        match rx.recv_timeout(POLL) {
            Ok(buf) => {
                clip.extend_from_slice(&buf);
                match endpointer.push(&buf) {
                    Endpoint::Continue => {}
                    Endpoint::Complete | Endpoint::MaxLength => return Ok(clip),
                    Endpoint::NoSpeech => return Err(CaptureError::NoResult),
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(CaptureError::DeviceUnavailable("input stream closed".into()));
            }
        }
    }
}

/// Trim, pad, recognise.  Silence or an empty transcript is a `NoResult`.
pub fn finish_utterance(
    recognizer: &dyn Recognizer,
    clip: &[f32],
    threshold: f32,
) -> Result<Utterance, CaptureError> {
    let voiced = trim_silence(clip, threshold);
    if voiced.is_empty() {
        return Err(CaptureError::NoResult);
    }

    let mut audio = voiced[..voiced.len().min(MAX_CLIP_SAMPLES)].to_vec();
    if audio.len() < MIN_CLIP_SAMPLES {
        audio.resize(MIN_CLIP_SAMPLES, 0.0);
    }

    let text = recognizer
        .recognize(&audio)
        .map_err(|e| CaptureError::Provider(e.to_string()))?;
    let text = text.trim();
    if text.is_empty() {
        return Err(CaptureError::NoResult);
    }
    log::debug!("captured utterance: {text}");
    Ok(Utterance::new(text))
}
