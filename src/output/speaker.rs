//! [`SpeechOutput`] backed by an OpenAI-compatible `/v1/audio/speech`
//! endpoint and the default speakers.
//!
//! The output device is opened lazily on the first reply and kept for the
//! lifetime of the process.  Each reply is synthesised in full, then played
//! on its own `Sink`; `speak` polls the sink until it drains or an
//! interrupt is requested.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rodio::Sink;

use crate::audio::AudioOutput;
use crate::config::TtsConfig;

use super::{PlaybackError, PlaybackOutcome, SpeechOutput};

const DRAIN_POLL: Duration = Duration::from_millis(40);

pub struct SpeakerOutput {
    client: reqwest::Client,
    config: TtsConfig,
    device: Mutex<Option<Arc<AudioOutput>>>,
    current: Mutex<Option<Arc<Sink>>>,
    interrupted: AtomicBool,
}

impl SpeakerOutput {
    pub fn from_config(config: &TtsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
            device: Mutex::new(None),
            current: Mutex::new(None),
            interrupted: AtomicBool::new(false),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/audio/speech", self.config.base_url.trim_end_matches('/'))
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, PlaybackError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "input": text,
            "voice": self.config.voice,
            "response_format": "mp3",
        });

        let mut req = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            req = req.bearer_auth(key);
        }

        let res = req
            .send()
            .await
            .map_err(|e| PlaybackError::Synthesis(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let detail = res.text().await.unwrap_or_default();
            return Err(PlaybackError::Synthesis(format!("{status}: {}", detail.trim())));
        }

        let bytes = res
            .bytes()
            .await
            .map_err(|e| PlaybackError::Synthesis(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    /// The shared output device, opened on first use.
    async fn device(&self) -> Result<Arc<AudioOutput>, PlaybackError> {
        let cached = lock(&self.device).clone();
        if let Some(dev) = cached {
            return Ok(dev);
        }

        let opened = tokio::task::spawn_blocking(AudioOutput::open)
            .await
            .map_err(|e| PlaybackError::DeviceUnavailable(e.to_string()))??;
        let opened = Arc::new(opened);
        *lock(&self.device) = Some(Arc::clone(&opened));
        Ok(opened)
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl SpeechOutput for SpeakerOutput {
    async fn speak(&self, text: &str) -> Result<PlaybackOutcome, PlaybackError> {
        self.interrupted.store(false, Ordering::SeqCst);

        let audio = self.synthesize(text).await?;
        if self.interrupted.load(Ordering::SeqCst) {
            return Ok(PlaybackOutcome::Interrupted);
        }
        if audio.is_empty() {
            return Ok(PlaybackOutcome::Finished);
        }

        let device = self.device().await?;
        let sink = device.play(audio)?;
        *lock(&self.current) = Some(Arc::clone(&sink));

        let outcome = loop {
            if self.interrupted.load(Ordering::SeqCst) {
                sink.stop();
                break PlaybackOutcome::Interrupted;
            }
            if sink.empty() {
                break PlaybackOutcome::Finished;
            }
            tokio::time::sleep(DRAIN_POLL).await;
        };

        lock(&self.current).take();
        log::debug!("playback ended: {outcome:?}");
        Ok(outcome)
    }

    fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
        if let Some(sink) = lock(&self.current).take() {
            sink.stop();
            log::debug!("playback interrupted");
        }
    }

    fn is_playing(&self) -> bool {
        lock(&self.current).as_ref().map_or(false, |s| !s.empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_uses_openai_speech_path() {
        let out = SpeakerOutput::from_config(&TtsConfig {
            base_url: "https://api.openai.com/".into(),
            ..TtsConfig::default()
        });
        assert_eq!(out.endpoint(), "https://api.openai.com/v1/audio/speech");
    }

    #[test]
    fn idle_interrupt_is_noop() {
        let out = SpeakerOutput::from_config(&TtsConfig::default());
        assert!(!out.is_playing());
        out.interrupt();
        assert!(!out.is_playing());
    }
}
