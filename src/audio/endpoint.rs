//! Energy-based end-of-utterance detection.
//!
//! The capture loop feeds every converted buffer into an [`Endpointer`].  It
//! classifies 30 ms frames by RMS level and decides when one utterance is
//! over:
//!
//! * speech followed by `end_silence` of quiet → [`Endpoint::Complete`]
//! * no speech at all within `no_speech_timeout` → [`Endpoint::NoSpeech`]
//! * utterance longer than `max_utterance` → [`Endpoint::MaxLength`]
//!
//! [`trim_silence`] then cuts the quiet edges off the finished clip before it
//! goes to Whisper.

use std::time::Duration;

use super::convert::TARGET_RATE;

/// 30 ms at 16 kHz.
const FRAME_SAMPLES: usize = 480;
const FRAME_MS: u64 = 30;

/// Decision after feeding a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Continue,
    Complete,
    NoSpeech,
    MaxLength,
}

/// Streaming silence detector for a single utterance.
#[derive(Debug)]
pub struct Endpointer {
    rms_threshold: f32,
    end_silence_ms: u64,
    no_speech_ms: u64,
    max_ms: u64,
    pending: Vec<f32>,
    elapsed_ms: u64,
    trailing_silence_ms: u64,
    heard_speech: bool,
}

impl Endpointer {
    pub fn new(
        rms_threshold: f32,
        end_silence: Duration,
        no_speech_timeout: Duration,
        max_utterance: Duration,
    ) -> Self {
        Self {
            rms_threshold,
            end_silence_ms: end_silence.as_millis() as u64,
            no_speech_ms: no_speech_timeout.as_millis() as u64,
            max_ms: max_utterance.as_millis() as u64,
            pending: Vec::with_capacity(FRAME_SAMPLES),
            elapsed_ms: 0,
            trailing_silence_ms: 0,
            heard_speech: false,
        }
    }

    pub fn heard_speech(&self) -> bool {
        self.heard_speech
    }

    /// Feed 16 kHz mono samples.
    pub fn push(&mut self, samples: &[f32]) -> Endpoint {
        self.pending.extend_from_slice(samples);

        let mut consumed = 0;
        let mut decision = Endpoint::Continue;
        while self.pending.len() - consumed >= FRAME_SAMPLES {
            let frame = &self.pending[consumed..consumed + FRAME_SAMPLES];
            consumed += FRAME_SAMPLES;
            decision = self.on_frame(is_voiced(frame, self.rms_threshold));
            if decision != Endpoint::Continue {
                break;
            }
        }
        self.pending.drain(..consumed);
        decision
    }

    fn on_frame(&mut self, voiced: bool) -> Endpoint {
        self.elapsed_ms += FRAME_MS;

        if voiced {
            self.heard_speech = true;
            self.trailing_silence_ms = 0;
        } else if self.heard_speech {
            self.trailing_silence_ms += FRAME_MS;
        }

        if self.heard_speech && self.trailing_silence_ms >= self.end_silence_ms {
            Endpoint::Complete
        } else if !self.heard_speech && self.elapsed_ms >= self.no_speech_ms {
            Endpoint::NoSpeech
        } else if self.elapsed_ms >= self.max_ms {
            Endpoint::MaxLength
        } else {
            Endpoint::Continue
        }
    }
}

fn is_voiced(frame: &[f32], threshold: f32) -> bool {
    if frame.is_empty() {
        return false;
    }
    let mean_sq = frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32;
    mean_sq.sqrt() > threshold
}

/// Cut leading and trailing silent frames.  An all-silent clip becomes empty.
pub fn trim_silence(audio: &[f32], threshold: f32) -> &[f32] {
    let frames: Vec<&[f32]> = audio.chunks(FRAME_SAMPLES).collect();
    let first = frames.iter().position(|f| is_voiced(f, threshold));
    let last = frames.iter().rposition(|f| is_voiced(f, threshold));

    match (first, last) {
        (Some(first), Some(last)) => {
            let start = first * FRAME_SAMPLES;
            let end = ((last + 1) * FRAME_SAMPLES).min(audio.len());
            &audio[start..end]
        }
        _ => &audio[0..0],
    }
}

/// Milliseconds of 16 kHz audio in `samples`.
pub fn duration_ms(samples: usize) -> u64 {
    samples as u64 * 1_000 / u64::from(TARGET_RATE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpointer() -> Endpointer {
        Endpointer::new(
            0.01,
            Duration::from_millis(90),
            Duration::from_millis(300),
            Duration::from_millis(3_000),
        )
    }

    fn frames(level: f32, count: usize) -> Vec<f32> {
        vec![level; FRAME_SAMPLES * count]
    }

    #[test]
    fn speech_then_silence_completes() {
        let mut ep = endpointer();
        assert_eq!(ep.push(&frames(0.3, 5)), Endpoint::Continue);
        assert_eq!(ep.push(&frames(0.0, 2)), Endpoint::Continue);
        assert_eq!(ep.push(&frames(0.0, 1)), Endpoint::Complete);
        assert!(ep.heard_speech());
    }

    #[test]
    fn silence_only_times_out_as_no_speech() {
        let mut ep = endpointer();
        assert_eq!(ep.push(&frames(0.0, 10)), Endpoint::NoSpeech);
        assert!(!ep.heard_speech());
    }

    #[test]
    fn continuous_speech_hits_max_length() {
        let mut ep = endpointer();
        assert_eq!(ep.push(&frames(0.3, 100)), Endpoint::MaxLength);
    }

    #[test]
    fn partial_frames_are_buffered() {
        let mut ep = endpointer();
        ep.push(&vec![0.3_f32; FRAME_SAMPLES / 2]);
        assert!(!ep.heard_speech());
        ep.push(&vec![0.3_f32; FRAME_SAMPLES / 2]);
        assert!(ep.heard_speech());
    }

    #[test]
    fn trim_keeps_only_voiced_middle() {
        let mut audio = frames(0.0, 1);
        audio.extend(frames(0.5, 2));
        audio.extend(frames(0.0, 3));
        assert_eq!(trim_silence(&audio, 0.01).len(), FRAME_SAMPLES * 2);
    }

    #[test]
    fn trim_all_silence_is_empty() {
        assert!(trim_silence(&frames(0.0, 4), 0.01).is_empty());
    }

    #[test]
    fn duration_of_one_second() {
        assert_eq!(duration_ms(16_000), 1_000);
    }
}
