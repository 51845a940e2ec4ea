//! Whisper-backed [`Recognizer`].

use std::path::Path;

use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::{check_clip, Recognizer, SttError};

/// Wraps a loaded `WhisperContext`.  A fresh `WhisperState` is created per
/// call, so one instance can serve concurrent callers.
pub struct WhisperRecognizer {
    ctx: WhisperContext,
    language: Option<String>,
    threads: i32,
}

impl std::fmt::Debug for WhisperRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperRecognizer")
            .field("language", &self.language)
            .field("threads", &self.threads)
            .finish_non_exhaustive()
    }
}

// SAFETY: whisper-rs declares WhisperContext Send + Sync; the weights are
// read-only once loaded.
unsafe impl Send for WhisperRecognizer {}
unsafe impl Sync for WhisperRecognizer {}

impl WhisperRecognizer {
    /// Load a GGML model.  `language` is an ISO-639-1 code or `"auto"`.
    pub fn load(model_path: impl AsRef<Path>, language: &str) -> Result<Self, SttError> {
        let path = model_path.as_ref();
        if !path.exists() {
            return Err(SttError::ModelNotFound(path.display().to_string()));
        }
        let path_str = path
            .to_str()
            .ok_or_else(|| SttError::ModelNotFound(format!("non-UTF-8 path: {}", path.display())))?;

        let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        log::info!("whisper model loaded from {}", path.display());

        Ok(Self {
            ctx,
            language: (language != "auto").then(|| language.to_string()),
            threads: inference_threads(),
        })
    }
}

impl Recognizer for WhisperRecognizer {
    fn recognize(&self, audio: &[f32]) -> Result<String, SttError> {
        check_clip(audio)?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(self.language.as_deref());
        params.set_n_threads(self.threads);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_suppress_blank(true);

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| SttError::ContextInit(e.to_string()))?;
        state
            .full(params, audio)
            .map_err(|e| SttError::Inference(e.to_string()))?;

        let segments = state
            .full_n_segments()
            .map_err(|e| SttError::Inference(e.to_string()))?;

        let mut text = String::new();
        for i in 0..segments {
            let seg = state
                .full_get_segment_text(i)
                .map_err(|e| SttError::Inference(format!("segment {i}: {e}")))?;
            text.push_str(&seg);
        }
        Ok(strip_annotations(text.trim()))
    }
}

/// Whisper emits bracketed non-speech markers such as `[BLANK_AUDIO]` or
/// `(wind blowing)` for silent clips.  Drop them.
fn strip_annotations(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '[' | '(' => depth += 1,
            ']' | ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn inference_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8) as i32)
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_is_reported() {
        let result = WhisperRecognizer::load("/nonexistent/ggml-base.en.bin", "en");
        assert!(matches!(result, Err(SttError::ModelNotFound(_))));
    }

    #[test]
    fn blank_audio_marker_is_stripped() {
        assert_eq!(strip_annotations("[BLANK_AUDIO]"), "");
        assert_eq!(strip_annotations(" (wind) Hi there "), "Hi there");
    }

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(strip_annotations("How much is an audit?"), "How much is an audit?");
    }
}
