//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//!
//! Credentials are normally not written to `settings.toml`; they are pulled
//! from the environment by [`AppConfig::apply_env`] after loading.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::session::AssistantError;

// ---------------------------------------------------------------------------
// AssistantMode
// ---------------------------------------------------------------------------

/// Selects how a call is carried out.
///
/// | Variant | Input                  | Reply                | Voice              |
/// |---------|------------------------|----------------------|--------------------|
/// | Local   | microphone + Whisper   | chat completion API  | speech API + rodio |
/// | Hosted  | provider web client    | provider             | provider web client |
///
/// Hosted mode tracks the call lifecycle only. Audio flows through the
/// provider's own web client, not through this app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssistantMode {
    /// The provider runs the whole voice loop; we only start/stop it and
    /// follow its lifecycle events.
    Hosted,
    /// Push-to-talk style loop driven locally, one utterance at a time.
    Local,
}

impl Default for AssistantMode {
    fn default() -> Self {
        Self::Local
    }
}

// ---------------------------------------------------------------------------
// AssistantConfig
// ---------------------------------------------------------------------------

/// Behaviour of the call widget itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Which call pipeline to use.
    pub mode: AssistantMode,
    /// Start a call as soon as the panel is opened instead of waiting for the
    /// call button.
    pub connect_on_open: bool,
    /// A toggle that would start a call this soon after a toggle-initiated
    /// hang-up is ignored (double-tap guard).
    pub toggle_debounce_ms: u64,
    /// How long the Error state stays visible before returning to Idle.
    pub error_display_secs: u64,
    /// Global key that toggles the call (e.g. `"F9"`).
    pub call_key: String,
    /// Global key that opens/closes the panel.
    pub panel_key: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            mode: AssistantMode::default(),
            connect_on_open: false,
            toggle_debounce_ms: 400,
            error_display_secs: 4,
            call_key: "F9".into(),
            panel_key: "F10".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// CompletionProvider / CompletionConfig
// ---------------------------------------------------------------------------

/// Selects which chat backend answers in Local mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionProvider {
    /// Any OpenAI-compatible REST API (Groq, OpenAI, Together.ai …).
    OpenAiCompatible,
    /// Ollama running locally, no authentication required.
    Ollama,
}

impl Default for CompletionProvider {
    fn default() -> Self {
        Self::OpenAiCompatible
    }
}

/// Settings for the chat-completion exchange (Local mode).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Which backend to use.
    pub provider: CompletionProvider,
    /// Base URL of the API endpoint, without the `/v1/...` suffix.
    pub base_url: String,
    /// API key, required unless the provider is [`CompletionProvider::Ollama`].
    pub api_key: Option<String>,
    /// Model identifier sent to the API.
    pub model: String,
    /// Sampling temperature (0.0 – 1.0).
    pub temperature: f32,
    /// Upper bound on reply length, keeps answers phone-call short.
    pub max_tokens: u32,
    /// Maximum seconds to wait for a reply before giving up.
    pub timeout_secs: u64,
}

impl CompletionConfig {
    /// `true` when this provider cannot be called without a key.
    pub fn requires_api_key(&self) -> bool {
        self.provider != CompletionProvider::Ollama
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: CompletionProvider::default(),
            base_url: "https://api.groq.com/openai".into(),
            api_key: None,
            model: "llama-3.3-70b-versatile".into(),
            temperature: 0.7,
            max_tokens: 150,
            timeout_secs: 15,
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechConfig
// ---------------------------------------------------------------------------

/// Microphone capture and Whisper settings (Local mode).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// GGML model file stem under the models directory (e.g. `"ggml-base.en"`).
    pub model: String,
    /// ISO-639-1 code, or `"auto"`.
    pub language: String,
    /// RMS level above which a 30 ms frame counts as speech.
    pub vad_threshold: f32,
    /// Trailing silence that ends an utterance.
    pub end_silence_ms: u64,
    /// Give up with "no speech" when nothing is heard for this long.
    pub no_speech_timeout_secs: u64,
    /// Hard cap on one utterance.
    pub max_utterance_secs: u64,
    /// Consecutive "no speech" results that are re-armed silently before the
    /// call surfaces an error.
    pub max_silent_rearms: u32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            model: "ggml-base.en".into(),
            language: "en".into(),
            vad_threshold: 0.015,
            end_silence_ms: 900,
            no_speech_timeout_secs: 8,
            max_utterance_secs: 30,
            max_silent_rearms: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// TtsConfig
// ---------------------------------------------------------------------------

/// Speech synthesis settings (Local mode).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Base URL of an OpenAI-compatible `/v1/audio/speech` endpoint.
    pub base_url: String,
    /// API key for the speech endpoint.
    pub api_key: Option<String>,
    /// Speech model (e.g. `"tts-1"`).
    pub model: String,
    /// Voice name (e.g. `"onyx"`).
    pub voice: String,
    /// Seconds to wait for synthesis.
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            model: "tts-1".into(),
            voice: "onyx".into(),
            timeout_secs: 20,
        }
    }
}

// ---------------------------------------------------------------------------
// VoiceConfig  (hosted voice session)
// ---------------------------------------------------------------------------

/// Settings for the hosted voice session (Hosted mode).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// REST base URL of the voice provider.
    pub base_url: String,
    /// Public key used to start web calls.  Required in Hosted mode.
    pub public_key: Option<String>,
    /// Pre-provisioned assistant.  When absent the inline assistant below is
    /// sent with every call.
    pub assistant_id: Option<String>,
    /// Display name of the inline assistant.
    pub assistant_name: String,
    pub transcriber_provider: String,
    pub transcriber_model: String,
    pub transcriber_language: String,
    pub model_provider: String,
    pub model: String,
    pub temperature: f32,
    pub voice_provider: String,
    pub voice_id: String,
    /// How often the call status is polled.
    pub poll_interval_ms: u64,
    /// Timeout for each REST request to the provider.
    pub request_timeout_secs: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.vapi.ai".into(),
            public_key: None,
            assistant_id: None,
            assistant_name: "Growth Experts Assistant".into(),
            transcriber_provider: "deepgram".into(),
            transcriber_model: "nova-2".into(),
            transcriber_language: "en-US".into(),
            model_provider: "groq".into(),
            model: "llama-3.3-70b-versatile".into(),
            temperature: 0.7,
            voice_provider: "11labs".into(),
            voice_id: "pNInz6obpgDQGcFmaJcg".into(),
            poll_interval_ms: 750,
            request_timeout_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// egui panel appearance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Last saved widget position `(x, y)` in screen pixels.
    pub window_position: Option<(f32, f32)>,
    /// Keep the widget floating above all other windows.
    pub always_on_top: bool,
    /// Show the running transcript under the call controls.
    pub show_transcript: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_position: None,
            always_on_top: true,
            show_transcript: true,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Environment variables consulted by [`AppConfig::apply_env`].
pub const ENV_VOICE_PUBLIC_KEY: &str = "VAPI_PUBLIC_KEY";
pub const ENV_VOICE_ASSISTANT_ID: &str = "VAPI_ASSISTANT_ID";
pub const ENV_VOICE_BASE_URL: &str = "VAPI_BASE_URL";
pub const ENV_COMPLETION_API_KEY: &str = "GROQ_API_KEY";
pub const ENV_TTS_API_KEY: &str = "TTS_API_KEY";

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use growth_assistant::config::AppConfig;
///
/// let mut config = AppConfig::load().unwrap();
/// config.apply_env();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub assistant: AssistantConfig,
    pub completion: CompletionConfig,
    pub speech: SpeechConfig,
    pub tts: TtsConfig,
    pub voice: VoiceConfig,
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Overlay credentials and identifiers from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary lookup.  Empty values are ignored so
    /// an exported-but-blank variable never masks the file setting.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_VOICE_PUBLIC_KEY) {
            self.voice.public_key = Some(v);
        }
        if let Some(v) = get(ENV_VOICE_ASSISTANT_ID) {
            self.voice.assistant_id = Some(v);
        }
        if let Some(v) = get(ENV_VOICE_BASE_URL) {
            self.voice.base_url = v;
        }
        if let Some(v) = get(ENV_COMPLETION_API_KEY) {
            self.completion.api_key = Some(v);
        }
        if let Some(v) = get(ENV_TTS_API_KEY) {
            self.tts.api_key = Some(v);
        }
    }

    /// Check that everything the configured mode needs to place a call is
    /// present.  Called before any device or network access.
    pub fn validate_for_call(&self) -> Result<(), AssistantError> {
        match self.assistant.mode {
            AssistantMode::Hosted => {
                if is_blank(&self.voice.public_key) {
                    return Err(AssistantError::Configuration(format!(
                        "voice session public key is missing (set {ENV_VOICE_PUBLIC_KEY})"
                    )));
                }
            }
            AssistantMode::Local => {
                if self.completion.requires_api_key() && is_blank(&self.completion.api_key) {
                    return Err(AssistantError::Configuration(format!(
                        "completion API key is missing (set {ENV_COMPLETION_API_KEY})"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Check what a typed message needs: only the completion backend.
    pub fn validate_for_chat(&self) -> Result<(), AssistantError> {
        if self.completion.requires_api_key() && is_blank(&self.completion.api_key) {
            return Err(AssistantError::Configuration(format!(
                "completion API key is missing (set {ENV_COMPLETION_API_KEY})"
            )));
        }
        Ok(())
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config.assistant.mode, AssistantMode::Local);
        assert_eq!(config.completion.model, "llama-3.3-70b-versatile");
        assert!(config.voice.public_key.is_none());
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.completion.base_url, "https://api.groq.com/openai");
        assert!((cfg.completion.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(cfg.completion.max_tokens, 150);
        assert_eq!(cfg.voice.transcriber_provider, "deepgram");
        assert_eq!(cfg.voice.transcriber_model, "nova-2");
        assert_eq!(cfg.voice.voice_provider, "11labs");
        assert_eq!(cfg.voice.voice_id, "pNInz6obpgDQGcFmaJcg");
        assert_eq!(cfg.voice.assistant_name, "Growth Experts Assistant");
        assert!(cfg.ui.always_on_top);
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.assistant.mode = AssistantMode::Hosted;
        cfg.assistant.connect_on_open = true;
        cfg.completion.provider = CompletionProvider::Ollama;
        cfg.completion.base_url = "http://localhost:11434".into();
        cfg.voice.assistant_id = Some("asst_123".into());
        cfg.speech.end_silence_ms = 1200;
        cfg.ui.window_position = Some((100.0, 200.0));

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.assistant.mode, AssistantMode::Hosted);
        assert!(loaded.assistant.connect_on_open);
        assert_eq!(loaded.completion.provider, CompletionProvider::Ollama);
        assert_eq!(loaded.completion.base_url, "http://localhost:11434");
        assert_eq!(loaded.voice.assistant_id.as_deref(), Some("asst_123"));
        assert_eq!(loaded.speech.end_silence_ms, 1200);
        assert_eq!(loaded.ui.window_position, Some((100.0, 200.0)));
    }

    #[test]
    fn partial_file_fills_missing_sections_with_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[assistant]\nmode = \"Local\"\nconnect_on_open = true\ntoggle_debounce_ms = 100\nerror_display_secs = 2\ncall_key = \"F8\"\npanel_key = \"F7\"\n")
            .expect("write");

        let loaded = AppConfig::load_from(&path).expect("load");
        assert_eq!(loaded.assistant.mode, AssistantMode::Local);
        assert_eq!(loaded.assistant.call_key, "F8");
        assert_eq!(loaded.voice.voice_id, "pNInz6obpgDQGcFmaJcg");
    }

    #[test]
    fn env_overrides_credentials_and_ignores_blank_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_VOICE_PUBLIC_KEY, "pk-live"),
            (ENV_VOICE_ASSISTANT_ID, "   "),
            (ENV_COMPLETION_API_KEY, "gsk-test"),
        ]);

        let mut cfg = AppConfig::default();
        cfg.voice.assistant_id = Some("from-file".into());
        cfg.apply_env_from(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.voice.public_key.as_deref(), Some("pk-live"));
        assert_eq!(cfg.voice.assistant_id.as_deref(), Some("from-file"));
        assert_eq!(cfg.completion.api_key.as_deref(), Some("gsk-test"));
        assert!(cfg.tts.api_key.is_none());
    }

    #[test]
    fn hosted_mode_requires_public_key() {
        let mut cfg = AppConfig::default();
        cfg.assistant.mode = AssistantMode::Hosted;
        assert!(matches!(
            cfg.validate_for_call(),
            Err(AssistantError::Configuration(_))
        ));

        cfg.voice.public_key = Some("pk".into());
        assert!(cfg.validate_for_call().is_ok());
    }

    #[test]
    fn local_mode_requires_key_unless_ollama() {
        let mut cfg = AppConfig::default();
        cfg.assistant.mode = AssistantMode::Local;
        cfg.completion.api_key = Some("  ".into());
        assert!(matches!(
            cfg.validate_for_call(),
            Err(AssistantError::Configuration(_))
        ));

        cfg.completion.provider = CompletionProvider::Ollama;
        assert!(cfg.validate_for_call().is_ok());
    }
}
