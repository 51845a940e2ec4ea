//! Configuration module.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each adapter,
//! `AppPaths` for cross-platform data directories, TOML persistence via
//! `AppConfig::load` / `AppConfig::save`, and environment overrides for
//! credentials.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, AssistantConfig, AssistantMode, CompletionConfig, CompletionProvider,
    SpeechConfig, TtsConfig, UiConfig, VoiceConfig,
};
