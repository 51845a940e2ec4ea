//! Call-start payloads.

use serde::Serialize;

use crate::config::VoiceConfig;
use crate::session::{Role, TranscriptEntry};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriberSpec {
    pub provider: String,
    pub model: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSpec {
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub messages: Vec<TranscriptEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSpec {
    pub provider: String,
    pub voice_id: String,
}

/// Inline assistant definition, used when no saved assistant id is configured.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantSpec {
    pub name: String,
    pub first_message: String,
    pub transcriber: TranscriberSpec,
    pub model: ModelSpec,
    pub voice: VoiceSpec,
}

/// Body of `POST /call/web`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VoiceSessionRequest {
    Saved {
        #[serde(rename = "assistantId")]
        assistant_id: String,
    },
    Inline {
        assistant: AssistantSpec,
    },
}

impl VoiceSessionRequest {
    /// A saved assistant id wins over the inline definition.
    pub fn from_config(config: &VoiceConfig, system_prompt: &str, greeting: &str) -> Self {
        if let Some(id) = config.assistant_id.as_deref().filter(|id| !id.trim().is_empty()) {
            return VoiceSessionRequest::Saved {
                assistant_id: id.to_string(),
            };
        }

        VoiceSessionRequest::Inline {
            assistant: AssistantSpec {
                name: config.assistant_name.clone(),
                first_message: greeting.to_string(),
                transcriber: TranscriberSpec {
                    provider: config.transcriber_provider.clone(),
                    model: config.transcriber_model.clone(),
                    language: config.transcriber_language.clone(),
                },
                model: ModelSpec {
                    provider: config.model_provider.clone(),
                    model: config.model.clone(),
                    temperature: config.temperature,
                    messages: vec![TranscriptEntry::new(Role::System, system_prompt)],
                },
                voice: VoiceSpec {
                    provider: config.voice_provider.clone(),
                    voice_id: config.voice_id.clone(),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_config_builds_inline_assistant() {
        let req = VoiceSessionRequest::from_config(&VoiceConfig::default(), "be brief", "Hi!");
        let value = serde_json::to_value(&req).unwrap();

        assert_eq!(value["assistant"]["name"], "Growth Experts Assistant");
        assert_eq!(value["assistant"]["firstMessage"], "Hi!");
        assert_eq!(
            value["assistant"]["transcriber"],
            json!({ "provider": "deepgram", "model": "nova-2", "language": "en-US" })
        );
        assert_eq!(value["assistant"]["model"]["model"], "llama-3.3-70b-versatile");
        assert_eq!(
            value["assistant"]["model"]["messages"][0],
            json!({ "role": "system", "content": "be brief" })
        );
        assert_eq!(
            value["assistant"]["voice"],
            json!({ "provider": "11labs", "voiceId": "pNInz6obpgDQGcFmaJcg" })
        );
    }

    #[test]
    fn saved_assistant_id_takes_precedence() {
        let config = VoiceConfig {
            assistant_id: Some("asst_123".into()),
            ..VoiceConfig::default()
        };
        let req = VoiceSessionRequest::from_config(&config, "p", "g");
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({ "assistantId": "asst_123" })
        );
    }

    #[test]
    fn blank_assistant_id_is_ignored() {
        let config = VoiceConfig {
            assistant_id: Some("  ".into()),
            ..VoiceConfig::default()
        };
        assert!(matches!(
            VoiceSessionRequest::from_config(&config, "p", "g"),
            VoiceSessionRequest::Inline { .. }
        ));
    }
}
