//! OpenAI-compatible chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;

use crate::config::CompletionConfig;
use crate::session::TranscriptEntry;

use super::{CompletionClient, CompletionError};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [TranscriptEntry],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

/// Calls `{base_url}/v1/chat/completions`.
///
/// The bearer header is only attached when an API key is configured, so
/// keyless local servers work unchanged.
pub struct ChatCompletionClient {
    client: reqwest::Client,
    config: CompletionConfig,
}

impl ChatCompletionClient {
    pub fn from_config(config: &CompletionConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl CompletionClient for ChatCompletionClient {
    async fn complete(&self, transcript: &[TranscriptEntry]) -> Result<String, CompletionError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: transcript,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
        };

        let mut req = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            req = req.bearer_auth(key);
        }

        log::debug!(
            "requesting completion from {} ({} messages)",
            self.config.model,
            transcript.len()
        );

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &detail));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CompletionError::Upstream(format!("malformed body: {e}")))?;
        extract_reply(&json)
    }
}

fn classify_status(status: StatusCode, detail: &str) -> CompletionError {
    let detail = format!("{status}: {}", detail.trim());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CompletionError::Auth(detail),
        _ => CompletionError::Upstream(detail),
    }
}

/// Pull `choices[0].message.content`; a missing or blank reply is an error.
fn extract_reply(json: &serde_json::Value) -> Result<String, CompletionError> {
    let reply = json["choices"][0]["message"]["content"]
        .as_str()
        .map(str::trim)
        .unwrap_or_default();

    if reply.is_empty() {
        Err(CompletionError::Upstream("response contained no reply".into()))
    } else {
        Ok(reply.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompletionProvider;
    use crate::session::Role;
    use serde_json::json;

    fn config(api_key: Option<&str>) -> CompletionConfig {
        CompletionConfig {
            provider: CompletionProvider::Ollama,
            base_url: "http://localhost:11434/".into(),
            api_key: api_key.map(str::to_string),
            model: "llama3.2:3b".into(),
            ..CompletionConfig::default()
        }
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let client = ChatCompletionClient::from_config(&config(None));
        assert_eq!(client.endpoint(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn request_body_uses_chat_message_shape() {
        let messages = vec![
            TranscriptEntry::new(Role::System, "be brief"),
            TranscriptEntry::new(Role::User, "Hi"),
        ];
        let body = ChatRequest {
            model: "m",
            messages: &messages,
            temperature: 0.7,
            max_tokens: 150,
            stream: false,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["messages"][1], json!({ "role": "user", "content": "Hi" }));
        assert_eq!(value["max_tokens"], 150);
        assert_eq!(value["stream"], false);
    }

    #[test]
    fn auth_statuses_are_classified() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, "bad key"),
            CompletionError::Auth(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, ""),
            CompletionError::Auth(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            CompletionError::Upstream(_)
        ));
    }

    #[test]
    fn reply_is_extracted_and_trimmed() {
        let body = json!({ "choices": [{ "message": { "content": "  Hello! Ready for your audit? " } }] });
        assert_eq!(extract_reply(&body).unwrap(), "Hello! Ready for your audit?");
    }

    #[test]
    fn empty_or_missing_reply_is_upstream_error() {
        assert!(matches!(
            extract_reply(&json!({ "choices": [] })),
            Err(CompletionError::Upstream(_))
        ));
        assert!(matches!(
            extract_reply(&json!({ "choices": [{ "message": { "content": "   " } }] })),
            Err(CompletionError::Upstream(_))
        ));
    }

    #[test]
    fn client_is_object_safe() {
        let client: Box<dyn CompletionClient> =
            Box::new(ChatCompletionClient::from_config(&config(Some("gsk-test"))));
        drop(client);
    }
}
