//! Requesty router provider (OpenAI-compatible chat completions).
use super::{ChatMessage, ChatProvider, ProviderRequest, ProviderResponse, Usage};
use crate::config::OutreachConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const REQUESTY_CHAT_URL: &str = "https://router.requesty.ai/v1/chat/completions";

/// Socket timeout for provider calls; reasoning models can take minutes.
const HTTP_TIMEOUT: Duration = Duration::from_secs(240);

/// Blocking HTTP agent shared by the chat and delivery providers.
pub(crate) fn http_agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(HTTP_TIMEOUT))
        .build()
        .into()
}

pub struct RequestyProvider {
    agent: ureq::Agent,
    api_key: String,
    url: String,
}

impl RequestyProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            agent: http_agent(),
            api_key: api_key.into(),
            url: REQUESTY_CHAT_URL.to_string(),
        }
    }

    pub fn from_config(config: &OutreachConfig) -> Result<Self> {
        Ok(Self::new(config.requesty_api_key()?))
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

impl ChatProvider for RequestyProvider {
    fn complete(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
        let payload = WireRequest::from_request(request);
        tracing::debug!(
            prompt = %request.prompt_name,
            messages = request.messages.len(),
            chars = request.messages.iter().map(|m| m.content.len()).sum::<usize>(),
            "sending chat request"
        );
        let mut response = self
            .agent
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send_json(&payload)
            .with_context(|| format!("chat request {:?}", request.prompt_name))?;
        let wire: WireResponse = response
            .body_mut()
            .read_json()
            .context("parse chat response")?;
        Ok(wire.into_response())
    }
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    requesty: WireMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct WireMetadata<'a> {
    extra: WireExtra<'a>,
}

#[derive(Debug, Serialize)]
struct WireExtra<'a> {
    title: &'a str,
}

impl<'a> WireRequest<'a> {
    fn from_request(request: &'a ProviderRequest) -> Self {
        Self {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            requesty: WireMetadata {
                extra: WireExtra {
                    title: &request.prompt_name,
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    citations: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: Option<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    content: Option<String>,
}

impl WireResponse {
    fn into_response(self) -> ProviderResponse {
        let content = self
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content);
        ProviderResponse {
            content,
            citations: self.citations.unwrap_or_default(),
            usage: self.usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_carries_prompt_name_as_metadata() {
        let request = ProviderRequest {
            prompt_name: "Cold Outreach Subject".to_string(),
            model: "google/gemini-2.0-flash-001".to_string(),
            messages: vec![ChatMessage::system("sys"), ChatMessage::user("hi")],
            temperature: 0.0,
        };
        let value = serde_json::to_value(WireRequest::from_request(&request)).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "google/gemini-2.0-flash-001",
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "hi"}
                ],
                "temperature": 0.0,
                "requesty": {"extra": {"title": "Cold Outreach Subject"}}
            })
        );
    }

    #[test]
    fn response_maps_first_choice_and_citations() {
        let wire: WireResponse = serde_json::from_value(json!({
            "choices": [
                {"index": 0, "finish_reason": "stop", "message": {"role": "assistant", "content": "<body>a</body>"}},
                {"index": 1, "message": {"role": "assistant", "content": "ignored"}}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15},
            "citations": ["https://example.com/1"],
            "created": 1
        }))
        .unwrap();
        let response = wire.into_response();
        assert_eq!(response.content.as_deref(), Some("<body>a</body>"));
        assert_eq!(response.citations, vec!["https://example.com/1"]);
        assert_eq!(response.usage.map(|u| u.total_tokens), Some(15));
    }

    #[test]
    fn missing_choice_or_content_yields_none() {
        let empty: WireResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert_eq!(empty.into_response().content, None);

        let null_content: WireResponse =
            serde_json::from_value(json!({"choices": [{"message": {"content": null}}]})).unwrap();
        let response = null_content.into_response();
        assert_eq!(response.content, None);
        assert!(response.citations.is_empty());
    }
}
