//! Chat completion client.
//!
//! [`ChatClient`] owns the request shaping every caller relies on (system
//! prompt placement, time-context and hint annotations, the per-model
//! temperature constraint) and records each call in the audit sink. The wire
//! protocol lives behind [`ChatProvider`] so tests can script replies.
//!
//! # Annotations
//!
//! ```text
//! system:  (TIME CONTEXT): The time is October 16th 2026, 3:04:05 pm UTC
//!
//!          <system prompt>
//! ...
//! user:    (MESSAGE HINT – DO NOT USE THIS MESSAGE IN YOUR RESPONSE): <hint>
//!
//!          (USER MESSAGE): <last message>
//! ```
//!
//! No retries happen here; the body-envelope repair loop in
//! [`crate::content`] is the only retrying caller.
pub mod audit;
pub mod requesty;

use crate::clock::{Clock, SystemClock};
use crate::error::OutreachError;
use anyhow::{anyhow, Result};
use audit::{AuditSink, ChatLogEntry};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Model identifiers routed through the chat provider.
pub mod models {
    pub const GEMINI_2_FLASH: &str = "google/gemini-2.0-flash-001";
    pub const O3_MINI: &str = "openai/o3-mini-2025-01-31";
    pub const CLAUDE_37_SONNET: &str = "anthropic/claude-3-7-sonnet-latest";
    pub const QWEN_TURBO: &str = "alibaba/qwen-turbo";
    pub const SONAR_REASONING_PRO: &str = "perplexity/sonar-reasoning-pro";
    pub const SONAR_PRO: &str = "perplexity/sonar-pro";
}

/// o3-mini only accepts the default temperature.
const FIXED_TEMPERATURE_MODEL: &str = models::O3_MINI;
const FIXED_TEMPERATURE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// A caller-level request before annotation.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Label recorded with the call and forwarded as provider metadata.
    pub prompt_name: String,
    pub system_prompt: String,
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub temperature: f32,
    /// Hint prepended to the last message; the model is told not to echo it.
    pub pre_message: Option<String>,
}

impl ChatRequest {
    pub fn new(
        prompt_name: impl Into<String>,
        system_prompt: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            prompt_name: prompt_name.into(),
            system_prompt: system_prompt.into(),
            messages: Vec::new(),
            model: model.into(),
            temperature: 0.0,
            pre_message: None,
        }
    }

    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn pre_message(mut self, hint: impl Into<String>) -> Self {
        self.pre_message = Some(hint.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Fully shaped request as it goes over the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderRequest {
    pub prompt_name: String,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Normalized provider answer; `content` is `None` when no usable choice came back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

pub trait ChatProvider {
    fn complete(&self, request: &ProviderRequest) -> Result<ProviderResponse>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub content: String,
    pub citations: Vec<String>,
}

pub struct ChatClient {
    provider: Box<dyn ChatProvider>,
    audit: AuditSink,
    clock: Arc<dyn Clock>,
}

impl ChatClient {
    pub fn new(provider: Box<dyn ChatProvider>, audit: AuditSink) -> Self {
        Self {
            provider,
            audit,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn send_request(&self, request: ChatRequest) -> Result<ChatReply> {
        if request.messages.is_empty() {
            return Err(anyhow!(
                "chat request {:?} has no messages",
                request.prompt_name
            ));
        }
        let provider_request = shape_request(request, self.clock.now());

        let start = Instant::now();
        let outcome = self.provider.complete(&provider_request);
        let duration = start.elapsed();

        let response = match outcome {
            Ok(response) => {
                self.audit
                    .record(ChatLogEntry::completed(&provider_request, &response, duration));
                response
            }
            Err(err) => {
                self.audit
                    .record(ChatLogEntry::failed(&provider_request, &err, duration));
                return Err(err);
            }
        };

        tracing::info!(
            prompt = %provider_request.prompt_name,
            model = %provider_request.model,
            elapsed_ms = duration.as_millis() as u64,
            citations = response.citations.len(),
            "chat call complete"
        );

        let content = response
            .content
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| OutreachError::ContentGenerationFailure {
                prompt_name: provider_request.prompt_name.clone(),
            })?;
        Ok(ChatReply {
            content,
            citations: response.citations,
        })
    }
}

fn shape_request(request: ChatRequest, now: DateTime<Utc>) -> ProviderRequest {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    messages.push(ChatMessage::system(request.system_prompt));
    messages.extend(request.messages);
    apply_annotations(&mut messages, request.pre_message.as_deref(), now);
    ProviderRequest {
        temperature: effective_temperature(&request.model, request.temperature),
        prompt_name: request.prompt_name,
        model: request.model,
        messages,
    }
}

/// Prefix the first message with the current time and, when given, wrap the
/// last message with the hint.
pub fn apply_annotations(messages: &mut [ChatMessage], hint: Option<&str>, now: DateTime<Utc>) {
    if let Some(first) = messages.first_mut() {
        first.content = format!(
            "(TIME CONTEXT): The time is {}\n\n{}",
            format_time_context(now),
            first.content
        );
    }
    let Some(hint) = hint.filter(|hint| !hint.is_empty()) else {
        return;
    };
    if let Some(last) = messages.last_mut() {
        last.content = format!(
            "(MESSAGE HINT – DO NOT USE THIS MESSAGE IN YOUR RESPONSE): {hint}\n\n(USER MESSAGE): {}",
            last.content
        );
    }
}

pub fn effective_temperature(model: &str, requested: f32) -> f32 {
    if model == FIXED_TEMPERATURE_MODEL {
        FIXED_TEMPERATURE
    } else {
        requested
    }
}

/// `October 16th 2026, 3:04:05 pm UTC`
pub fn format_time_context(now: DateTime<Utc>) -> String {
    format!(
        "{} {}{} {}, {} UTC",
        now.format("%B"),
        now.day(),
        ordinal_suffix(now.day()),
        now.year(),
        now.format("%-I:%M:%S %P")
    )
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

#[cfg(test)]
#[path = "chat_tests.rs"]
mod tests;
