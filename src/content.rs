//! Generated-content cleanup and the body-envelope repair loop.
//!
//! Every email body must start with `<body>` and end with `</body>` before it
//! can be sent. Drafts that miss the envelope are handed back to the chat
//! provider with a fix-up prompt, up to a fixed number of attempts.
use crate::chat::{models, ChatClient, ChatMessage, ChatRequest};
use crate::error::OutreachError;
use crate::templates::{FIX_HTML_MD, FIX_HTML_PRE_MESSAGE_MD};
use anyhow::Result;
use regex::Regex;

const BODY_OPEN: &str = "<body>";
const BODY_CLOSE: &str = "</body>";

pub const DEFAULT_REPAIR_ATTEMPTS: usize = 3;
const REPAIR_PROMPT_NAME: &str = "Cold Outreach Fix HTML";

/// Model and budget for envelope repair calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairPolicy {
    pub model: String,
    pub max_attempts: usize,
}

impl Default for RepairPolicy {
    fn default() -> Self {
        Self {
            model: models::GEMINI_2_FLASH.to_string(),
            max_attempts: DEFAULT_REPAIR_ATTEMPTS,
        }
    }
}

/// Remove HTML comments, citation markers, code fences and `<think>` blocks.
///
/// Runs until nothing more matches, so `strip_artifacts(strip_artifacts(x))`
/// equals `strip_artifacts(x)`.
pub fn strip_artifacts(raw: &str) -> String {
    let comments = Regex::new(r"(?s)<!--.*?-->").expect("regex for html comments");
    let citations = Regex::new(r"\[\d+\]").expect("regex for citation markers");
    let fences = Regex::new(r"```[\w-]*\n?").expect("regex for code fences");
    let thinking = Regex::new(r"(?s)<think>.*?</think>").expect("regex for think blocks");

    let mut current = raw.to_string();
    loop {
        let mut next = comments.replace_all(&current, "").into_owned();
        next = citations.replace_all(&next, "").into_owned();
        next = fences.replace_all(&next, "").into_owned();
        next = thinking.replace_all(&next, "").into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

pub fn has_body_envelope(content: &str) -> bool {
    let trimmed = content.trim();
    trimmed.starts_with(BODY_OPEN) && trimmed.ends_with(BODY_CLOSE)
}

/// Strip artifacts and repair the envelope until it holds.
///
/// Returns the trimmed content. Fails with
/// [`OutreachError::StructuralValidationFailure`] once `max_attempts` repair
/// calls have been spent; chat errors propagate immediately.
pub fn ensure_body_envelope(
    chat: &ChatClient,
    content: &str,
    policy: &RepairPolicy,
) -> Result<String> {
    let mut current = strip_artifacts(content);
    let mut attempts = 0;
    while !has_body_envelope(&current) && attempts < policy.max_attempts {
        attempts += 1;
        eprintln!(
            "  body envelope missing; repair attempt {attempts}/{}",
            policy.max_attempts
        );
        tracing::debug!(attempt = attempts, chars = current.len(), "repairing body envelope");
        let reply = chat.send_request(repair_request(&current, &policy.model))?;
        current = strip_artifacts(&reply.content);
    }

    if !has_body_envelope(&current) {
        return Err(OutreachError::StructuralValidationFailure { attempts }.into());
    }
    if attempts > 0 {
        tracing::info!(attempts, "body envelope repaired");
    }
    Ok(current.trim().to_string())
}

fn repair_request(content: &str, model: &str) -> ChatRequest {
    ChatRequest::new(REPAIR_PROMPT_NAME, FIX_HTML_MD.trim(), model)
        .message(ChatMessage::user(format!(
            "Fix this HTML content so it starts with <body> and ends with </body>. \
             Don't add any explanations, just return the fixed HTML:\n\n{content}"
        )))
        .pre_message(FIX_HTML_PRE_MESSAGE_MD.trim())
        .temperature(0.0)
}

/// Trim a generated subject line and drop one pair of surrounding quotes.
pub fn clean_subject(raw: &str) -> String {
    let subject = raw.trim();
    let subject = subject
        .strip_prefix(['"', '\''])
        .unwrap_or(subject);
    let subject = subject
        .strip_suffix(['"', '\''])
        .unwrap_or(subject);
    subject.trim().to_string()
}

#[cfg(test)]
#[path = "content_tests.rs"]
mod tests;
