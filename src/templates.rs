//! Prompt templates compiled into the binary.
use chrono::{DateTime, Utc};

pub const COLD_OUTREACH_MD: &str = include_str!("../prompts/cold_outreach.md");
pub const COLD_OUTREACH_PRE_MESSAGE_MD: &str =
    include_str!("../prompts/cold_outreach_pre_message.md");
pub const FIX_HTML_MD: &str = include_str!("../prompts/fix_html.md");
pub const FIX_HTML_PRE_MESSAGE_MD: &str = include_str!("../prompts/fix_html_pre_message.md");
pub const HELPFUL_ASSISTANT_MD: &str = include_str!("../prompts/helpful_assistant.md");
pub const HELPFUL_ASSISTANT_PRE_MESSAGE_MD: &str =
    include_str!("../prompts/helpful_assistant_pre_message.md");

/// Used when no sender first name is configured.
const FALLBACK_SIGNATURE: &str = "[Your Name]";

/// Values substituted into `{placeholder}` slots.
#[derive(Debug, Clone, Copy)]
pub struct PromptVars<'a> {
    pub signature_name: Option<&'a str>,
    pub now: DateTime<Utc>,
}

impl PromptVars<'_> {
    pub fn render(&self, template: &str) -> String {
        template
            .replace(
                "{signature_name}",
                self.signature_name.unwrap_or(FALLBACK_SIGNATURE),
            )
            .replace("{today}", &self.now.format("%B %-d, %Y").to_string())
            .trim_end()
            .to_string()
    }
}
