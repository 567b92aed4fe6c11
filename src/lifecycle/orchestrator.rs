use super::{
    FollowUpDraft, GeneratedEmail, OutreachSettings, RevisedContent, SendRequest, Tracker,
};
use crate::chat::{ChatClient, ChatMessage, ChatRequest};
use crate::config::TEST_EMAIL;
use crate::content::{clean_subject, ensure_body_envelope, strip_artifacts};
use crate::delivery::{
    render_html_document, DeliveryGateway, OutboundEmail, ThreadingHeaders,
};
use crate::error::OutreachError;
use crate::record::{new_email_id, EmailStatus, NewRecord, OutreachRecord};
use crate::templates::{
    PromptVars, COLD_OUTREACH_MD, COLD_OUTREACH_PRE_MESSAGE_MD, HELPFUL_ASSISTANT_MD,
    HELPFUL_ASSISTANT_PRE_MESSAGE_MD,
};
use anyhow::{Context, Result};

const INITIAL_PROMPT: &str = "Cold Outreach Initial Email";
const SUBJECT_PROMPT: &str = "Cold Outreach Subject";
const FOLLOW_UP_DRAFT_PROMPT: &str = "Cold Outreach Follow-up Email Initial";
const FOLLOW_UP_REFINE_PROMPT: &str = "Cold Outreach Follow-up Email Refinement";
const UPDATE_PROMPT: &str = "Cold Outreach Update Email Content";

const REPLY_SUBJECT_PREFIX: &str = "Re: ";

pub struct Orchestrator {
    chat: ChatClient,
    gateway: Box<dyn DeliveryGateway>,
    tracker: Tracker,
    settings: OutreachSettings,
}

impl Orchestrator {
    pub fn new(
        chat: ChatClient,
        gateway: Box<dyn DeliveryGateway>,
        tracker: Tracker,
        settings: OutreachSettings,
    ) -> Self {
        Self {
            chat,
            gateway,
            tracker,
            settings,
        }
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn settings(&self) -> &OutreachSettings {
        &self.settings
    }

    fn prompt_vars(&self) -> PromptVars<'_> {
        PromptVars {
            signature_name: self.settings.signature_name.as_deref(),
            now: self.tracker.now(),
        }
    }

    fn cold_outreach_request(&self, prompt_name: &str, recipient_context: String) -> ChatRequest {
        let vars = self.prompt_vars();
        ChatRequest::new(
            prompt_name,
            vars.render(COLD_OUTREACH_MD),
            &self.settings.models.draft,
        )
        .message(ChatMessage::user(recipient_context))
        .pre_message(vars.render(COLD_OUTREACH_PRE_MESSAGE_MD))
        .temperature(0.0)
    }

    /// Draft, validate and title a first-contact email for `name`.
    pub fn generate_initial(&self, name: &str) -> Result<GeneratedEmail> {
        let request = self.cold_outreach_request(
            INITIAL_PROMPT,
            format!("{name} {}", self.settings.audience),
        );
        let draft = self
            .chat
            .send_request(request)
            .with_context(|| format!("draft initial email for {name}"))?;
        let content = ensure_body_envelope(
            &self.chat,
            &strip_artifacts(&draft.content),
            &self.settings.models.repair,
        )?;
        let subject = self.generate_subject(name, &content)?;
        Ok(GeneratedEmail {
            subject,
            content,
            citations: draft.citations,
            model: self.settings.models.draft.clone(),
        })
    }

    /// Subject line for a finished body, from an independent call.
    pub fn generate_subject(&self, name: &str, body: &str) -> Result<String> {
        let audience = &self.settings.audience;
        let request = ChatRequest::new(
            SUBJECT_PROMPT,
            HELPFUL_ASSISTANT_MD.trim(),
            &self.settings.models.subject,
        )
        .message(ChatMessage::user(format!(
            "Generate a concise, compelling email subject line for a cold outreach email to \
             {name}, who is a {audience}. The email body is as follows:\n\n{body}\n\n\
             The subject line should be attention-grabbing, personalized, and relevant to the \
             content of the email. Do not include any explanations, just return the subject \
             line text."
        )))
        .pre_message(HELPFUL_ASSISTANT_PRE_MESSAGE_MD.trim())
        .temperature(0.0);
        let reply = self
            .chat
            .send_request(request)
            .with_context(|| format!("generate subject for {name}"))?;
        let subject = clean_subject(&reply.content);
        if subject.is_empty() {
            return Err(OutreachError::ContentGenerationFailure {
                prompt_name: SUBJECT_PROMPT.to_string(),
            }
            .into());
        }
        Ok(subject)
    }

    /// Draft and refine a follow-up to an `initial` record.
    pub fn generate_follow_up(
        &self,
        initial_email_id: &str,
        custom_instructions: Option<&str>,
    ) -> Result<FollowUpDraft> {
        let previous = self
            .tracker
            .store()
            .find_by_email_id(initial_email_id)?
            .filter(|record| record.status == EmailStatus::Initial)
            .ok_or_else(|| OutreachError::not_found(format!("initial email {initial_email_id}")))?;
        let name = previous.recipient_name.clone();

        let draft = self
            .chat
            .send_request(self.cold_outreach_request(FOLLOW_UP_DRAFT_PROMPT, name.clone()))
            .with_context(|| format!("draft follow-up for {name}"))?;

        let days_since_initial = previous.days_since_initial(self.tracker.now());
        let extra = custom_instructions
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(|text| format!("\n\nAdditional instructions: {text}"))
            .unwrap_or_default();
        let refine = ChatRequest::new(
            FOLLOW_UP_REFINE_PROMPT,
            HELPFUL_ASSISTANT_MD.trim(),
            &self.settings.models.refine,
        )
        .message(ChatMessage::user(format!(
            "Days since initial email: {days_since_initial}\n\n\
             Previous email: {}\n\n\
             Refine this follow-up email. Keep the same structure but make it more concise and \
             natural. Make sure to reference the previous email in the content:\n\n{}{extra}",
            previous.email_content,
            strip_artifacts(&draft.content)
        )))
        .pre_message(self.prompt_vars().render(COLD_OUTREACH_PRE_MESSAGE_MD))
        .temperature(0.0);
        let refined = self
            .chat
            .send_request(refine)
            .with_context(|| format!("refine follow-up for {name}"))?;

        let content =
            ensure_body_envelope(&self.chat, &refined.content, &self.settings.models.repair)?;
        let subject = format!("{REPLY_SUBJECT_PREFIX}{}", previous.email_subject);
        Ok(FollowUpDraft {
            email: GeneratedEmail {
                subject,
                content,
                citations: refined.citations,
                model: self.settings.models.refine.clone(),
            },
            previous,
            days_since_initial,
        })
    }

    /// Rewrite `original` for `name` following operator `instructions`.
    pub fn update_content(
        &self,
        name: &str,
        original: &str,
        instructions: &str,
        model: Option<&str>,
    ) -> Result<RevisedContent> {
        let model = model.unwrap_or(&self.settings.models.refine);
        let request = ChatRequest::new(UPDATE_PROMPT, HELPFUL_ASSISTANT_MD.trim(), model)
            .message(ChatMessage::user(name))
            .message(ChatMessage::assistant(original))
            .message(ChatMessage::user(instructions))
            .pre_message(HELPFUL_ASSISTANT_PRE_MESSAGE_MD.trim())
            .temperature(0.0);
        let reply = self
            .chat
            .send_request(request)
            .with_context(|| format!("update email content for {name}"))?;
        let content =
            ensure_body_envelope(&self.chat, &reply.content, &self.settings.models.repair)?;
        Ok(RevisedContent {
            content,
            citations: reply.citations,
        })
    }

    pub fn update_status(
        &self,
        initial_email_id: &str,
        status: EmailStatus,
        note: Option<&str>,
    ) -> Result<OutreachRecord> {
        self.tracker.update_status(initial_email_id, status, note)
    }

    fn outbound(&self, request: &SendRequest) -> OutboundEmail {
        let sender = &self.settings.sender;
        OutboundEmail {
            to: request.recipient_email.clone(),
            from: sender.clone(),
            subject: request.subject.clone(),
            html: render_html_document(&sender.name, &request.content),
            bcc: Some(sender.email.clone()),
            threading: request
                .follow_up_of
                .as_deref()
                .map(|id| ThreadingHeaders::replying_to(id, &self.settings.thread_domain)),
        }
    }

    /// Deliver, then record. Nothing is persisted unless the gateway accepts.
    pub fn send_and_track(&self, request: &SendRequest) -> Result<OutreachRecord> {
        let previous = match request.follow_up_of.as_deref() {
            Some(id) => Some(self.tracker.find_by_email_id(id)?),
            None => None,
        };

        let email_id = new_email_id();
        let mut outbound = self.outbound(request);
        self.settings.routing.apply(&mut outbound);
        self.gateway
            .send(&outbound)
            .with_context(|| format!("send email to {}", request.recipient_name))?;

        let record = match previous {
            Some(previous) => {
                self.tracker
                    .record_follow_up(previous, &email_id, &request.content)?
            }
            None => self.tracker.record_initial(
                NewRecord {
                    recipient_name: request.recipient_name.clone(),
                    recipient_email: request.recipient_email.clone(),
                    email_subject: request.subject.clone(),
                    email_content: request.content.clone(),
                    model_used: request.model.clone(),
                },
                &email_id,
            )?,
        };
        tracing::info!(
            email_id = %email_id,
            to = %outbound.to,
            follow_up = request.follow_up_of.is_some(),
            "email sent and tracked"
        );
        Ok(record)
    }

    /// Deliver a copy to the operator's test address; the store is untouched.
    pub fn send_test(&self, request: &SendRequest) -> Result<String> {
        let test_email = self
            .settings
            .test_email
            .as_deref()
            .ok_or_else(|| OutreachError::missing_config(TEST_EMAIL))?;
        let outbound = self.outbound(request).test_copy(test_email);
        self.gateway
            .send(&outbound)
            .with_context(|| format!("send test email for {}", request.recipient_name))?;
        Ok(test_email.to_string())
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
