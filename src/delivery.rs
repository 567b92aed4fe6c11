//! Transactional email delivery.
//!
//! The gateway is a thin pass-through: it renders nothing beyond the HTML
//! document wrapper and performs no retries. Any rejection surfaces as
//! [`OutreachError::DeliveryFailure`] so callers can leave their records
//! untouched.
use crate::chat::requesty::http_agent;
use crate::config::OutreachConfig;
use crate::error::OutreachError;
use anyhow::Result;
use serde::Serialize;

pub const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Envelope sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sender {
    pub email: String,
    pub name: String,
}

/// `References` / `In-Reply-To` pair that threads a follow-up under the
/// original message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadingHeaders {
    pub references: String,
    pub in_reply_to: String,
}

impl ThreadingHeaders {
    pub fn replying_to(previous_email_id: &str, domain: &str) -> Self {
        let message_id = format!("<{previous_email_id}@{domain}>");
        Self {
            references: message_id.clone(),
            in_reply_to: message_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub from: Sender,
    pub subject: String,
    pub html: String,
    pub bcc: Option<String>,
    pub threading: Option<ThreadingHeaders>,
}

/// Prefix marking mail that went to the operator instead of the recipient.
pub const TEST_SUBJECT_PREFIX: &str = "[TEST] ";

/// Where real sends are delivered.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Routing {
    #[default]
    Direct,
    /// Local runs: deliver to this address with a test subject prefix.
    RedirectTo(String),
}

impl Routing {
    pub fn apply(&self, email: &mut OutboundEmail) {
        if let Self::RedirectTo(address) = self {
            email.to = address.clone();
            email.subject = format!("{TEST_SUBJECT_PREFIX}{}", email.subject);
        }
    }
}

impl OutboundEmail {
    /// Copy addressed to the operator; no bcc.
    pub fn test_copy(&self, test_email: &str) -> Self {
        let mut copy = self.clone();
        copy.to = test_email.to_string();
        copy.bcc = None;
        if !copy.subject.starts_with(TEST_SUBJECT_PREFIX) {
            copy.subject = format!("{TEST_SUBJECT_PREFIX}{}", copy.subject);
        }
        copy
    }
}

pub trait DeliveryGateway {
    /// Hand the message to the provider. `Ok` means the provider accepted it.
    fn send(&self, email: &OutboundEmail) -> Result<()>;
}

/// Wrap a `<body>` fragment into a complete HTML document.
pub fn render_html_document(sender_name: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Email from {sender_name}</title>
</head>
{body}"#
    )
}

pub struct SendGridGateway {
    agent: ureq::Agent,
    api_key: String,
    url: String,
}

impl SendGridGateway {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            agent: http_agent(),
            api_key: api_key.into(),
            url: SENDGRID_SEND_URL.to_string(),
        }
    }

    pub fn from_config(config: &OutreachConfig) -> Result<Self> {
        Ok(Self::new(config.sendgrid_api_key()?))
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

impl DeliveryGateway for SendGridGateway {
    fn send(&self, email: &OutboundEmail) -> Result<()> {
        let payload = SendGridMail::from_outbound(email);
        let started = std::time::Instant::now();
        self.agent
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send_json(&payload)
            .map_err(|err| OutreachError::DeliveryFailure {
                recipient: email.to.clone(),
                reason: err.to_string(),
            })?;
        tracing::info!(
            to = %email.to,
            threaded = email.threading.is_some(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "email accepted by delivery provider"
        );
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SendGridMail<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: &'a Sender,
    subject: &'a str,
    content: Vec<MailContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    headers: Option<MailHeaders<'a>>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    bcc: Vec<Address<'a>>,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct MailContent<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct MailHeaders<'a> {
    #[serde(rename = "References")]
    references: &'a str,
    #[serde(rename = "In-Reply-To")]
    in_reply_to: &'a str,
}

impl<'a> SendGridMail<'a> {
    fn from_outbound(email: &'a OutboundEmail) -> Self {
        // The provider rejects a bcc that repeats a `to` address.
        let bcc = email
            .bcc
            .as_deref()
            .filter(|bcc| !bcc.eq_ignore_ascii_case(&email.to))
            .map(|bcc| vec![Address { email: bcc }])
            .unwrap_or_default();
        Self {
            personalizations: vec![Personalization {
                to: vec![Address { email: &email.to }],
                bcc,
            }],
            from: &email.from,
            subject: &email.subject,
            content: vec![MailContent {
                kind: "text/html",
                value: &email.html,
            }],
            headers: email.threading.as_ref().map(|headers| MailHeaders {
                references: &headers.references,
                in_reply_to: &headers.in_reply_to,
            }),
        }
    }
}
