//! Outreach lifecycle: eligibility, content generation, status transitions
//! and send-and-track.
//!
//! [`Tracker`] owns the record store and the clock and is all that the
//! read-only commands need. [`Orchestrator`] adds the chat client and the
//! delivery gateway on top of a tracker.
//!
//! A record moves through these states:
//!
//! ```text
//! initial --(follow-up delivered)--> follow-up-sent
//! initial --(operator)-------------> responded | converted | failed-to-convert
//! initial --(no reply confirmed)---> initial
//! ```
mod orchestrator;
mod tracker;

pub use orchestrator::Orchestrator;
pub use tracker::Tracker;

use crate::chat::models;
use crate::content::RepairPolicy;
use crate::delivery::{Routing, Sender};
use crate::record::OutreachRecord;
use anyhow::{anyhow, Result};

pub const DEFAULT_MIN_DAYS: i64 = 7;
pub const DEFAULT_MAX_DAYS: i64 = 30;
pub const DEFAULT_ELIGIBLE_LIMIT: usize = 50;

/// Inclusive range of whole days since a record was last updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowUpWindow {
    pub min_days: i64,
    pub max_days: i64,
}

impl FollowUpWindow {
    pub fn new(min_days: i64, max_days: i64) -> Result<Self> {
        if min_days < 0 || min_days > max_days {
            return Err(anyhow!(
                "invalid follow-up window: min {min_days} days, max {max_days} days"
            ));
        }
        Ok(Self { min_days, max_days })
    }
}

impl Default for FollowUpWindow {
    fn default() -> Self {
        Self {
            min_days: DEFAULT_MIN_DAYS,
            max_days: DEFAULT_MAX_DAYS,
        }
    }
}

/// Which model handles each generation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationModels {
    /// Research-capable model for first drafts.
    pub draft: String,
    pub refine: String,
    pub subject: String,
    pub repair: RepairPolicy,
}

impl Default for GenerationModels {
    fn default() -> Self {
        Self {
            draft: models::SONAR_REASONING_PRO.to_string(),
            refine: models::GEMINI_2_FLASH.to_string(),
            subject: models::GEMINI_2_FLASH.to_string(),
            repair: RepairPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutreachSettings {
    pub sender: Sender,
    /// Name used in the generated sign-off.
    pub signature_name: Option<String>,
    /// Appended to the recipient name when drafting, e.g. "finance influencer".
    pub audience: String,
    /// Domain part of the synthetic Message-ID used for threading.
    pub thread_domain: String,
    pub models: GenerationModels,
    pub routing: Routing,
    /// Destination for operator test sends.
    pub test_email: Option<String>,
}

/// A generated email awaiting operator review or delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedEmail {
    pub subject: String,
    pub content: String,
    pub citations: Vec<String>,
    pub model: String,
}

/// Follow-up content plus the record it replies to.
#[derive(Debug, Clone)]
pub struct FollowUpDraft {
    pub previous: OutreachRecord,
    pub email: GeneratedEmail,
    pub days_since_initial: i64,
}

/// Body rewritten from operator instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisedContent {
    pub content: String,
    pub citations: Vec<String>,
}

/// What to deliver and how to track it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub recipient_name: String,
    pub recipient_email: String,
    pub subject: String,
    /// `<body>` fragment; wrapped into a full document at send time.
    pub content: String,
    pub model: String,
    /// `initial_email_id` of the record this follow-up replies to.
    pub follow_up_of: Option<String>,
}

impl SendRequest {
    pub fn initial(name: &str, email: &str, generated: &GeneratedEmail) -> Self {
        Self {
            recipient_name: name.to_string(),
            recipient_email: email.to_string(),
            subject: generated.subject.clone(),
            content: generated.content.clone(),
            model: generated.model.clone(),
            follow_up_of: None,
        }
    }

    pub fn follow_up(draft: &FollowUpDraft) -> Self {
        Self {
            recipient_name: draft.previous.recipient_name.clone(),
            recipient_email: draft.previous.recipient_email.clone(),
            subject: draft.email.subject.clone(),
            content: draft.email.content.clone(),
            model: draft.email.model.clone(),
            follow_up_of: Some(draft.previous.initial_email_id.clone()),
        }
    }
}
