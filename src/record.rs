//! The persisted outreach record and its status lifecycle.
use anyhow::{anyhow, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmailStatus {
    Initial,
    FollowUpSent,
    Responded,
    Converted,
    FailedToConvert,
}

impl EmailStatus {
    pub const ALL: [EmailStatus; 5] = [
        Self::Initial,
        Self::FollowUpSent,
        Self::Responded,
        Self::Converted,
        Self::FailedToConvert,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::FollowUpSent => "follow-up-sent",
            Self::Responded => "responded",
            Self::Converted => "converted",
            Self::FailedToConvert => "failed-to-convert",
        }
    }

    /// Transitions the workflows are expected to make.
    ///
    /// ```text
    /// initial -> follow-up-sent      follow-up delivered
    /// initial -> responded | converted | failed-to-convert   operator
    /// initial -> initial             operator confirmed no reply yet
    /// ```
    pub fn documented_transitions() -> &'static [(EmailStatus, EmailStatus)] {
        &[
            (Self::Initial, Self::FollowUpSent),
            (Self::Initial, Self::Responded),
            (Self::Initial, Self::Converted),
            (Self::Initial, Self::FailedToConvert),
            (Self::Initial, Self::Initial),
        ]
    }

    pub fn is_documented_transition(from: EmailStatus, to: EmailStatus) -> bool {
        Self::documented_transitions().contains(&(from, to))
    }

    /// No documented transition leaves this status.
    pub fn is_terminal(self) -> bool {
        !Self::documented_transitions()
            .iter()
            .any(|(from, _)| *from == self)
    }
}

impl fmt::Display for EmailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmailStatus {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == raw)
            .ok_or_else(|| anyhow!("unknown email status {raw:?}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutreachRecord {
    pub initial_email_id: String,
    pub recipient_name: String,
    pub recipient_email: String,
    pub initial_sent_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_sent_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_email_id: Option<String>,
    pub status: EmailStatus,
    pub email_content: String,
    pub email_subject: String,
    pub model_used: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a record created by a delivered initial email or an import.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub recipient_name: String,
    pub recipient_email: String,
    pub email_subject: String,
    pub email_content: String,
    pub model_used: String,
}

impl OutreachRecord {
    /// A fresh `initial` record. `sent_at` is the initial send time; the
    /// bookkeeping timestamps use `now`.
    pub fn initial(
        fields: NewRecord,
        email_id: impl Into<String>,
        sent_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let record = Self {
            initial_email_id: email_id.into(),
            recipient_name: fields.recipient_name,
            recipient_email: fields.recipient_email,
            initial_sent_date: sent_at,
            follow_up_sent_date: None,
            follow_up_content: None,
            follow_up_email_id: None,
            status: EmailStatus::Initial,
            email_content: fields.email_content,
            email_subject: fields.email_subject,
            model_used: fields.model_used,
            notes: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        record.validate()?;
        Ok(record)
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("recipient name", &self.recipient_name),
            ("recipient email", &self.recipient_email),
            ("initial email id", &self.initial_email_id),
            ("email content", &self.email_content),
            ("email subject", &self.email_subject),
            ("model", &self.model_used),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(anyhow!(
                    "outreach record for {:?} is missing {field}",
                    self.recipient_email
                ));
            }
        }
        let follow_up_fields = [
            self.follow_up_sent_date.is_some(),
            self.follow_up_content.is_some(),
            self.follow_up_email_id.is_some(),
        ];
        if follow_up_fields.iter().any(|set| *set) && !follow_up_fields.iter().all(|set| *set) {
            return Err(anyhow!(
                "outreach record {} has partial follow-up fields",
                self.initial_email_id
            ));
        }
        Ok(())
    }

    /// Append `[<timestamp>] note`; blank notes are ignored.
    pub fn append_note(&mut self, note: &str, now: DateTime<Utc>) {
        let note = note.trim();
        if note.is_empty() {
            return;
        }
        let entry = format!("[{}] {note}", now.to_rfc3339_opts(SecondsFormat::Millis, true));
        self.notes = Some(match self.notes.take() {
            Some(existing) if !existing.is_empty() => format!("{existing}\n\n{entry}"),
            _ => entry,
        });
    }

    /// Stamp the follow-up fields together and move to `follow-up-sent`.
    pub fn mark_follow_up_sent(
        &mut self,
        follow_up_email_id: impl Into<String>,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        self.status = EmailStatus::FollowUpSent;
        self.follow_up_sent_date = Some(now);
        self.follow_up_email_id = Some(follow_up_email_id.into());
        self.follow_up_content = Some(content.into());
        self.updated_at = now;
    }

    pub fn days_since_initial(&self, now: DateTime<Utc>) -> i64 {
        (now - self.initial_sent_date).num_days()
    }
}

/// Opaque token identifying one delivered email.
pub fn new_email_id() -> String {
    Uuid::new_v4().to_string()
}
