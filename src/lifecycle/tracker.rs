use super::{FollowUpWindow, DEFAULT_ELIGIBLE_LIMIT};
use crate::clock::Clock;
use crate::error::OutreachError;
use crate::record::{EmailStatus, NewRecord, OutreachRecord};
use crate::store::{RecordQuery, RecordStore, SortDir, SortField};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Record bookkeeping over a store and a clock.
pub struct Tracker {
    store: Box<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl Tracker {
    pub fn new(store: Box<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    /// `initial` records last updated inside `window`, oldest update first.
    pub fn eligible_for_follow_up(
        &self,
        window: &FollowUpWindow,
        limit: Option<usize>,
    ) -> Result<Vec<OutreachRecord>> {
        let now = self.now();
        let days_before =
            |days: i64| Duration::try_days(days).and_then(|span| now.checked_sub_signed(span));
        let Some(newest) = days_before(window.min_days) else {
            return Ok(Vec::new());
        };
        let oldest = days_before(window.max_days).unwrap_or(DateTime::<Utc>::MIN_UTC);
        let query = RecordQuery {
            status: Some(EmailStatus::Initial),
            updated_between: Some((oldest, newest)),
            sort_by: SortField::UpdatedAt,
            sort_dir: SortDir::Asc,
            skip: 0,
            limit: Some(limit.unwrap_or(DEFAULT_ELIGIBLE_LIMIT)),
        };
        self.store.find(&query)
    }

    pub fn find_by_email_id(&self, email_id: &str) -> Result<OutreachRecord> {
        self.store
            .find_by_email_id(email_id)?
            .ok_or_else(|| OutreachError::not_found(format!("email id {email_id}")).into())
    }

    pub fn find_by_recipient_email(&self, email: &str) -> Result<Vec<OutreachRecord>> {
        self.store.find_by_recipient_email(email)
    }

    pub fn find_all(&self, query: &RecordQuery) -> Result<Vec<OutreachRecord>> {
        self.store.find(query)
    }

    pub fn status_counts(&self) -> Result<BTreeMap<EmailStatus, usize>> {
        self.store.status_counts()
    }

    /// Set `status`, append `note` when non-blank, stamp `updated_at`.
    ///
    /// Any transition is accepted; ones outside
    /// [`EmailStatus::documented_transitions`] are logged.
    pub fn update_status(
        &self,
        email_id: &str,
        status: EmailStatus,
        note: Option<&str>,
    ) -> Result<OutreachRecord> {
        let mut record = self.find_by_email_id(email_id)?;
        let now = self.now();
        if !EmailStatus::is_documented_transition(record.status, status) {
            tracing::warn!(
                email_id,
                from = %record.status,
                to = %status,
                "undocumented status transition"
            );
        }
        record.status = status;
        if let Some(note) = note {
            record.append_note(note, now);
        }
        record.updated_at = now;
        self.store.upsert(&record)?;
        tracing::info!(email_id, status = %status, "status updated");
        Ok(record)
    }

    /// Persist the record for a delivered initial email.
    pub fn record_initial(&self, fields: NewRecord, email_id: &str) -> Result<OutreachRecord> {
        let now = self.now();
        let record = OutreachRecord::initial(fields, email_id, now, now)?;
        self.store.upsert(&record)?;
        Ok(record)
    }

    /// Persist a delivered follow-up on the record it replied to.
    pub fn record_follow_up(
        &self,
        mut previous: OutreachRecord,
        follow_up_email_id: &str,
        content: &str,
    ) -> Result<OutreachRecord> {
        if !EmailStatus::is_documented_transition(previous.status, EmailStatus::FollowUpSent) {
            tracing::warn!(
                email_id = %previous.initial_email_id,
                from = %previous.status,
                "follow-up recorded on a record that was not initial"
            );
        }
        previous.mark_follow_up_sent(follow_up_email_id, content, self.now());
        self.store.upsert(&previous)?;
        Ok(previous)
    }

    /// Persist an imported record sent at `sent_at`.
    pub fn import(
        &self,
        fields: NewRecord,
        sent_at: DateTime<Utc>,
        note: &str,
    ) -> Result<OutreachRecord> {
        let now = self.now();
        let mut record =
            OutreachRecord::initial(fields, crate::record::new_email_id(), sent_at, now)?;
        record.append_note(note, now);
        self.store.upsert(&record)?;
        Ok(record)
    }
}
