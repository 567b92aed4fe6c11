//! Outreach record persistence.
//!
//! Records are keyed by `initial_email_id` and never deleted. Backends only
//! implement [`RecordStore::upsert`] and [`RecordStore::load_all`]; lookups,
//! filtering and counting are shared default methods.
mod json_file;
mod memory;

pub use json_file::{JsonFileStore, STORE_FILE, STORE_SCHEMA_VERSION};
pub use memory::MemoryStore;

use crate::record::{EmailStatus, OutreachRecord};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    InitialSentDate,
    UpdatedAt,
    CreatedAt,
    FollowUpSentDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

/// Filter, order and page over stored records.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    pub status: Option<EmailStatus>,
    /// Inclusive `updated_at` bounds.
    pub updated_between: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub sort_by: SortField,
    pub sort_dir: SortDir,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl RecordQuery {
    pub fn with_status(status: EmailStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    fn matches(&self, record: &OutreachRecord) -> bool {
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some((from, to)) = self.updated_between {
            if record.updated_at < from || record.updated_at > to {
                return false;
            }
        }
        true
    }

    fn compare(&self, a: &OutreachRecord, b: &OutreachRecord) -> Ordering {
        let ordering = match self.sort_by {
            SortField::InitialSentDate => a.initial_sent_date.cmp(&b.initial_sent_date),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::FollowUpSentDate => a.follow_up_sent_date.cmp(&b.follow_up_sent_date),
        };
        match self.sort_dir {
            SortDir::Asc => ordering,
            SortDir::Desc => ordering.reverse(),
        }
    }

    /// Apply the query to an unordered record set.
    pub fn apply(&self, records: Vec<OutreachRecord>) -> Vec<OutreachRecord> {
        let mut selected: Vec<OutreachRecord> =
            records.into_iter().filter(|r| self.matches(r)).collect();
        selected.sort_by(|a, b| self.compare(a, b));
        let page = selected.into_iter().skip(self.skip);
        match self.limit {
            Some(limit) => page.take(limit).collect(),
            None => page.collect(),
        }
    }
}

pub trait RecordStore {
    /// Insert, or replace the record with the same `initial_email_id`.
    fn upsert(&self, record: &OutreachRecord) -> Result<()>;

    fn load_all(&self) -> Result<Vec<OutreachRecord>>;

    fn find_by_email_id(&self, email_id: &str) -> Result<Option<OutreachRecord>> {
        Ok(self
            .load_all()?
            .into_iter()
            .find(|record| record.initial_email_id == email_id))
    }

    /// Case-insensitive address match, newest initial send first.
    fn find_by_recipient_email(&self, email: &str) -> Result<Vec<OutreachRecord>> {
        let email = email.trim();
        let mut records: Vec<OutreachRecord> = self
            .load_all()?
            .into_iter()
            .filter(|record| record.recipient_email.trim().eq_ignore_ascii_case(email))
            .collect();
        records.sort_by(|a, b| b.initial_sent_date.cmp(&a.initial_sent_date));
        Ok(records)
    }

    fn find(&self, query: &RecordQuery) -> Result<Vec<OutreachRecord>> {
        Ok(query.apply(self.load_all()?))
    }

    /// Count per status; every status is present, zero when unused.
    fn status_counts(&self) -> Result<BTreeMap<EmailStatus, usize>> {
        let mut counts: BTreeMap<EmailStatus, usize> =
            EmailStatus::ALL.iter().map(|status| (*status, 0)).collect();
        for record in self.load_all()? {
            *counts.entry(record.status).or_default() += 1;
        }
        Ok(counts)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
