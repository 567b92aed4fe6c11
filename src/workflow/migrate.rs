use crate::chat::models;
use crate::lifecycle::Tracker;
use crate::record::NewRecord;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_MIGRATION_SUBJECT: &str = "Partnership Opportunity";

#[derive(Debug, Clone)]
pub struct MigrateOptions {
    pub default_subject: String,
    pub default_model: String,
    /// Leave addresses that already have a record alone.
    pub skip_existing: bool,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            default_subject: DEFAULT_MIGRATION_SUBJECT.to_string(),
            default_model: models::SONAR_REASONING_PRO.to_string(),
            skip_existing: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub total: usize,
    pub migrated: usize,
    pub skipped: usize,
}

/// `October 5, 2025` at midnight UTC.
fn parse_sent_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(raw.trim(), "%B %d, %Y")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
}

fn is_header(line: &str) -> bool {
    line.split('\t')
        .next()
        .is_some_and(|first| first.trim().eq_ignore_ascii_case("name"))
}

/// Import previously sent emails from a `Name<TAB>Email<TAB>Date` file.
///
/// Imported records start `initial` with their original send date, so they
/// enter the follow-up window like anything sent from here.
pub fn migrate_tsv(
    tracker: &Tracker,
    path: &Path,
    options: &MigrateOptions,
) -> Result<MigrationReport> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let today = tracker.now().format("%B %-d, %Y").to_string();

    let mut report = MigrationReport::default();
    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() || (index == 0 && is_header(line)) {
            continue;
        }
        report.total += 1;
        let columns: Vec<&str> = line.split('\t').map(str::trim).collect();
        let [name, email, date, ..] = columns.as_slice() else {
            tracing::warn!(line = index + 1, "skipping row with fewer than three columns");
            report.skipped += 1;
            continue;
        };
        if name.is_empty() || email.is_empty() {
            tracing::warn!(line = index + 1, "skipping row without name or email");
            report.skipped += 1;
            continue;
        }
        let Some(sent_at) = parse_sent_date(date) else {
            tracing::warn!(line = index + 1, date = %date, "skipping row with unreadable date");
            report.skipped += 1;
            continue;
        };
        if options.skip_existing && !tracker.find_by_recipient_email(email)?.is_empty() {
            tracing::debug!(email = %email, "already tracked; skipping");
            report.skipped += 1;
            continue;
        }

        let imported = tracker.import(
            NewRecord {
                recipient_name: name.to_string(),
                recipient_email: email.to_string(),
                email_subject: options.default_subject.clone(),
                email_content: format!("Content not available - migrated from {file_name}"),
                model_used: options.default_model.clone(),
            },
            sent_at,
            &format!("Migrated from {file_name} on {today}"),
        );
        match imported {
            Ok(_) => report.migrated += 1,
            Err(err) => {
                tracing::warn!(
                    line = index + 1,
                    error = %format!("{err:#}"),
                    "row failed to import"
                );
                report.skipped += 1;
            }
        }
    }
    tracing::info!(
        total = report.total,
        migrated = report.migrated,
        skipped = report.skipped,
        "migration finished"
    );
    Ok(report)
}
