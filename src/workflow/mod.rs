//! Operator workflows driving the lifecycle one contact at a time.
//!
//! Each workflow talks to the operator through a [`Console`] so the loops can
//! be exercised with scripted input. Per-contact failures are reported and the
//! batch moves on; only configuration gaps abort a run.
mod console;
mod contacts;
mod follow_up;
mod migrate;
mod send;
mod stats;
mod status;

pub use console::Console;
pub use contacts::{load_contacts, parse_tsv_contacts, Contact};
pub use follow_up::{run_follow_up, FollowUpMode, FollowUpOptions, FollowUpSummary};
pub use migrate::{migrate_tsv, MigrateOptions, MigrationReport, DEFAULT_MIGRATION_SUBJECT};
pub use send::{run_send, SendMode, SendSummary};
pub use stats::{stats_report, StatsReport};
pub use status::{run_status_check, run_status_set, StatusCheckSummary};

use crate::delivery::Routing;
use crate::error::is_fatal;
use crate::lifecycle::Orchestrator;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::io::{BufRead, Write};

const RULE: &str = "------------------------------------------------------------------";

/// Report a per-contact failure, or hand it back when the run must stop.
fn report_contact_error<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    name: &str,
    err: anyhow::Error,
) -> Result<()> {
    if is_fatal(&err) {
        return Err(err);
    }
    tracing::warn!(contact = name, error = %format!("{err:#}"), "contact failed");
    console.say(format!("Error processing {name}: {err:#}"))?;
    Ok(())
}

/// `October 16, 2026`
fn format_date(date: DateTime<Utc>) -> String {
    date.format("%B %-d, %Y").to_string()
}

fn delivered_to(orchestrator: &Orchestrator, name: &str, email: &str) -> String {
    match &orchestrator.settings().routing {
        Routing::Direct => format!("{name} at {email}"),
        Routing::RedirectTo(address) => format!("{address} (TEST MODE, for {name})"),
    }
}

#[cfg(test)]
pub(crate) fn scripted_console(answers: &[&str]) -> Console<std::io::Cursor<Vec<u8>>, Vec<u8>> {
    let mut input = answers.join("\n");
    input.push('\n');
    Console::new(std::io::Cursor::new(input.into_bytes()), Vec::new())
}

#[cfg(test)]
pub(crate) fn transcript<R: BufRead>(console: &Console<R, Vec<u8>>) -> String {
    String::from_utf8_lossy(console.output()).into_owned()
}
