use crate::lifecycle::Tracker;
use crate::record::EmailStatus;
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Record counts per status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsReport {
    pub total: usize,
    pub counts: BTreeMap<EmailStatus, usize>,
}

pub fn stats_report(tracker: &Tracker) -> Result<StatsReport> {
    let counts = tracker.status_counts()?;
    Ok(StatsReport {
        total: counts.values().sum(),
        counts,
    })
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Email statistics:")?;
        for (status, count) in &self.counts {
            writeln!(f, "  {:<18} {count}", status.as_str())?;
        }
        write!(f, "  {:<18} {}", "total", self.total)
    }
}
