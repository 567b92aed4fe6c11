use super::{format_date, Console, RULE};
use crate::lifecycle::Tracker;
use crate::record::{EmailStatus, OutreachRecord};
use crate::store::RecordQuery;
use anyhow::Result;
use std::io::{BufRead, Write};

const NO_RESPONSE_NOTE: &str = "Confirmed no response yet";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusCheckSummary {
    pub reviewed: usize,
    pub responded: usize,
    pub no_response: usize,
    pub skipped: usize,
}

/// Ask about every `initial` record, newest first.
///
/// A confirmed non-response keeps the record `initial` but restarts its
/// follow-up window.
pub fn run_status_check<R: BufRead, W: Write>(
    tracker: &Tracker,
    console: &mut Console<R, W>,
) -> Result<StatusCheckSummary> {
    let records = tracker.find_all(&RecordQuery::with_status(EmailStatus::Initial))?;
    let mut summary = StatusCheckSummary::default();
    if records.is_empty() {
        console.say("No emails awaiting a response.")?;
        return Ok(summary);
    }
    console.say(format!("{} emails awaiting a response.", records.len()))?;

    for record in &records {
        summary.reviewed += 1;
        console.say(RULE)?;
        console.say(format!(
            "{} <{}>\nSubject: {}\nSent: {}",
            record.recipient_name,
            record.recipient_email,
            record.email_subject,
            format_date(record.initial_sent_date)
        ))?;
        let answer = console.ask(&format!(
            "Has {} responded? (y/n, anything else to skip): ",
            record.recipient_name
        ))?;
        match answer.to_lowercase().as_str() {
            "y" | "yes" => {
                let notes = console.ask("Notes (optional): ")?;
                tracker.update_status(
                    &record.initial_email_id,
                    EmailStatus::Responded,
                    Some(&notes),
                )?;
                console.say("Marked as responded.")?;
                summary.responded += 1;
            }
            "n" | "no" => {
                tracker.update_status(
                    &record.initial_email_id,
                    EmailStatus::Initial,
                    Some(NO_RESPONSE_NOTE),
                )?;
                console.say("Follow-up window restarted.")?;
                summary.no_response += 1;
            }
            _ => summary.skipped += 1,
        }
    }
    Ok(summary)
}

fn ask_choice<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    prompt: &str,
    max: usize,
) -> Result<Option<usize>> {
    loop {
        let answer = console.ask(prompt)?;
        match answer.parse::<usize>() {
            Ok(0) => return Ok(None),
            Ok(choice) if choice <= max => return Ok(Some(choice - 1)),
            _ => console.say(format!("Enter a number between 0 and {max}."))?,
        }
    }
}

/// Pick one of `email`'s records and set its status by hand.
///
/// Returns `None` when the address is unknown or the operator cancels.
pub fn run_status_set<R: BufRead, W: Write>(
    tracker: &Tracker,
    console: &mut Console<R, W>,
    email: &str,
) -> Result<Option<OutreachRecord>> {
    let records = tracker.find_by_recipient_email(email)?;
    if records.is_empty() {
        console.say(format!("No emails found for {email}"))?;
        return Ok(None);
    }
    for (index, record) in records.iter().enumerate() {
        console.say(format!(
            "{}. {} - {} (sent {})",
            index + 1,
            record.email_subject,
            record.status,
            format_date(record.initial_sent_date)
        ))?;
    }
    let Some(selected) = ask_choice(console, "Select an email (0 to cancel): ", records.len())?
    else {
        console.say("Cancelled.")?;
        return Ok(None);
    };
    let record = &records[selected];

    for (index, status) in EmailStatus::ALL.iter().enumerate() {
        console.say(format!("{}. {status}", index + 1))?;
    }
    let Some(choice) = ask_choice(console, "New status (0 to cancel): ", EmailStatus::ALL.len())?
    else {
        console.say("Cancelled.")?;
        return Ok(None);
    };
    let status = EmailStatus::ALL[choice];
    let notes = console.ask("Notes (optional): ")?;

    let updated = tracker.update_status(&record.initial_email_id, status, Some(&notes))?;
    console.say(format!("{} is now {status}", updated.recipient_name))?;
    Ok(Some(updated))
}
