use super::{delivered_to, format_date, report_contact_error, Console, RULE};
use crate::lifecycle::{FollowUpDraft, FollowUpWindow, Orchestrator, SendRequest};
use crate::record::{EmailStatus, OutreachRecord};
use anyhow::Result;
use std::io::{BufRead, Write};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUpMode {
    /// Walk every eligible record, confirming each one.
    Bulk,
    /// One record, by recipient address or initial email id.
    Specific(String),
    /// Generate and send to every eligible record without review.
    Automatic,
}

#[derive(Debug, Clone, Default)]
pub struct FollowUpOptions {
    pub window: FollowUpWindow,
    pub limit: Option<usize>,
    /// Applied to every draft instead of asking per contact.
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FollowUpSummary {
    pub eligible: usize,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
    pub quit: bool,
}

enum Outcome {
    Sent,
    Skipped,
    Quit,
}

pub fn run_follow_up<R: BufRead, W: Write>(
    orchestrator: &Orchestrator,
    console: &mut Console<R, W>,
    mode: &FollowUpMode,
    options: &FollowUpOptions,
) -> Result<FollowUpSummary> {
    let mut summary = FollowUpSummary::default();
    let instructions = options.instructions.as_deref();

    if let FollowUpMode::Specific(identifier) = mode {
        let Some(record) = find_initial(orchestrator, identifier)? else {
            console.say(format!("No initial email found for {identifier}"))?;
            return Ok(summary);
        };
        summary.eligible = 1;
        let outcome = process_email(orchestrator, console, &record, instructions);
        tally(console, &mut summary, &record.recipient_name, outcome)?;
        return Ok(summary);
    }

    let eligible = orchestrator
        .tracker()
        .eligible_for_follow_up(&options.window, options.limit)?;
    summary.eligible = eligible.len();
    if eligible.is_empty() {
        console.say(format!(
            "No emails eligible for follow-up ({}-{} days since last update).",
            options.window.min_days, options.window.max_days
        ))?;
        return Ok(summary);
    }
    console.say(format!("Found {} emails eligible for follow-up.", eligible.len()))?;

    let total = eligible.len();
    for (index, record) in eligible.iter().enumerate() {
        let name = &record.recipient_name;
        let outcome = match mode {
            FollowUpMode::Automatic => {
                console.say(format!("\n[{}/{total}] Following up with {name}...", index + 1))?;
                send_automatically(orchestrator, console, record, instructions)
            }
            _ => {
                console.say(format!(
                    "\n[{}/{total}] {name} <{}>, initial email sent {}",
                    index + 1,
                    record.recipient_email,
                    format_date(record.initial_sent_date)
                ))?;
                if console.confirm("Process this contact? (y/n): ")? {
                    process_email(orchestrator, console, record, instructions)
                } else {
                    Ok(Outcome::Skipped)
                }
            }
        };
        tally(console, &mut summary, name, outcome)?;
        if summary.quit {
            break;
        }
    }
    console.say(format!(
        "\nFollow-up complete: {} sent, {} skipped, {} failed",
        summary.sent, summary.skipped, summary.failed
    ))?;
    Ok(summary)
}

fn tally<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    summary: &mut FollowUpSummary,
    name: &str,
    outcome: Result<Outcome>,
) -> Result<()> {
    match outcome {
        Ok(Outcome::Sent) => summary.sent += 1,
        Ok(Outcome::Skipped) => summary.skipped += 1,
        Ok(Outcome::Quit) => summary.quit = true,
        Err(err) => {
            report_contact_error(console, name, err)?;
            summary.failed += 1;
        }
    }
    Ok(())
}

/// Newest `initial` record for an address, or the `initial` record with that id.
fn find_initial(orchestrator: &Orchestrator, identifier: &str) -> Result<Option<OutreachRecord>> {
    let tracker = orchestrator.tracker();
    let record = if identifier.contains('@') {
        tracker
            .find_by_recipient_email(identifier)?
            .into_iter()
            .find(|record| record.status == EmailStatus::Initial)
    } else {
        tracker
            .store()
            .find_by_email_id(identifier.trim())?
            .filter(|record| record.status == EmailStatus::Initial)
    };
    Ok(record)
}

fn send_automatically<R: BufRead, W: Write>(
    orchestrator: &Orchestrator,
    console: &mut Console<R, W>,
    record: &OutreachRecord,
    instructions: Option<&str>,
) -> Result<Outcome> {
    let draft = orchestrator.generate_follow_up(&record.initial_email_id, instructions)?;
    orchestrator.send_and_track(&SendRequest::follow_up(&draft))?;
    console.say(format!(
        "Follow-up sent to {}",
        delivered_to(orchestrator, &record.recipient_name, &record.recipient_email)
    ))?;
    Ok(Outcome::Sent)
}

fn show_draft<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    request: &SendRequest,
) -> Result<()> {
    console.say(format!("\n----- Follow-up for {} -----", request.recipient_name))?;
    console.say(format!("Subject: {}\n", request.subject))?;
    console.say(&request.content)?;
    console.say(RULE)
}

fn ask_instructions<R: BufRead, W: Write>(console: &mut Console<R, W>) -> Result<Option<String>> {
    let answer = console.ask("Custom instructions for this follow-up (press Enter to skip): ")?;
    Ok(Some(answer).filter(|text| !text.is_empty()))
}

fn process_email<R: BufRead, W: Write>(
    orchestrator: &Orchestrator,
    console: &mut Console<R, W>,
    record: &OutreachRecord,
    instructions: Option<&str>,
) -> Result<Outcome> {
    let name = &record.recipient_name;
    console.say(RULE)?;
    console.say(format!("Recipient: {name} <{}>", record.recipient_email))?;
    console.say(format!(
        "Initial email sent: {} ({} days ago)",
        format_date(record.initial_sent_date),
        record.days_since_initial(orchestrator.tracker().now())
    ))?;
    console.say(format!("Original subject: {}", record.email_subject))?;

    let mut instructions = match instructions {
        Some(text) => Some(text.to_string()),
        None => ask_instructions(console)?,
    };

    console.say(format!("Generating follow-up for {name}..."))?;
    let draft: FollowUpDraft =
        orchestrator.generate_follow_up(&record.initial_email_id, instructions.as_deref())?;
    let mut request = SendRequest::follow_up(&draft);
    show_draft(console, &request)?;

    loop {
        let answer = console.ask(
            "\nAction? (s/send, t/test, u/update, c/change subject, r/regenerate, skip, q/quit): ",
        )?;
        match answer.to_lowercase().as_str() {
            "s" | "send" => match orchestrator.send_and_track(&request) {
                Ok(_) => {
                    console.say(format!(
                        "Follow-up sent to {}",
                        delivered_to(orchestrator, name, &record.recipient_email)
                    ))?;
                    return Ok(Outcome::Sent);
                }
                Err(err) => report_contact_error(console, name, err)?,
            },
            "t" | "test" => match orchestrator.send_test(&request) {
                Ok(address) => console.say(format!("Test follow-up sent to {address}"))?,
                Err(err) => report_contact_error(console, name, err)?,
            },
            "u" | "update" => {
                let change = console.ask("What would you like to change? ")?;
                match orchestrator.update_content(name, &request.content, &change, None) {
                    Ok(revised) => {
                        request.content = revised.content;
                        show_draft(console, &request)?;
                    }
                    Err(err) => report_contact_error(console, name, err)?,
                }
            }
            "c" | "cs" | "change" | "change subject" => {
                request.subject = console.ask("Enter new subject: ")?;
                console.say(format!("Subject updated to: {}", request.subject))?;
            }
            "r" | "regenerate" => {
                if let Some(fresh) = ask_instructions(console)? {
                    instructions = Some(fresh);
                }
                match orchestrator
                    .generate_follow_up(&record.initial_email_id, instructions.as_deref())
                {
                    Ok(draft) => {
                        request = SendRequest::follow_up(&draft);
                        show_draft(console, &request)?;
                    }
                    Err(err) => report_contact_error(console, name, err)?,
                }
            }
            "skip" => {
                console.say(format!("Skipping follow-up to {name}."))?;
                return Ok(Outcome::Skipped);
            }
            "q" | "quit" => return Ok(Outcome::Quit),
            _ => console.say("Invalid input. Please choose one of the listed actions.")?,
        }
    }
}
