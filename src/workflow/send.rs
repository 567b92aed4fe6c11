use super::{delivered_to, report_contact_error, Console, Contact, RULE};
use crate::lifecycle::{GeneratedEmail, Orchestrator, SendRequest};
use anyhow::Result;
use std::collections::BTreeSet;
use std::io::{BufRead, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMode {
    /// Review each draft before it goes out.
    Interactive,
    Automatic,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendSummary {
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
    /// The operator ended the run early.
    pub quit: bool,
}

enum Outcome {
    Sent,
    Skipped,
    Quit,
}

/// Send first-contact emails to every contact not already in the store.
pub fn run_send<R: BufRead, W: Write>(
    orchestrator: &Orchestrator,
    console: &mut Console<R, W>,
    contacts: &[Contact],
    mode: SendMode,
) -> Result<SendSummary> {
    console.say("Checking for previously sent emails...")?;
    let already_sent: BTreeSet<String> = orchestrator
        .tracker()
        .store()
        .load_all()?
        .into_iter()
        .map(|record| record.recipient_email.trim().to_lowercase())
        .collect();
    console.say(format!(
        "Loaded {} previously contacted addresses",
        already_sent.len()
    ))?;

    let mut summary = SendSummary::default();
    for contact in contacts {
        if already_sent.contains(&contact.email.trim().to_lowercase()) {
            console.say(format!(
                "Skipping {} ({}) - email already sent previously",
                contact.name, contact.email
            ))?;
            summary.skipped += 1;
            continue;
        }

        let outcome = match mode {
            SendMode::Automatic => send_automatically(orchestrator, console, contact),
            SendMode::Interactive => review_and_send(orchestrator, console, contact),
        };
        match outcome {
            Ok(Outcome::Sent) => summary.sent += 1,
            Ok(Outcome::Skipped) => summary.skipped += 1,
            Ok(Outcome::Quit) => {
                summary.quit = true;
                break;
            }
            Err(err) => {
                report_contact_error(console, &contact.name, err)?;
                summary.failed += 1;
            }
        }
    }
    console.say(format!(
        "\nSend complete: {} sent, {} skipped, {} failed",
        summary.sent, summary.skipped, summary.failed
    ))?;
    Ok(summary)
}

fn send_automatically<R: BufRead, W: Write>(
    orchestrator: &Orchestrator,
    console: &mut Console<R, W>,
    contact: &Contact,
) -> Result<Outcome> {
    console.say(format!("\nGenerating email for {}...", contact.name))?;
    let email = orchestrator.generate_initial(&contact.name)?;
    orchestrator.send_and_track(&SendRequest::initial(&contact.name, &contact.email, &email))?;
    console.say(format!(
        "Email sent to {}",
        delivered_to(orchestrator, &contact.name, &contact.email)
    ))?;
    Ok(Outcome::Sent)
}

fn show_draft<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    name: &str,
    email: &GeneratedEmail,
) -> Result<()> {
    console.say(format!("\n----- Email for {name} -----"))?;
    console.say(format!("Subject: {}\n", email.subject))?;
    console.say(&email.content)?;
    for citation in &email.citations {
        console.say(format!("Citation: {citation}"))?;
    }
    console.say(RULE)
}

fn review_and_send<R: BufRead, W: Write>(
    orchestrator: &Orchestrator,
    console: &mut Console<R, W>,
    contact: &Contact,
) -> Result<Outcome> {
    console.say(format!("\nGenerating email for {}...", contact.name))?;
    let mut email = orchestrator.generate_initial(&contact.name)?;
    show_draft(console, &contact.name, &email)?;

    loop {
        let answer = console.ask(
            "\nSend this email? (y/yes, n/no, t/test, u/update, s/skip, cs/change subject): ",
        )?;
        match answer.to_lowercase().as_str() {
            "y" | "yes" => {
                let request = SendRequest::initial(&contact.name, &contact.email, &email);
                match orchestrator.send_and_track(&request) {
                    Ok(_) => {
                        console.say(format!(
                            "Email sent to {}",
                            delivered_to(orchestrator, &contact.name, &contact.email)
                        ))?;
                        return Ok(Outcome::Sent);
                    }
                    Err(err) => report_contact_error(console, &contact.name, err)?,
                }
            }
            "n" | "no" => {
                console.say("Email sending canceled.")?;
                return Ok(Outcome::Quit);
            }
            "t" | "test" => {
                let request = SendRequest::initial(&contact.name, &contact.email, &email);
                match orchestrator.send_test(&request) {
                    Ok(address) => {
                        console.say(format!("Test email for {} sent to {address}", contact.name))?
                    }
                    Err(err) => report_contact_error(console, &contact.name, err)?,
                }
            }
            "u" | "update" => {
                let instructions = console.ask("What would you like to change? ")?;
                let model = orchestrator.settings().models.draft.clone();
                match orchestrator.update_content(
                    &contact.name,
                    &email.content,
                    &instructions,
                    Some(&model),
                ) {
                    Ok(revised) => {
                        email.content = revised.content;
                        email.citations = revised.citations;
                        show_draft(console, &contact.name, &email)?;
                    }
                    Err(err) => report_contact_error(console, &contact.name, err)?,
                }
            }
            "s" | "skip" => {
                console.say(format!("Skipping email to {}.", contact.name))?;
                return Ok(Outcome::Skipped);
            }
            "cs" | "change subject" => {
                email.subject = console.ask("Enter new subject: ")?;
                console.say(format!("Subject updated to: {}", email.subject))?;
            }
            _ => console.say(
                "Invalid input. Please enter y/yes, n/no, t/test, u/update, s/skip, or cs/change subject.",
            )?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::EmailStatus;
    use crate::testing::{harness, harness_with, test_settings, RecordingGateway};
    use crate::workflow::{scripted_console, transcript};

    fn contacts() -> Vec<Contact> {
        vec![
            Contact {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
            },
            Contact {
                name: "Bob".to_string(),
                email: "bob@example.com".to_string(),
            },
        ]
    }

    #[test]
    fn interactive_send_supports_subject_change_and_skip() {
        let h = harness();
        h.provider
            .reply("<body>Hi Ada</body>")
            .reply("Hello Ada")
            .reply("<body>Hi Bob</body>")
            .reply("Hello Bob");
        let mut console = scripted_console(&["cs", "Coffee, Ada?", "maybe", "y", "s"]);

        let summary = run_send(&h.orchestrator, &mut console, &contacts(), SendMode::Interactive)
            .unwrap();
        assert_eq!(summary.sent, 1);
        assert_eq!(summary.skipped, 1);

        let records = h.orchestrator.tracker().store().load_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].email_subject, "Coffee, Ada?");
        assert_eq!(records[0].status, EmailStatus::Initial);
        assert!(transcript(&console).contains("Invalid input."));
    }

    #[test]
    fn already_contacted_addresses_are_skipped() {
        let h = harness();
        h.provider.always("<body>x</body>");
        let mut console = scripted_console(&[]);
        run_send(&h.orchestrator, &mut console, &contacts()[..1], SendMode::Automatic).unwrap();

        let mut again = contacts();
        again[0].email = "ADA@example.com".to_string();
        let summary =
            run_send(&h.orchestrator, &mut console, &again, SendMode::Automatic).unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.sent, 1);
        assert_eq!(h.gateway.sent().len(), 2);
    }

    #[test]
    fn automatic_send_continues_past_failures() {
        let h = harness_with(RecordingGateway::rejecting(), test_settings());
        h.provider.always("<body>x</body>");
        let mut console = scripted_console(&[]);
        let summary =
            run_send(&h.orchestrator, &mut console, &contacts(), SendMode::Automatic).unwrap();
        assert_eq!(summary.failed, 2);
        assert!(transcript(&console).contains("Error processing Bob"));
        assert!(h.orchestrator.tracker().store().load_all().unwrap().is_empty());
    }

    #[test]
    fn failed_interactive_send_returns_to_the_prompt() {
        let h = harness_with(RecordingGateway::rejecting(), test_settings());
        h.provider.always("<body>x</body>");
        let mut console = scripted_console(&["y", "s"]);
        let summary = run_send(
            &h.orchestrator,
            &mut console,
            &contacts()[..1],
            SendMode::Interactive,
        )
        .unwrap();
        assert_eq!(summary.sent, 0);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.skipped, 1);
        let out = transcript(&console);
        assert!(out.contains("Error processing Ada"));
        assert!(out.contains("Skipping email to Ada."));
        assert!(h.orchestrator.tracker().store().load_all().unwrap().is_empty());
    }

    #[test]
    fn declining_ends_the_run_without_sending() {
        let h = harness();
        h.provider.always("<body>x</body>");
        let mut console = scripted_console(&["t", "n"]);
        let summary =
            run_send(&h.orchestrator, &mut console, &contacts(), SendMode::Interactive).unwrap();
        assert!(summary.quit);
        assert_eq!(summary.sent, 0);
        let sent = h.gateway.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "grace+test@example.com");
        assert!(h.orchestrator.tracker().store().load_all().unwrap().is_empty());
    }
}
