//! CLI argument parsing for the outreach workflows.
use crate::lifecycle::{DEFAULT_MAX_DAYS, DEFAULT_MIN_DAYS};
use crate::workflow::DEFAULT_MIGRATION_SUBJECT;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Follow-up batches from the CLI look a little further than the library default.
pub const DEFAULT_FOLLOW_UP_LIMIT: usize = 100;

#[derive(Parser, Debug)]
#[command(
    name = "outreach",
    version,
    about = "LM-drafted cold outreach with tracked follow-ups",
    after_help = "Commands:\n  send --contacts <file>        Draft, review and send first-contact emails\n  follow-up                     Follow up on unanswered emails\n  status check                  Record who has responded\n  status set --email <addr>     Set the status of one record\n  migrate --tsv <file>          Import previously sent emails\n  stats                         Count records per status\n\nExamples:\n  outreach send --contacts contacts.tsv\n  outreach follow-up --min-days 10 --instructions \"mention the webinar\"\n  outreach follow-up --email ada@example.com\n  outreach stats --json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Send(SendArgs),
    FollowUp(FollowUpArgs),
    /// Review or set record statuses
    #[command(subcommand)]
    Status(StatusCommand),
    Migrate(MigrateArgs),
    Stats(StatsArgs),
}

#[derive(Parser, Debug)]
#[command(about = "Draft, review and send first-contact emails")]
pub struct SendArgs {
    /// Contacts as `name<TAB>email` lines or a JSON list of {name, email}
    #[arg(long, value_name = "FILE")]
    pub contacts: PathBuf,

    /// Send every draft without review
    #[arg(long)]
    pub automatic: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Follow up on emails that have not been answered")]
pub struct FollowUpArgs {
    /// Generate and send without review
    #[arg(long, conflicts_with = "email")]
    pub automatic: bool,

    /// Follow up one record, by recipient address or initial email id
    #[arg(long, value_name = "ADDR_OR_ID")]
    pub email: Option<String>,

    #[arg(long, value_name = "DAYS", default_value_t = DEFAULT_MIN_DAYS)]
    pub min_days: i64,

    #[arg(long, value_name = "DAYS", default_value_t = DEFAULT_MAX_DAYS)]
    pub max_days: i64,

    /// Maximum number of records in one batch
    #[arg(long, value_name = "N", default_value_t = DEFAULT_FOLLOW_UP_LIMIT)]
    pub limit: usize,

    /// Extra instructions applied to every draft
    #[arg(long, value_name = "TEXT")]
    pub instructions: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum StatusCommand {
    /// Walk initial emails and record who has responded
    Check,
    /// Set the status of one of an address's records
    Set(StatusSetArgs),
}

#[derive(Parser, Debug)]
pub struct StatusSetArgs {
    #[arg(long, value_name = "ADDR")]
    pub email: String,
}

#[derive(Parser, Debug)]
#[command(about = "Import previously sent emails from a TSV file")]
pub struct MigrateArgs {
    /// Rows of `Name<TAB>Email<TAB>Month D, YYYY`
    #[arg(long, value_name = "FILE")]
    pub tsv: PathBuf,

    /// Skip addresses that already have a record
    #[arg(long)]
    pub skip_existing: bool,

    #[arg(long, value_name = "TEXT", default_value = DEFAULT_MIGRATION_SUBJECT)]
    pub subject: String,

    /// Model recorded on imported records
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,
}

#[derive(Parser, Debug)]
#[command(about = "Count records per status")]
pub struct StatsArgs {
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}
