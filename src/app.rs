//! Wiring from configuration to workflows.
//!
//! Store-only commands (`status`, `migrate`, `stats`) need nothing beyond
//! `DB_LOCATION`; sending commands also need chat and delivery credentials.
use crate::chat::audit::{AuditSink, CHAT_LOG_FILE};
use crate::chat::requesty::RequestyProvider;
use crate::chat::ChatClient;
use crate::cli::{Command, RootArgs, StatusCommand};
use crate::clock::SystemClock;
use crate::config::{DbLocation, OutreachConfig};
use crate::delivery::{Routing, SendGridGateway};
use crate::lifecycle::{
    FollowUpWindow, GenerationModels, Orchestrator, OutreachSettings, Tracker,
};
use crate::store::JsonFileStore;
use crate::workflow::{
    load_contacts, migrate_tsv, run_follow_up, run_send, run_status_check, run_status_set,
    stats_report, Console, FollowUpMode, FollowUpOptions, MigrateOptions, SendMode,
};
use anyhow::{Context, Result};
use std::sync::Arc;

pub struct AppContext {
    config: OutreachConfig,
}

impl AppContext {
    pub fn new(config: OutreachConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Self {
        Self::new(OutreachConfig::from_env())
    }

    pub fn config(&self) -> &OutreachConfig {
        &self.config
    }

    pub fn tracker(&self) -> Result<Tracker> {
        let dir = self.config.store_dir()?;
        Ok(Tracker::new(
            Box::new(JsonFileStore::open(&dir)),
            Arc::new(SystemClock),
        ))
    }

    /// Local mode redirects every real send to `TEST_EMAIL`.
    pub fn settings(&self) -> Result<OutreachSettings> {
        let routing = match self.config.db_location()? {
            DbLocation::Local => Routing::RedirectTo(self.config.test_email()?.to_string()),
            DbLocation::Cloud => Routing::Direct,
        };
        Ok(OutreachSettings {
            sender: self.config.sender()?,
            signature_name: self.config.signature_name().map(str::to_string),
            audience: self.config.audience().to_string(),
            thread_domain: self.config.thread_domain().to_string(),
            models: GenerationModels::default(),
            routing,
            test_email: self.config.test_email().ok().map(str::to_string),
        })
    }

    pub fn orchestrator(&self) -> Result<Orchestrator> {
        let settings = self.settings()?;
        let provider = RequestyProvider::from_config(&self.config)?;
        let gateway = SendGridGateway::from_config(&self.config)?;
        let audit = AuditSink::spawn(self.config.store_dir()?.join(CHAT_LOG_FILE))?;
        Ok(Orchestrator::new(
            ChatClient::new(Box::new(provider), audit),
            Box::new(gateway),
            self.tracker()?,
            settings,
        ))
    }
}

/// Run one CLI command to completion.
pub fn run(args: RootArgs, app: &AppContext) -> Result<()> {
    match args.command {
        Command::Send(args) => {
            let contacts = load_contacts(&args.contacts)?;
            eprintln!("Loaded {} contacts", contacts.len());
            let mode = if args.automatic {
                SendMode::Automatic
            } else {
                SendMode::Interactive
            };
            let orchestrator = app.orchestrator()?;
            run_send(&orchestrator, &mut Console::stdio(), &contacts, mode)?;
        }
        Command::FollowUp(args) => {
            let options = FollowUpOptions {
                window: FollowUpWindow::new(args.min_days, args.max_days)?,
                limit: Some(args.limit),
                instructions: args.instructions,
            };
            let mode = match (args.email, args.automatic) {
                (Some(identifier), _) => FollowUpMode::Specific(identifier),
                (None, true) => FollowUpMode::Automatic,
                (None, false) => FollowUpMode::Bulk,
            };
            let orchestrator = app.orchestrator()?;
            run_follow_up(&orchestrator, &mut Console::stdio(), &mode, &options)?;
        }
        Command::Status(StatusCommand::Check) => {
            run_status_check(&app.tracker()?, &mut Console::stdio())?;
        }
        Command::Status(StatusCommand::Set(args)) => {
            run_status_set(&app.tracker()?, &mut Console::stdio(), &args.email)?;
        }
        Command::Migrate(args) => {
            let mut options = MigrateOptions {
                default_subject: args.subject,
                skip_existing: args.skip_existing,
                ..MigrateOptions::default()
            };
            if let Some(model) = args.model {
                options.default_model = model;
            }
            let report = migrate_tsv(&app.tracker()?, &args.tsv, &options)
                .with_context(|| format!("migrate {}", args.tsv.display()))?;
            println!(
                "Migration complete: {} rows, {} migrated, {} skipped",
                report.total, report.migrated, report.skipped
            );
        }
        Command::Stats(args) => {
            let report = stats_report(&app.tracker()?)?;
            if args.json {
                let text = serde_json::to_string_pretty(&report).context("serialize stats")?;
                println!("{text}");
            } else {
                println!("{report}");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DB_LOCATION, FROM_NAME, LOCAL_DB, SENDGRID_EMAIL, TEST_EMAIL};
    use crate::error::{error_kind, ErrorKind};
    use std::collections::BTreeMap;

    fn app(pairs: &[(&str, &str)]) -> AppContext {
        let values: BTreeMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppContext::new(OutreachConfig::from_lookup(|key| values.get(key).cloned()))
    }

    const SENDER: [(&str, &str); 2] = [
        (SENDGRID_EMAIL, "me@example.com"),
        (FROM_NAME, "Grace Hopper"),
    ];

    #[test]
    fn local_mode_redirects_to_the_test_address() {
        let mut pairs = SENDER.to_vec();
        pairs.extend([(DB_LOCATION, "local"), (TEST_EMAIL, "grace+test@example.com")]);
        let settings = app(&pairs).settings().unwrap();
        assert_eq!(
            settings.routing,
            Routing::RedirectTo("grace+test@example.com".to_string())
        );
        assert_eq!(settings.signature_name.as_deref(), Some("Grace Hopper"));
    }

    #[test]
    fn local_mode_without_test_address_is_fatal() {
        let mut pairs = SENDER.to_vec();
        pairs.push((DB_LOCATION, "local"));
        let err = app(&pairs).settings().unwrap_err();
        assert_eq!(error_kind(&err), Some(ErrorKind::ConfigurationMissing));
        assert!(err.to_string().contains(TEST_EMAIL));
    }

    #[test]
    fn cloud_mode_sends_directly() {
        let mut pairs = SENDER.to_vec();
        pairs.push((DB_LOCATION, "cloud"));
        let settings = app(&pairs).settings().unwrap();
        assert_eq!(settings.routing, Routing::Direct);
        assert!(settings.test_email.is_none());
    }

    #[test]
    fn tracker_needs_only_the_store_location() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_string_lossy().into_owned();
        let app = app(&[(DB_LOCATION, "local"), (LOCAL_DB, &root)]);
        let tracker = app.tracker().unwrap();
        assert!(tracker.store().load_all().unwrap().is_empty());

        let err = app.orchestrator().err().unwrap();
        assert_eq!(error_kind(&err), Some(ErrorKind::ConfigurationMissing));
    }
}
