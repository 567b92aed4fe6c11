//! Shared test infrastructure for integration tests.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeZone, Utc};
use outreach::chat::audit::AuditSink;
use outreach::chat::{ChatClient, ChatProvider, ProviderRequest, ProviderResponse};
use outreach::clock::ManualClock;
use outreach::delivery::{DeliveryGateway, OutboundEmail, Routing, Sender};
use outreach::error::OutreachError;
use outreach::lifecycle::{GenerationModels, Orchestrator, OutreachSettings, Tracker};
use outreach::store::JsonFileStore;
use std::collections::VecDeque;
use std::path::Path;
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

#[derive(Default)]
struct Script {
    replies: VecDeque<String>,
    fallback: Option<String>,
    requests: Vec<ProviderRequest>,
}

/// Provider answering from a fixed script.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    script: Arc<Mutex<Script>>,
}

impl ScriptedProvider {
    pub fn reply(&self, content: &str) -> &Self {
        self.script
            .lock()
            .expect("script lock")
            .replies
            .push_back(content.to_string());
        self
    }

    pub fn always(&self, content: &str) -> &Self {
        self.script.lock().expect("script lock").fallback = Some(content.to_string());
        self
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.script.lock().expect("script lock").requests.clone()
    }
}

impl ChatProvider for ScriptedProvider {
    fn complete(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
        let mut script = self.script.lock().map_err(|_| anyhow!("script lock"))?;
        script.requests.push(request.clone());
        let content = script
            .replies
            .pop_front()
            .or_else(|| script.fallback.clone())
            .ok_or_else(|| anyhow!("no scripted reply left"))?;
        Ok(ProviderResponse {
            content: Some(content),
            ..ProviderResponse::default()
        })
    }
}

/// Gateway keeping every accepted email; optionally rejects everything.
#[derive(Clone, Default)]
pub struct RecordingGateway {
    sent: Arc<Mutex<Vec<OutboundEmail>>>,
    reject: bool,
}

impl RecordingGateway {
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().expect("sent lock").clone()
    }
}

impl DeliveryGateway for RecordingGateway {
    fn send(&self, email: &OutboundEmail) -> Result<()> {
        if self.reject {
            return Err(OutreachError::DeliveryFailure {
                recipient: email.to.clone(),
                reason: "provider returned 503".to_string(),
            }
            .into());
        }
        self.sent.lock().expect("sent lock").push(email.clone());
        Ok(())
    }
}

pub fn settings() -> OutreachSettings {
    OutreachSettings {
        sender: Sender {
            email: "me@example.com".to_string(),
            name: "Grace Hopper".to_string(),
        },
        signature_name: Some("Grace".to_string()),
        audience: "finance influencer".to_string(),
        thread_domain: "outreach.mail".to_string(),
        models: GenerationModels::default(),
        routing: Routing::Direct,
        test_email: None,
    }
}

/// Orchestrator over a JSON store in a temp dir and a pinned clock.
pub struct Fixture {
    pub dir: TempDir,
    pub orchestrator: Orchestrator,
    pub provider: ScriptedProvider,
    pub gateway: RecordingGateway,
    pub clock: Arc<ManualClock>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_gateway(RecordingGateway::default())
    }

    pub fn with_gateway(gateway: RecordingGateway) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let provider = ScriptedProvider::default();
        let clock = Arc::new(ManualClock::new(fixed_now()));
        let orchestrator = Orchestrator::new(
            ChatClient::new(Box::new(provider.clone()), AuditSink::disabled())
                .with_clock(clock.clone()),
            Box::new(gateway.clone()),
            tracker_at(dir.path(), clock.clone()),
            settings(),
        );
        Self {
            dir,
            orchestrator,
            provider,
            gateway,
            clock,
        }
    }

    /// A second tracker over the same store file, as a later process would see it.
    pub fn reopen(&self) -> Tracker {
        tracker_at(self.dir.path(), self.clock.clone())
    }
}

pub fn tracker_at(dir: &Path, clock: Arc<ManualClock>) -> Tracker {
    Tracker::new(Box::new(JsonFileStore::open(dir)), clock)
}

/// Run the built binary with a scrubbed environment.
pub fn run_outreach(args: &[&str], env: &[(&str, &str)]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_outreach"));
    command.args(args).env_clear().env("OUTREACH_LOG", "off");
    for (key, value) in env {
        command.env(key, value);
    }
    command.output().expect("run outreach")
}
