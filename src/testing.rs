//! Scripted collaborators shared by unit tests.
use crate::chat::audit::AuditSink;
use crate::chat::{ChatClient, ChatProvider, ProviderRequest, ProviderResponse};
use crate::clock::ManualClock;
use crate::delivery::{DeliveryGateway, OutboundEmail, Routing, Sender};
use crate::lifecycle::{GenerationModels, Orchestrator, OutreachSettings, Tracker};
use crate::store::MemoryStore;
use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeZone, Utc};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

pub(crate) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 15, 4, 5)
        .single()
        .expect("valid timestamp")
}

#[derive(Default)]
struct Script {
    replies: VecDeque<Result<ProviderResponse, String>>,
    fallback: Option<String>,
    requests: Vec<ProviderRequest>,
}

/// Chat provider that answers from a queue and remembers what it was asked.
#[derive(Clone, Default)]
pub(crate) struct ScriptedProvider {
    script: Rc<RefCell<Script>>,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(&self, content: &str) -> &Self {
        self.reply_with_citations(content, &[])
    }

    pub(crate) fn reply_with_citations(&self, content: &str, citations: &[&str]) -> &Self {
        self.script.borrow_mut().replies.push_back(Ok(ProviderResponse {
            content: Some(content.to_string()),
            citations: citations.iter().map(|c| c.to_string()).collect(),
            usage: None,
        }));
        self
    }

    pub(crate) fn empty_reply(&self) -> &Self {
        self.script
            .borrow_mut()
            .replies
            .push_back(Ok(ProviderResponse::default()));
        self
    }

    pub(crate) fn fail(&self, message: &str) -> &Self {
        self.script
            .borrow_mut()
            .replies
            .push_back(Err(message.to_string()));
        self
    }

    /// Answer with `content` once the queue runs dry.
    pub(crate) fn always(&self, content: &str) -> &Self {
        self.script.borrow_mut().fallback = Some(content.to_string());
        self
    }

    pub(crate) fn requests(&self) -> Vec<ProviderRequest> {
        self.script.borrow().requests.clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.script.borrow().requests.len()
    }

    pub(crate) fn client(&self) -> ChatClient {
        self.client_with_clock(Arc::new(ManualClock::new(fixed_now())))
    }

    pub(crate) fn client_with_clock(&self, clock: Arc<ManualClock>) -> ChatClient {
        ChatClient::new(Box::new(self.clone()), AuditSink::disabled()).with_clock(clock)
    }
}

impl ChatProvider for ScriptedProvider {
    fn complete(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
        let mut script = self.script.borrow_mut();
        script.requests.push(request.clone());
        match script.replies.pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(anyhow!(message)),
            None => match &script.fallback {
                Some(content) => Ok(ProviderResponse {
                    content: Some(content.clone()),
                    ..ProviderResponse::default()
                }),
                None => Err(anyhow!("scripted provider has no reply left")),
            },
        }
    }
}

/// Gateway that records accepted messages, or rejects everything.
#[derive(Clone, Default)]
pub(crate) struct RecordingGateway {
    sent: Rc<RefCell<Vec<OutboundEmail>>>,
    reject: Rc<RefCell<bool>>,
}

impl RecordingGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn rejecting() -> Self {
        let gateway = Self::default();
        *gateway.reject.borrow_mut() = true;
        gateway
    }

    pub(crate) fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.borrow().clone()
    }
}

impl DeliveryGateway for RecordingGateway {
    fn send(&self, email: &OutboundEmail) -> Result<()> {
        if *self.reject.borrow() {
            return Err(crate::error::OutreachError::DeliveryFailure {
                recipient: email.to.clone(),
                reason: "provider returned 400".to_string(),
            }
            .into());
        }
        self.sent.borrow_mut().push(email.clone());
        Ok(())
    }
}

pub(crate) fn test_settings() -> OutreachSettings {
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
        test_email: Some("grace+test@example.com".to_string()),
    }
}

/// An orchestrator over scripted collaborators and an in-memory store.
pub(crate) struct Harness {
    pub(crate) orchestrator: Orchestrator,
    pub(crate) provider: ScriptedProvider,
    pub(crate) gateway: RecordingGateway,
    pub(crate) clock: Arc<ManualClock>,
}

pub(crate) fn harness() -> Harness {
    harness_with(RecordingGateway::new(), test_settings())
}

pub(crate) fn harness_with(gateway: RecordingGateway, settings: OutreachSettings) -> Harness {
    let provider = ScriptedProvider::new();
    let clock = Arc::new(ManualClock::new(fixed_now()));
    let tracker = Tracker::new(Box::new(MemoryStore::new()), clock.clone());
    let orchestrator = Orchestrator::new(
        provider.client_with_clock(clock.clone()),
        Box::new(gateway.clone()),
        tracker,
        settings,
    );
    Harness {
        orchestrator,
        provider,
        gateway,
        clock,
    }
}
