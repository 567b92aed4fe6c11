//! Cold outreach with LM-drafted emails and tracked follow-ups.
//!
//! The [`lifecycle::Orchestrator`] drafts content through a [`chat::ChatClient`],
//! repairs it until it carries a `<body>` envelope, hands it to a
//! [`delivery::DeliveryGateway`] and records the result in a
//! [`store::RecordStore`]. The [`workflow`] module holds the operator loops
//! the `outreach` binary exposes.
pub mod app;
pub mod chat;
pub mod cli;
pub mod clock;
pub mod config;
pub mod content;
pub mod delivery;
pub mod error;
pub mod lifecycle;
pub mod record;
pub mod store;
pub mod templates;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;
