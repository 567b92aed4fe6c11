//! Chat audit log.
//!
//! Every chat call is appended to `chat_log.jsonl` as one JSON line:
//!
//! ```jsonl
//! {"schema_version":1,"ts":1792163045000,"kind":"chat","prompt_name":"Cold Outreach","model":"...","duration_ms":4200,...}
//! ```
//!
//! Writes happen on a dedicated thread fed through a channel. A failed write
//! is reported with `tracing::warn!` and never reaches the chat caller.
use super::{ProviderRequest, ProviderResponse};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current schema version for chat_log.jsonl entries.
pub const CHAT_LOG_SCHEMA_VERSION: u32 = 1;

pub const CHAT_LOG_FILE: &str = "chat_log.jsonl";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatLogKind {
    Chat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatLogEntry {
    pub schema_version: u32,
    /// Unix timestamp in milliseconds when the entry was written.
    pub ts: u64,
    pub kind: ChatLogKind,
    pub prompt_name: String,
    pub model: String,
    pub duration_ms: u64,
    pub request: Value,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl ChatLogEntry {
    pub fn completed(
        request: &ProviderRequest,
        response: &ProviderResponse,
        duration: Duration,
    ) -> Self {
        let mut entry = Self::base(request, duration);
        entry.response = serde_json::to_value(response).ok();
        entry
    }

    pub fn failed(request: &ProviderRequest, error: &anyhow::Error, duration: Duration) -> Self {
        let mut entry = Self::base(request, duration);
        entry.error = Some(format!("{error:#}"));
        entry
    }

    fn base(request: &ProviderRequest, duration: Duration) -> Self {
        Self {
            schema_version: CHAT_LOG_SCHEMA_VERSION,
            ts: now_epoch_ms(),
            kind: ChatLogKind::Chat,
            prompt_name: request.prompt_name.clone(),
            model: request.model.clone(),
            duration_ms: duration.as_millis() as u64,
            request: serde_json::to_value(request).unwrap_or(Value::Null),
            response: None,
            error: None,
        }
    }
}

/// Handle to the background log writer.
pub struct AuditSink {
    sender: Option<Sender<ChatLogEntry>>,
    writer: Option<JoinHandle<()>>,
}

impl AuditSink {
    /// Start a writer thread appending to `path`.
    pub fn spawn(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let (sender, receiver) = mpsc::channel::<ChatLogEntry>();
        let writer = std::thread::Builder::new()
            .name("chat-audit".to_string())
            .spawn(move || {
                for entry in receiver {
                    if let Err(err) = append_chat_log(&path, &entry) {
                        tracing::warn!(error = %format!("{err:#}"), "chat audit write failed");
                    }
                }
            })
            .context("spawn chat audit writer")?;
        Ok(Self {
            sender: Some(sender),
            writer: Some(writer),
        })
    }

    /// A sink that drops every entry.
    pub fn disabled() -> Self {
        Self {
            sender: None,
            writer: None,
        }
    }

    pub fn record(&self, entry: ChatLogEntry) {
        if let Some(sender) = &self.sender {
            if sender.send(entry).is_err() {
                tracing::warn!("chat audit writer is gone; entry dropped");
            }
        }
    }

    /// Close the channel and wait for queued entries to be written.
    pub fn shutdown(&mut self) {
        self.sender.take();
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                tracing::warn!("chat audit writer panicked");
            }
        }
    }
}

impl Drop for AuditSink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn append_chat_log(path: &Path, entry: &ChatLogEntry) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;
    let line = serde_json::to_string(entry).context("serialize chat log entry")?;
    writeln!(file, "{line}").with_context(|| format!("append {}", path.display()))?;
    Ok(())
}

/// Load all entries, skipping lines that fail to parse.
pub fn load_chat_log(path: &Path) -> Result<Vec<ChatLogEntry>> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("read line {}", line_num + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ChatLogEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                tracing::warn!(line = line_num + 1, error = %err, "skipping corrupt chat log entry");
            }
        }
    }
    Ok(entries)
}

fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatMessage;

    fn request() -> ProviderRequest {
        ProviderRequest {
            prompt_name: "Cold Outreach".to_string(),
            model: "google/gemini-2.0-flash-001".to_string(),
            messages: vec![ChatMessage::user("hi")],
            temperature: 0.0,
        }
    }

    #[test]
    fn entries_are_flushed_on_shutdown() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("logs").join(CHAT_LOG_FILE);
        let mut sink = AuditSink::spawn(path.clone()).expect("spawn sink");

        let response = ProviderResponse {
            content: Some("<body>x</body>".to_string()),
            ..ProviderResponse::default()
        };
        sink.record(ChatLogEntry::completed(
            &request(),
            &response,
            Duration::from_millis(12),
        ));
        sink.record(ChatLogEntry::failed(
            &request(),
            &anyhow::anyhow!("timed out"),
            Duration::from_millis(3),
        ));
        sink.shutdown();

        let entries = load_chat_log(&path).expect("load log");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].prompt_name, "Cold Outreach");
        assert_eq!(entries[0].duration_ms, 12);
        assert_eq!(
            entries[0].response.as_ref().expect("response")["content"],
            "<body>x</body>"
        );
        assert_eq!(entries[0].request["messages"][0]["role"], "user");
        assert_eq!(entries[1].error.as_deref(), Some("timed out"));
        assert!(entries[1].response.is_none());
    }

    #[test]
    fn corrupt_lines_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CHAT_LOG_FILE);
        let good = ChatLogEntry::failed(&request(), &anyhow::anyhow!("x"), Duration::ZERO);
        let contents = format!(
            "{}\nnot json\n\n{}\n",
            serde_json::to_string(&good).expect("serialize"),
            serde_json::to_string(&good).expect("serialize")
        );
        fs::write(&path, contents).expect("write log");

        assert_eq!(load_chat_log(&path).expect("load").len(), 2);
        assert!(load_chat_log(&dir.path().join("missing.jsonl"))
            .expect("load missing")
            .is_empty());
    }

    #[test]
    fn disabled_sink_accepts_entries() {
        let mut sink = AuditSink::disabled();
        sink.record(ChatLogEntry::failed(&request(), &anyhow::anyhow!("x"), Duration::ZERO));
        sink.shutdown();
    }
}
