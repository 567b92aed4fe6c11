use super::RecordStore;
use crate::record::OutreachRecord;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const STORE_FILE: &str = "outreach.json";
pub const STORE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    schema_version: u32,
    #[serde(default)]
    records: Vec<OutreachRecord>,
}

/// All records in one JSON document, re-read on every operation and
/// replaced atomically on every write.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store rooted at `dir`; the directory is created on first write.
    pub fn open(dir: &Path) -> Self {
        Self {
            path: dir.join(STORE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<StoreDocument> {
        if !self.path.is_file() {
            return Ok(StoreDocument {
                schema_version: STORE_SCHEMA_VERSION,
                records: Vec::new(),
            });
        }
        let bytes =
            fs::read(&self.path).with_context(|| format!("read {}", self.path.display()))?;
        let document: StoreDocument = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse {}", self.path.display()))?;
        if document.schema_version != STORE_SCHEMA_VERSION {
            return Err(anyhow!(
                "unsupported store schema_version {} in {} (expected {})",
                document.schema_version,
                self.path.display(),
                STORE_SCHEMA_VERSION
            ));
        }
        Ok(document)
    }

    fn write_document(&self, document: &StoreDocument) -> Result<()> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| anyhow!("store path {} has no parent", self.path.display()))?;
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        let mut tmp =
            NamedTempFile::new_in(dir).with_context(|| format!("stage {}", self.path.display()))?;
        let bytes = serde_json::to_vec_pretty(document).context("serialize outreach store")?;
        tmp.write_all(&bytes)
            .with_context(|| format!("stage {}", self.path.display()))?;
        tmp.persist(&self.path)
            .map_err(|err| err.error)
            .with_context(|| format!("publish {}", self.path.display()))?;
        Ok(())
    }
}

impl RecordStore for JsonFileStore {
    fn upsert(&self, record: &OutreachRecord) -> Result<()> {
        record.validate()?;
        let mut document = self.read_document()?;
        match document
            .records
            .iter_mut()
            .find(|existing| existing.initial_email_id == record.initial_email_id)
        {
            Some(existing) => *existing = record.clone(),
            None => document.records.push(record.clone()),
        }
        self.write_document(&document)
    }

    fn load_all(&self) -> Result<Vec<OutreachRecord>> {
        Ok(self.read_document()?.records)
    }
}
