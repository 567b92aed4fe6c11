use super::RecordStore;
use crate::record::OutreachRecord;
use anyhow::{anyhow, Result};
use std::sync::Mutex;

/// Process-local store, kept in insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<OutreachRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<OutreachRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

impl RecordStore for MemoryStore {
    fn upsert(&self, record: &OutreachRecord) -> Result<()> {
        record.validate()?;
        let mut records = self
            .records
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        match records
            .iter_mut()
            .find(|existing| existing.initial_email_id == record.initial_email_id)
        {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<OutreachRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(records.clone())
    }
}
