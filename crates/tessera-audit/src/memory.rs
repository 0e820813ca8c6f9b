//! In-memory implementation of `AuditStore`.
//!
//! `InMemoryAuditStore` keeps entries in a `Vec` behind a `Mutex`. Clones
//! share the same storage, so a test or scenario can hand one clone to the
//! chain builder and keep another to read the chain back. Contents are lost
//! when the last clone is dropped.

use std::sync::{Arc, Mutex};

use tracing::debug;

use tessera_contracts::{
    entry::{AuditEntry, ChainTip},
    error::StoreError,
};
use tessera_core::traits::AuditStore;

#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditStore {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored entry in append order.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditStore for InMemoryAuditStore {
    fn append(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|e| StoreError::Write {
            reason: format!("store lock poisoned: {}", e),
        })?;
        entries.push(entry.clone());
        debug!(
            sequence_number = entry.sequence_number,
            stored = entries.len(),
            "entry stored in memory"
        );
        Ok(())
    }

    fn read_range(&self, from: u64, to: u64) -> Result<Vec<AuditEntry>, StoreError> {
        let entries = self.entries.lock().map_err(|e| StoreError::Read {
            reason: format!("store lock poisoned: {}", e),
        })?;
        Ok(entries
            .iter()
            .filter(|e| (from..=to).contains(&e.sequence_number))
            .cloned()
            .collect())
    }

    fn load_tip(&self) -> Result<Option<ChainTip>, StoreError> {
        let entries = self.entries.lock().map_err(|e| StoreError::Read {
            reason: format!("store lock poisoned: {}", e),
        })?;
        Ok(entries.last().map(AuditEntry::tip))
    }
}
