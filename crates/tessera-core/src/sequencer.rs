//! The sequencer: sole owner of the chain tip.
//!
//! `next()` hands out a `Slot` holding the sequencer's lock, so the pair
//! `(sequence_number, previous_hash)` it exposes cannot be observed by any
//! other caller until the slot is committed or dropped. Committing advances
//! the tip; dropping leaves it unchanged, and the next caller receives the
//! same slot.

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info};

use tessera_contracts::{
    entry::ChainTip,
    error::{AuditError, AuditResult},
};

use crate::traits::AuditStore;

/// Issues sequence numbers and tracks the last committed content hash.
#[derive(Debug)]
pub struct Sequencer {
    tip: Mutex<ChainTip>,
}

impl Sequencer {
    /// A sequencer for an empty chain.
    pub fn new() -> Self {
        Self::from_tip(ChainTip::genesis())
    }

    /// Resume from a known tip.
    pub fn from_tip(tip: ChainTip) -> Self {
        Self {
            tip: Mutex::new(tip),
        }
    }

    /// Initialize the tip from the last committed entry in `store`.
    ///
    /// An empty store yields the genesis tip. A store that cannot report
    /// its tip is fatal: appending from a guessed tip would fork the chain.
    pub fn bootstrap(store: &dyn AuditStore) -> AuditResult<Self> {
        let tip = store
            .load_tip()
            .map_err(|e| AuditError::Sequencing {
                reason: format!("could not load chain tip from store: {}", e),
            })?
            .unwrap_or_else(ChainTip::genesis);

        info!(
            sequence_number = tip.sequence_number,
            content_hash = %tip.content_hash,
            "sequencer bootstrapped"
        );

        Ok(Self::from_tip(tip))
    }

    /// Reserve the next slot.
    ///
    /// Blocks while another slot is outstanding.
    pub fn next(&self) -> AuditResult<Slot<'_>> {
        let guard = self.tip.lock().map_err(|e| AuditError::Sequencing {
            reason: format!("sequencer lock poisoned: {}", e),
        })?;

        let sequence_number =
            guard
                .sequence_number
                .checked_add(1)
                .ok_or_else(|| AuditError::Sequencing {
                    reason: "sequence number space exhausted".to_string(),
                })?;

        debug!(sequence_number, "slot reserved");

        Ok(Slot {
            guard,
            sequence_number,
        })
    }

    /// Snapshot of the current tip.
    pub fn tip(&self) -> AuditResult<ChainTip> {
        self.tip
            .lock()
            .map(|tip| tip.clone())
            .map_err(|e| AuditError::Sequencing {
                reason: format!("sequencer lock poisoned: {}", e),
            })
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

/// An exclusive reservation of the next position in the chain.
#[must_use = "dropping a slot without committing leaves the tip unchanged"]
pub struct Slot<'a> {
    guard: MutexGuard<'a, ChainTip>,
    sequence_number: u64,
}

impl Slot<'_> {
    /// The sequence number the new entry must carry.
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    /// The content hash the new entry must link to.
    pub fn previous_hash(&self) -> &str {
        &self.guard.content_hash
    }

    /// Advance the tip to the newly recorded entry and release the slot.
    pub fn commit(mut self, content_hash: String) -> ChainTip {
        *self.guard = ChainTip {
            sequence_number: self.sequence_number,
            content_hash,
        };
        debug!(sequence_number = self.sequence_number, "tip committed");
        self.guard.clone()
    }
}
