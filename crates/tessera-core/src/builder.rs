//! The chain builder: the append path.
//!
//!   Sanitize → Reserve slot → Hash → Sign → Store → Commit
//!
//! The invariant is structural: the tip only moves after the store has
//! accepted the fully signed entry, and no entry is handed to the store
//! without both a content hash and a signature.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use tessera_contracts::{
    entry::{AuditEntry, ChainTip, EntryCore, EntryId, NewAuditEvent},
    error::{AuditError, AuditResult},
};

use crate::{
    crypto,
    sanitize::RedactingSanitizer,
    sequencer::Sequencer,
    traits::{AuditStore, EventSanitizer, KeyProvider},
};

/// Builds, signs, and durably appends audit entries.
///
/// One builder per chain. Share it behind an `Arc` to append from several
/// threads; appends are linearized by the sequencer.
pub struct ChainBuilder {
    sequencer: Sequencer,
    store: Arc<dyn AuditStore>,
    keys: Arc<dyn KeyProvider>,
    sanitizer: Box<dyn EventSanitizer>,
}

impl ChainBuilder {
    /// Create a builder whose tip is taken from the store's last committed
    /// entry.
    pub fn bootstrap(store: Arc<dyn AuditStore>, keys: Arc<dyn KeyProvider>) -> AuditResult<Self> {
        let sequencer = Sequencer::bootstrap(store.as_ref())?;
        Ok(Self::with_sequencer(sequencer, store, keys))
    }

    /// Create a builder around an explicitly constructed sequencer.
    pub fn with_sequencer(
        sequencer: Sequencer,
        store: Arc<dyn AuditStore>,
        keys: Arc<dyn KeyProvider>,
    ) -> Self {
        Self {
            sequencer,
            store,
            keys,
            sanitizer: Box::new(RedactingSanitizer::new()),
        }
    }

    /// Replace the default redacting sanitizer.
    pub fn with_sanitizer(mut self, sanitizer: Box<dyn EventSanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    /// The current chain tip.
    pub fn tip(&self) -> AuditResult<ChainTip> {
        self.sequencer.tip()
    }

    /// Append one event to the chain and return the stored entry.
    ///
    /// # Errors
    ///
    /// - `Sequencing` if no slot can be reserved
    /// - `Crypto` if hashing or signing fails
    /// - `StoreWrite` if the store rejects the entry
    ///
    /// In every error case the tip is unchanged and the call may be retried.
    pub fn append(&self, event: NewAuditEvent) -> AuditResult<AuditEntry> {
        let NewAuditEvent {
            event_type,
            event_data,
            context,
            compliance_flags,
        } = event;

        let event_data = self.sanitizer.sanitize(event_data);
        let key = self.keys.current_key()?;

        let slot = self.sequencer.next()?;
        let sequence_number = slot.sequence_number();
        let previous_hash = slot.previous_hash().to_string();

        let id = EntryId::new();
        let timestamp = Utc::now();
        let key_id = key.key_id().clone();

        let (content_hash, signature) = {
            let core = EntryCore {
                id: &id,
                timestamp: &timestamp,
                sequence_number,
                event_type: &event_type,
                event_data: &event_data,
                context: &context,
                compliance_flags: &compliance_flags,
                key_id: &key_id,
            };
            let content_hash = crypto::content_hash(&core, &previous_hash)?;
            let signature = crypto::sign(&key, &core, &content_hash)?;
            (content_hash, signature)
        };

        let entry = AuditEntry {
            id,
            timestamp,
            sequence_number,
            event_type,
            event_data,
            context,
            compliance_flags,
            key_id,
            previous_hash,
            content_hash,
            signature,
        };

        if let Err(e) = self.store.append(&entry) {
            warn!(
                sequence_number,
                event_type = %entry.event_type,
                error = %e,
                "store rejected audit entry; tip unchanged"
            );
            return Err(AuditError::StoreWrite {
                sequence_number,
                reason: e.to_string(),
            });
        }

        slot.commit(entry.content_hash.clone());

        debug!(
            sequence_number,
            event_type = %entry.event_type,
            entry_id = %entry.id,
            content_hash = %entry.content_hash,
            "audit entry appended"
        );

        Ok(entry)
    }
}
