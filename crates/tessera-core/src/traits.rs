//! Collaborator traits at the boundary of the audit chain.
//!
//! - `AuditStore`     — durable, append-only persistence (external)
//! - `KeyProvider`    — signing-key material (external keystore)
//! - `EventSanitizer` — redaction of sensitive payload fields
//!
//! The chain builder and validator are written against these traits only;
//! the crate ships reference implementations of the last two, and
//! `tessera-audit` ships reference stores.

use tessera_contracts::{
    entry::{AuditEntry, ChainTip, KeyId},
    error::{AuditResult, StoreError},
    event_data::EventData,
};

use crate::keys::SigningKey;

/// Append-only storage for audit entries.
///
/// Implementations must never reorder, filter, or rewrite entries. A
/// successful `append` is durable and happens exactly once from the
/// caller's perspective.
pub trait AuditStore: Send + Sync {
    /// Durably append one fully built entry.
    fn append(&self, entry: &AuditEntry) -> Result<(), StoreError>;

    /// Return every stored entry whose sequence number lies in
    /// `from..=to`, in stored order. Gaps are returned as they are.
    fn read_range(&self, from: u64, to: u64) -> Result<Vec<AuditEntry>, StoreError>;

    /// The tip of the last committed entry, or `None` for an empty store.
    ///
    /// Called once at startup to bootstrap the sequencer.
    fn load_tip(&self) -> Result<Option<ChainTip>, StoreError>;
}

/// Source of signing keys.
///
/// Rotation policy is the provider's concern. The chain only needs the key
/// to sign new entries with, and any historical key by id to verify old ones.
pub trait KeyProvider: Send + Sync {
    /// The key new entries are signed with.
    fn current_key(&self) -> AuditResult<SigningKey>;

    /// Look up a key by id for verification. `None` if unknown.
    fn key(&self, key_id: &KeyId) -> Option<SigningKey>;
}

/// Redacts sensitive fields from a payload before it is hashed or stored.
pub trait EventSanitizer: Send + Sync {
    fn sanitize(&self, data: EventData) -> EventData;
}
