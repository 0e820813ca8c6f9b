//! Audit entry types.
//!
//! `AuditEntry` is the immutable unit of history. It carries the core fields
//! supplied at creation plus the three derived fields (`previous_hash`,
//! `content_hash`, `signature`) that link it into the chain. Callers never
//! supply derived fields: they hand a `NewAuditEvent` to the chain builder.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event_data::{EventData, EventValue};

/// Unique identifier of one audit entry. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub uuid::Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifies the signing key that produced an entry's signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyId(pub String);

impl KeyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compliance booleans fixed at creation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceFlags {
    /// The event handled personal data according to data-protection rules.
    pub data_protection_compliant: bool,
    /// Access control was enforced for the action being recorded.
    pub access_control_enforced: bool,
    /// Patient consent was checked and valid.
    pub consent_validated: bool,
    /// The action used an emergency ("break-glass") override.
    pub emergency_access: bool,
}

impl ComplianceFlags {
    /// Flags for a routine, fully compliant access.
    pub fn compliant() -> Self {
        Self {
            data_protection_compliant: true,
            access_control_enforced: true,
            consent_validated: true,
            emergency_access: false,
        }
    }

    /// Flags for a break-glass access: access control and consent bypassed.
    pub fn emergency() -> Self {
        Self {
            data_protection_compliant: true,
            access_control_enforced: false,
            consent_validated: false,
            emergency_access: true,
        }
    }
}

/// Who did it, from where. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditContext {
    pub actor_id: Option<String>,
    pub tenant_id: Option<String>,
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
    pub session_id: Option<String>,
}

impl AuditContext {
    pub fn for_actor(actor_id: impl Into<String>) -> Self {
        Self {
            actor_id: Some(actor_id.into()),
            ..Self::default()
        }
    }

    pub fn tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn source_ip(mut self, ip: impl Into<String>) -> Self {
        self.source_ip = Some(ip.into());
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// A single entry in the hash chain.
///
/// Modifying any field invalidates `content_hash`, `signature`, or the
/// `previous_hash` link of the successor; the chain validator reports which.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: EntryId,
    pub timestamp: DateTime<Utc>,

    /// Position in the chain. The first entry is 1.
    pub sequence_number: u64,

    /// Category tag, e.g. `PATIENT_DATA_ACCESS` or `CONSENT_WITHDRAWN`.
    pub event_type: String,

    /// Sanitized payload.
    pub event_data: EventData,

    pub context: AuditContext,
    pub compliance_flags: ComplianceFlags,

    /// The key that produced `signature`.
    pub key_id: KeyId,

    /// `content_hash` of the entry at `sequence_number - 1`, or
    /// `GENESIS_HASH` for the first entry.
    pub previous_hash: String,

    /// SHA-256 (hex) over the canonical core bytes followed by `previous_hash`.
    pub content_hash: String,

    /// HMAC-SHA256 (hex) over the canonical core bytes followed by
    /// `content_hash`.
    pub signature: String,
}

impl AuditEntry {
    /// The sentinel `previous_hash` of the first entry in every chain.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";

    /// Borrow the fields covered by the content hash and signature.
    pub fn core(&self) -> EntryCore<'_> {
        EntryCore {
            id: &self.id,
            timestamp: &self.timestamp,
            sequence_number: self.sequence_number,
            event_type: &self.event_type,
            event_data: &self.event_data,
            context: &self.context,
            compliance_flags: &self.compliance_flags,
            key_id: &self.key_id,
        }
    }

    /// The tip this entry establishes once committed.
    pub fn tip(&self) -> ChainTip {
        ChainTip {
            sequence_number: self.sequence_number,
            content_hash: self.content_hash.clone(),
        }
    }
}

/// Borrowed view of an entry's core fields: everything except the three
/// derived hash/signature fields.
#[derive(Debug, Clone, Copy)]
pub struct EntryCore<'a> {
    pub id: &'a EntryId,
    pub timestamp: &'a DateTime<Utc>,
    pub sequence_number: u64,
    pub event_type: &'a str,
    pub event_data: &'a EventData,
    pub context: &'a AuditContext,
    pub compliance_flags: &'a ComplianceFlags,
    pub key_id: &'a KeyId,
}

/// The most recently committed position of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTip {
    pub sequence_number: u64,
    pub content_hash: String,
}

impl ChainTip {
    /// The tip of a chain with no entries: sequence 0, genesis hash.
    pub fn genesis() -> Self {
        Self {
            sequence_number: 0,
            content_hash: AuditEntry::GENESIS_HASH.to_string(),
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.sequence_number == 0
    }
}

/// Caller-supplied description of an event to append.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEvent {
    pub event_type: String,
    pub event_data: EventData,
    pub context: AuditContext,
    pub compliance_flags: ComplianceFlags,
}

impl NewAuditEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            event_data: EventData::new(),
            context: AuditContext::default(),
            compliance_flags: ComplianceFlags::default(),
        }
    }

    pub fn data(mut self, event_data: EventData) -> Self {
        self.event_data = event_data;
        self
    }

    /// Add a single payload field.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<EventValue>) -> Self {
        self.event_data.insert(key, value);
        self
    }

    pub fn context(mut self, context: AuditContext) -> Self {
        self.context = context;
        self
    }

    pub fn flags(mut self, flags: ComplianceFlags) -> Self {
        self.compliance_flags = flags;
        self
    }
}
