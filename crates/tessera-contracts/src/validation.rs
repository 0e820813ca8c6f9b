//! Chain validation result types.
//!
//! Validation never fails: it always returns a `ChainValidationResult`
//! enumerating every violation it found.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entry::{AuditEntry, ChainTip};

/// What a store read yields when it tolerates damaged records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum StoredRecord {
    Entry(AuditEntry),
    /// A record that could not be decoded. `line` is 1-based.
    Malformed { line: usize, reason: String },
}

/// What the first entry of a batch must link to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainAnchor {
    /// The batch starts the chain: sequence 1, genesis `previous_hash`.
    Genesis,
    /// The batch continues from a known-good tip.
    Tip(ChainTip),
}

impl ChainAnchor {
    pub fn tip(&self) -> ChainTip {
        match self {
            ChainAnchor::Genesis => ChainTip::genesis(),
            ChainAnchor::Tip(tip) => tip.clone(),
        }
    }
}

/// The specific kind of integrity failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    /// Stored `content_hash` differs from the recomputed one.
    HashMismatch,
    /// Signature does not verify against the recomputed content hash.
    SignatureMismatch,
    /// `previous_hash` does not match the predecessor's content hash.
    BrokenLink,
    /// `sequence_number` is not predecessor + 1.
    SequenceGap,
    /// The entry names a key the key provider does not know.
    UnknownSigningKey,
    /// The record could not be decoded at all.
    MalformedEntry,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ViolationKind::HashMismatch => "hash mismatch",
            ViolationKind::SignatureMismatch => "signature mismatch",
            ViolationKind::BrokenLink => "broken link",
            ViolationKind::SequenceGap => "sequence gap",
            ViolationKind::UnknownSigningKey => "unknown signing key",
            ViolationKind::MalformedEntry => "malformed entry",
        };
        f.write_str(s)
    }
}

/// One integrity failure at one position of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainViolation {
    /// Zero-based index in the validated batch.
    pub position: usize,
    /// The entry's sequence number, when the record could be decoded.
    pub sequence_number: Option<u64>,
    pub kind: ViolationKind,
    pub detail: String,
}

/// Derived, read-only report over a validated batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainValidationResult {
    pub is_valid: bool,
    /// Sequence number of the first offending entry.
    pub broken_at: Option<u64>,
    /// Batch position of the first offending entry.
    pub broken_at_position: Option<usize>,
    pub total: usize,
    /// Entries with no violation at all.
    pub valid_count: usize,
    pub errors: Vec<ChainViolation>,
}

impl ChainValidationResult {
    /// True if `position` has a violation of `kind`.
    pub fn has_violation(&self, position: usize, kind: ViolationKind) -> bool {
        self.errors
            .iter()
            .any(|v| v.position == position && v.kind == kind)
    }

    /// All violations reported at `position`.
    pub fn violations_at(&self, position: usize) -> impl Iterator<Item = &ChainViolation> {
        self.errors.iter().filter(move |v| v.position == position)
    }

    /// One-line human-readable summary.
    pub fn summary(&self) -> String {
        if self.is_valid {
            format!("chain valid ({} entries)", self.total)
        } else {
            format!(
                "chain BROKEN at sequence {} ({} of {} entries valid, {} violation(s))",
                self.broken_at
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "?".to_string()),
                self.valid_count,
                self.total,
                self.errors.len()
            )
        }
    }
}
