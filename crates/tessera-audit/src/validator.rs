//! Chain validation.
//!
//! The validator re-derives everything an entry claims about itself and
//! about its predecessor:
//!
//! 1. **Key** — `key_id` must resolve through the key provider.
//! 2. **Hash** — `content_hash` must equal the hash recomputed from the
//!    entry's core and `previous_hash`.
//! 3. **Signature** — must verify against the *recomputed* hash.
//! 4. **Link** — `previous_hash` must equal the predecessor's recomputed
//!    hash, so an edited predecessor breaks its successor too.
//! 5. **Sequence** — `sequence_number` must be the predecessor's plus one.
//!
//! Checks 4 and 5 need a predecessor: the previous entry in the batch or,
//! for the first entry, an explicit `ChainAnchor`. Scanning always runs to
//! the end of the batch.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{info, warn};

use tessera_contracts::{
    entry::{AuditEntry, ChainTip},
    validation::{ChainAnchor, ChainValidationResult, ChainViolation, StoredRecord, ViolationKind},
};
use tessera_core::{crypto, traits::KeyProvider};

/// Validates ordered batches of audit entries. Holds no mutable state.
pub struct ChainValidator {
    keys: Arc<dyn KeyProvider>,
}

enum Record<'a> {
    Entry(&'a AuditEntry),
    Malformed { line: usize, reason: &'a str },
}

impl ChainValidator {
    pub fn new(keys: Arc<dyn KeyProvider>) -> Self {
        Self { keys }
    }

    /// Validate a batch with no anchor: the first entry's link and sequence
    /// are taken on trust.
    pub fn validate(&self, entries: &[AuditEntry]) -> ChainValidationResult {
        self.scan(entries.iter().map(Record::Entry), None)
    }

    /// Validate a batch whose first entry must link to `anchor`.
    pub fn validate_anchored(
        &self,
        entries: &[AuditEntry],
        anchor: &ChainAnchor,
    ) -> ChainValidationResult {
        self.scan(entries.iter().map(Record::Entry), Some(anchor.tip()))
    }

    /// Validate records read back from a damage-tolerant store. Malformed
    /// records are reported, not skipped.
    pub fn validate_records(
        &self,
        records: &[StoredRecord],
        anchor: Option<&ChainAnchor>,
    ) -> ChainValidationResult {
        let iter = records.iter().map(|r| match r {
            StoredRecord::Entry(e) => Record::Entry(e),
            StoredRecord::Malformed { line, reason } => Record::Malformed {
                line: *line,
                reason,
            },
        });
        self.scan(iter, anchor.map(ChainAnchor::tip))
    }

    fn scan<'a>(
        &self,
        records: impl Iterator<Item = Record<'a>>,
        anchor: Option<ChainTip>,
    ) -> ChainValidationResult {
        let mut errors: Vec<ChainViolation> = Vec::new();
        let mut prev = anchor;
        let mut total = 0usize;

        for (position, record) in records.enumerate() {
            total += 1;
            match record {
                Record::Malformed { line, reason } => {
                    errors.push(ChainViolation {
                        position,
                        sequence_number: None,
                        kind: ViolationKind::MalformedEntry,
                        detail: format!("record on line {} could not be decoded: {}", line, reason),
                    });
                    // Nothing to link the successor against.
                    prev = None;
                }
                Record::Entry(entry) => {
                    let recomputed = self.check_entry(position, entry, prev.as_ref(), &mut errors);
                    prev = Some(ChainTip {
                        sequence_number: entry.sequence_number,
                        content_hash: recomputed.unwrap_or_else(|| entry.content_hash.clone()),
                    });
                }
            }
        }

        for v in &errors {
            warn!(
                position = v.position,
                sequence_number = ?v.sequence_number,
                kind = %v.kind,
                detail = %v.detail,
                "chain integrity violation"
            );
        }

        let invalid: BTreeSet<usize> = errors.iter().map(|v| v.position).collect();
        let first = errors.first();
        let result = ChainValidationResult {
            is_valid: errors.is_empty(),
            broken_at: first.and_then(|v| v.sequence_number),
            broken_at_position: first.map(|v| v.position),
            total,
            valid_count: total - invalid.len(),
            errors,
        };

        info!(
            total = result.total,
            valid = result.valid_count,
            violations = result.errors.len(),
            broken_at = ?result.broken_at,
            "chain validation complete"
        );

        result
    }

    /// Run every per-entry check, appending violations. Returns the
    /// recomputed content hash when it could be computed.
    fn check_entry(
        &self,
        position: usize,
        entry: &AuditEntry,
        prev: Option<&ChainTip>,
        errors: &mut Vec<ChainViolation>,
    ) -> Option<String> {
        let seq = entry.sequence_number;
        let mut report = |kind: ViolationKind, detail: String| {
            errors.push(ChainViolation {
                position,
                sequence_number: Some(seq),
                kind,
                detail,
            });
        };

        let core = entry.core();
        let recomputed = match crypto::content_hash(&core, &entry.previous_hash) {
            Ok(hash) => Some(hash),
            Err(e) => {
                report(
                    ViolationKind::MalformedEntry,
                    format!("content hash could not be recomputed: {}", e),
                );
                None
            }
        };

        if let Some(hash) = &recomputed {
            if *hash != entry.content_hash {
                report(
                    ViolationKind::HashMismatch,
                    format!(
                        "stored content hash {} does not match recomputed {}",
                        entry.content_hash, hash
                    ),
                );
            }
        }

        match self.keys.key(&entry.key_id) {
            None => report(
                ViolationKind::UnknownSigningKey,
                format!("signing key '{}' is not known to the key provider", entry.key_id),
            ),
            Some(key) => {
                if let Some(hash) = &recomputed {
                    match crypto::verify(&key, &core, hash, &entry.signature) {
                        Ok(true) => {}
                        Ok(false) => report(
                            ViolationKind::SignatureMismatch,
                            format!("signature does not verify under key '{}'", entry.key_id),
                        ),
                        Err(e) => report(
                            ViolationKind::SignatureMismatch,
                            format!("signature could not be checked: {}", e),
                        ),
                    }
                }
            }
        }

        if let Some(prev) = prev {
            if entry.previous_hash != prev.content_hash {
                report(
                    ViolationKind::BrokenLink,
                    format!(
                        "previous_hash {} does not match predecessor (sequence {}) hash {}",
                        entry.previous_hash, prev.sequence_number, prev.content_hash
                    ),
                );
            }
            match prev.sequence_number.checked_add(1) {
                Some(expected) if expected == seq => {}
                expected => report(
                    ViolationKind::SequenceGap,
                    format!(
                        "expected sequence {} after {}, found {}",
                        expected
                            .map(|n| n.to_string())
                            .unwrap_or_else(|| "<overflow>".to_string()),
                        prev.sequence_number,
                        seq
                    ),
                ),
            }
        }

        recomputed
    }
}
