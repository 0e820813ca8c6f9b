//! # tessera-core
//!
//! The append path of the TESSERA tamper-evident audit chain.
//!
//! This crate provides:
//! - The collaborator traits (`AuditStore`, `KeyProvider`, `EventSanitizer`)
//! - The Hasher/Signer (`crypto`)
//! - The `Sequencer` that owns the chain tip
//! - The `ChainBuilder` that wires them together in the correct order
//! - Reference collaborators: `KeyRing` and `RedactingSanitizer`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tessera_core::{ChainBuilder, KeyRing, SigningKey};
//! use tessera_contracts::NewAuditEvent;
//!
//! let keys = Arc::new(KeyRing::new(SigningKey::from_hex("k-2026-01", &secret_hex)?));
//! let builder = ChainBuilder::bootstrap(store, keys)?;
//! let entry = builder.append(NewAuditEvent::new("PATIENT_DATA_ACCESS"))?;
//! ```

pub mod builder;
pub mod crypto;
pub mod keys;
pub mod sanitize;
pub mod sequencer;
pub mod traits;

pub use builder::ChainBuilder;
pub use keys::{KeyRing, SigningKey};
pub use sanitize::RedactingSanitizer;
pub use sequencer::{Sequencer, Slot};
pub use traits::{AuditStore, EventSanitizer, KeyProvider};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;

    use tessera_contracts::{
        entry::{AuditContext, AuditEntry, ChainTip, ComplianceFlags, NewAuditEvent},
        error::{AuditError, StoreError},
        event_data::EventValue,
    };

    use super::{crypto, sanitize::REDACTED, AuditStore, ChainBuilder, KeyRing, SigningKey};

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Minimal store with a switch to make writes fail.
    #[derive(Default)]
    struct VecStore {
        entries: Mutex<Vec<AuditEntry>>,
        fail_writes: AtomicBool,
    }

    impl AuditStore for VecStore {
        fn append(&self, entry: &AuditEntry) -> Result<(), StoreError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Write {
                    reason: "simulated outage".to_string(),
                });
            }
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }

        fn read_range(&self, from: u64, to: u64) -> Result<Vec<AuditEntry>, StoreError> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.sequence_number >= from && e.sequence_number <= to)
                .cloned()
                .collect())
        }

        fn load_tip(&self) -> Result<Option<ChainTip>, StoreError> {
            Ok(self.entries.lock().unwrap().last().map(AuditEntry::tip))
        }
    }

    fn key(id: &str) -> SigningKey {
        SigningKey::new(id, format!("{}-secret-material", id).into_bytes()).unwrap()
    }

    fn builder(store: &Arc<VecStore>) -> ChainBuilder {
        ChainBuilder::bootstrap(store.clone(), Arc::new(KeyRing::new(key("k1")))).unwrap()
    }

    fn access(actor: &str, patient: &str) -> NewAuditEvent {
        NewAuditEvent::new("PATIENT_DATA_ACCESS")
            .field("patient_id", patient)
            .context(AuditContext::for_actor(actor).source_ip("10.1.0.7"))
            .flags(ComplianceFlags::compliant())
    }

    // ── Tests ─────────────────────────────────────────────────────────────────

    #[test]
    fn appended_entries_form_a_linked_chain() {
        let store = Arc::new(VecStore::default());
        let b = builder(&store);
        for i in 0..5 {
            b.append(access("dr-costa", &format!("patient-{}", i))).unwrap();
        }

        let entries = store.read_range(1, 5).unwrap();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].sequence_number, 1);
        assert_eq!(entries[0].previous_hash, AuditEntry::GENESIS_HASH);
        for i in 1..entries.len() {
            assert_eq!(entries[i].previous_hash, entries[i - 1].content_hash);
            assert_eq!(entries[i].sequence_number, entries[i - 1].sequence_number + 1);
        }
        assert_eq!(b.tip().unwrap(), entries[4].tip());
    }

    #[test]
    fn entries_verify_before_and_after_serialization() {
        let store = Arc::new(VecStore::default());
        let b = builder(&store);
        let entry = b.append(access("dr-costa", "patient-101")).unwrap();

        assert!(crypto::verify_entry(&key("k1"), &entry).unwrap());

        let json = serde_json::to_string(&entry).unwrap();
        let decoded: AuditEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, entry);
        assert!(crypto::verify_entry(&key("k1"), &decoded).unwrap());
    }

    #[test]
    fn store_failure_leaves_tip_unchanged_and_retry_reuses_slot() {
        let store = Arc::new(VecStore::default());
        let b = builder(&store);
        let first = b.append(access("dr-costa", "patient-1")).unwrap();

        store.fail_writes.store(true, Ordering::SeqCst);
        match b.append(access("dr-costa", "patient-2")) {
            Err(AuditError::StoreWrite { sequence_number, reason }) => {
                assert_eq!(sequence_number, 2);
                assert!(reason.contains("simulated outage"));
            }
            other => panic!("expected StoreWrite, got {:?}", other),
        }
        assert_eq!(b.tip().unwrap(), first.tip());

        store.fail_writes.store(false, Ordering::SeqCst);
        let retried = b.append(access("dr-costa", "patient-2")).unwrap();
        assert_eq!(retried.sequence_number, 2);
        assert_eq!(retried.previous_hash, first.content_hash);
    }

    #[test]
    fn bootstrap_continues_an_existing_chain() {
        let store = Arc::new(VecStore::default());
        {
            let b = builder(&store);
            b.append(access("dr-costa", "patient-1")).unwrap();
            b.append(access("dr-costa", "patient-2")).unwrap();
        }

        // A new process: fresh builder, same store.
        let b = builder(&store);
        let third = b.append(access("dr-costa", "patient-3")).unwrap();

        let entries = store.read_range(1, 3).unwrap();
        assert_eq!(third.sequence_number, 3);
        assert_eq!(third.previous_hash, entries[1].content_hash);
    }

    #[test]
    fn concurrent_appends_produce_gap_free_chain() {
        let store = Arc::new(VecStore::default());
        let b = Arc::new(builder(&store));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let b = Arc::clone(&b);
                thread::spawn(move || {
                    for i in 0..20 {
                        b.append(access(&format!("actor-{}", t), &format!("p-{}", i)))
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let entries = store.read_range(1, u64::MAX).unwrap();
        assert_eq!(entries.len(), 80);
        for (i, e) in entries.iter().enumerate() {
            assert_eq!(e.sequence_number, i as u64 + 1);
            if i > 0 {
                assert_eq!(e.previous_hash, entries[i - 1].content_hash);
            }
        }
    }

    #[test]
    fn sensitive_fields_are_redacted_before_hashing() {
        let store = Arc::new(VecStore::default());
        let b = builder(&store);
        let entry = b
            .append(
                NewAuditEvent::new("USER_LOGIN")
                    .field("username", "recepcao01")
                    .field("password", "hunter2"),
            )
            .unwrap();

        assert_eq!(
            entry.event_data.get("password"),
            Some(&EventValue::Text(REDACTED.to_string()))
        );
        assert!(crypto::verify_entry(&key("k1"), &entry).unwrap());
        assert!(!serde_json::to_string(&entry).unwrap().contains("hunter2"));
    }

    #[test]
    fn entries_carry_the_active_key_id() {
        let store = Arc::new(VecStore::default());
        let mut ring = KeyRing::new(key("k1"));
        ring.rotate(key("k2"));
        let b = ChainBuilder::bootstrap(store.clone(), Arc::new(ring)).unwrap();

        let entry = b.append(access("dr-costa", "patient-1")).unwrap();
        assert_eq!(entry.key_id.as_str(), "k2");
        assert!(crypto::verify_entry(&key("k2"), &entry).unwrap());
        assert!(!crypto::verify_entry(&key("k1"), &entry).unwrap());
    }

    #[test]
    fn empty_signing_secret_is_rejected() {
        assert!(matches!(
            SigningKey::new("k0", Vec::new()),
            Err(AuditError::Config { .. })
        ));
        assert!(matches!(
            SigningKey::from_hex("k0", "not-hex"),
            Err(AuditError::Config { .. })
        ));
    }

    #[test]
    fn signing_key_debug_hides_secret() {
        let dbg = format!("{:?}", key("k1"));
        assert!(dbg.contains("k1"));
        assert!(!dbg.contains("secret-material"));
    }
}
