//! Scenario 3: Restart Recovery
//!
//! The chain lives in a JSON-lines file. A first process appends entries and
//! exits; a second process bootstraps its sequencer from the file's last
//! entry and continues the same chain. Midway, the store rejects a write:
//! the tip does not move and the retry lands on the same sequence number,
//! so the file stays gap-free.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::info;

use tessera_audit::{ChainValidator, JsonlAuditStore};
use tessera_contracts::{
    entry::{AuditEntry, ChainTip, EntryId},
    error::{AuditError, AuditResult, StoreError},
    validation::ChainAnchor,
};
use tessera_core::{traits::AuditStore, ChainBuilder};

use crate::mock_data::{self, STAFF};
use crate::scenarios::{print_entries, print_validation, short};

/// Wraps a store and rejects writes once armed with `fail_next`.
struct FlakyStore {
    inner: Arc<JsonlAuditStore>,
    failures_left: AtomicUsize,
}

impl FlakyStore {
    fn new(inner: Arc<JsonlAuditStore>) -> Self {
        Self {
            inner,
            failures_left: AtomicUsize::new(0),
        }
    }

    /// Reject the next `n` writes.
    fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }
}

impl AuditStore for FlakyStore {
    fn append(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        let tripped = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if tripped {
            return Err(StoreError::Write {
                reason: "disk quota exceeded (simulated)".to_string(),
            });
        }
        self.inner.append(entry)
    }

    fn read_range(&self, from: u64, to: u64) -> Result<Vec<AuditEntry>, StoreError> {
        self.inner.read_range(from, to)
    }

    fn load_tip(&self) -> Result<Option<ChainTip>, StoreError> {
        self.inner.load_tip()
    }
}

pub fn run_scenario() -> AuditResult<()> {
    let path = std::env::temp_dir().join(format!("tessera-restart-{}.jsonl", EntryId::new()));
    let result = run_with_log(&path);
    if let Err(e) = std::fs::remove_file(&path) {
        info!(path = %path.display(), error = %e, "scenario log not removed");
    }
    result
}

fn run_with_log(path: &Path) -> AuditResult<()> {
    println!("=== Scenario 3: Restart Recovery ===");
    println!();
    println!("  Log file: {}", path.display());

    let keys = mock_data::demo_key_ring()?;
    let [(doctor, doctor_ip), _, (nurse, nurse_ip), _] = STAFF;

    // ── Process 1 ─────────────────────────────────────────────────────────────
    {
        let store = Arc::new(JsonlAuditStore::open(path)?);
        let builder = ChainBuilder::bootstrap(store, keys.clone())?;
        builder.append(mock_data::user_login(doctor, doctor_ip))?;
        builder.append(mock_data::record_access(doctor, doctor_ip, "patient-1893"))?;
        builder.append(mock_data::prescription_created(
            doctor,
            doctor_ip,
            "patient-1893",
            "losartan 50mg",
        ))?;
        let tip = builder.tip()?;
        println!(
            "  Process 1 exits at tip:   sequence {} hash {}..",
            tip.sequence_number,
            short(&tip.content_hash)
        );
    }

    // ── Process 2 ─────────────────────────────────────────────────────────────
    let store = Arc::new(JsonlAuditStore::open(path)?);
    let flaky = Arc::new(FlakyStore::new(store.clone()));
    let builder = ChainBuilder::bootstrap(flaky.clone(), keys.clone())?;
    let resumed = builder.tip()?;
    println!(
        "  Process 2 resumes at tip: sequence {} hash {}..",
        resumed.sequence_number,
        short(&resumed.content_hash)
    );

    builder.append(mock_data::user_login(nurse, nurse_ip))?;

    let event = || mock_data::record_access(nurse, nurse_ip, "patient-2204");
    flaky.fail_next(1);
    match builder.append(event()) {
        Err(AuditError::StoreWrite {
            sequence_number,
            reason,
        }) => {
            println!(
                "  Write of sequence {} failed: {} (tip still {})",
                sequence_number,
                reason,
                builder.tip()?.sequence_number
            );
        }
        Err(e) => return Err(e),
        Ok(entry) => println!("  Unexpectedly stored sequence {}", entry.sequence_number),
    }
    let retried = builder.append(event())?;
    println!("  Retry stored as sequence: {}", retried.sequence_number);
    println!();

    let records = store.records()?;
    let entries = store.read_range(1, u64::MAX).map_err(|e| AuditError::StoreRead {
        reason: e.to_string(),
    })?;
    println!("  Chain on disk ({} entries):", entries.len());
    print_entries(&entries);
    println!();

    let validation = ChainValidator::new(keys).validate_records(&records, Some(&ChainAnchor::Genesis));
    print_validation("Chain validation:", &validation);
    println!(
        "  RESULT: {}",
        if validation.is_valid && retried.sequence_number == resumed.sequence_number + 2 {
            "chain continued across restart without gaps (expected)"
        } else {
            "UNEXPECTED gap or fork after restart"
        }
    );
    println!();
    Ok(())
}
