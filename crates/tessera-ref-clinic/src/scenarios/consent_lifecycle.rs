//! Scenario 1: Consent Lifecycle
//!
//! A patient is registered, grants consent, is seen, then withdraws consent.
//! A later access attempt is recorded as denied. The whole history lands in
//! one chain and verifies end to end; sensitive fields (password, CPF) are
//! redacted before they are hashed.

use std::sync::Arc;

use tessera_audit::{ChainValidator, InMemoryAuditStore};
use tessera_contracts::{error::AuditResult, event_data::EventValue, validation::ChainAnchor};
use tessera_core::{sanitize::REDACTED, ChainBuilder};
use tessera_forensics::RetentionAnalyzer;

use crate::mock_data::{self, STAFF};
use crate::scenarios::{clinic_config, print_entries, print_validation};

pub fn run_scenario() -> AuditResult<()> {
    println!("=== Scenario 1: Consent Lifecycle ===");
    println!();

    let keys = mock_data::demo_key_ring()?;
    let store = InMemoryAuditStore::new();
    let builder = ChainBuilder::bootstrap(Arc::new(store.clone()), keys.clone())?;

    let [(doctor, doctor_ip), _, _, (desk, desk_ip)] = STAFF;
    let patient = "patient-4410";

    for event in [
        mock_data::user_login(desk, desk_ip),
        mock_data::patient_registered(desk, desk_ip, patient),
        mock_data::consent_granted(desk, desk_ip, patient, "treatment"),
        mock_data::record_access(doctor, doctor_ip, patient),
        mock_data::consent_withdrawn(desk, desk_ip, patient, "treatment"),
        mock_data::record_access_denied(doctor, doctor_ip, patient),
    ] {
        builder.append(event)?;
    }

    let entries = store.entries();
    println!("  Chain ({} entries):", entries.len());
    print_entries(&entries);
    println!();

    let redacted = |field: &str| {
        entries
            .iter()
            .filter_map(|e| e.event_data.get(field))
            .all(|v| *v == EventValue::Text(REDACTED.to_string()))
    };
    println!(
        "  Sensitive fields redacted:  password={} cpf={}",
        redacted("password"),
        redacted("cpf")
    );

    let validation = ChainValidator::new(keys).validate_anchored(&entries, &ChainAnchor::Genesis);
    print_validation("Chain validation:", &validation);

    let retention = RetentionAnalyzer::new(clinic_config()?.retention);
    println!("  Retention categories:");
    for e in &entries {
        println!(
            "    #{:<3} {:<28} -> {}",
            e.sequence_number,
            e.event_type,
            retention.classify(&e.event_type)
        );
    }

    println!(
        "  RESULT: {}",
        if validation.is_valid {
            "consent history intact (expected)"
        } else {
            "UNEXPECTED integrity failure"
        }
    );
    println!();
    Ok(())
}
