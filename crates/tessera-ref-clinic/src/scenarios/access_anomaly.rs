//! Scenario 4: Access Anomaly
//!
//! One night-shift account opens far more records than its colleagues, some
//! of them through break-glass access, from an address outside the clinic
//! network. The forensic analyzer, configured from the clinic's TOML,
//! flags the actor, the address, and the emergency-access rate.

use std::sync::Arc;

use tessera_audit::{ChainValidator, InMemoryAuditStore};
use tessera_contracts::{error::AuditResult, validation::ChainAnchor};
use tessera_core::ChainBuilder;
use tessera_forensics::ForensicAnalyzer;

use crate::mock_data::{self, STAFF};
use crate::scenarios::clinic_config;

const SUSPECT: &str = "enf-plantao-07";
const SUSPECT_IP: &str = "198.51.100.23";

pub fn run_scenario() -> AuditResult<()> {
    println!("=== Scenario 4: Access Anomaly ===");
    println!();

    let config = clinic_config()?;
    let keys = mock_data::demo_key_ring()?;
    let store = InMemoryAuditStore::new();
    let builder = ChainBuilder::bootstrap(Arc::new(store.clone()), keys.clone())?;

    for (actor, ip) in STAFF {
        builder.append(mock_data::record_access(actor, ip, "patient-3107"))?;
    }
    for n in 0..12 {
        let patient = format!("patient-{}", 5000 + n);
        let event = if n % 3 == 0 {
            mock_data::emergency_access(SUSPECT, SUSPECT_IP, &patient, "cardiac arrest")
        } else {
            mock_data::record_access(SUSPECT, SUSPECT_IP, &patient)
        };
        builder.append(event)?;
    }

    let entries = store.entries();
    let validation = ChainValidator::new(keys).validate_anchored(&entries, &ChainAnchor::Genesis);
    let report = ForensicAnalyzer::new(config.forensics.clone()).analyze(&entries, &validation)?;

    println!(
        "  Thresholds (config):      user x{:.1}, ip x{:.1}, emergency rate {:.0}%",
        config.forensics.user_access_multiplier,
        config.forensics.ip_access_multiplier,
        config.forensics.emergency_access_rate_threshold * 100.0
    );
    println!("  Entries analyzed:         {}", report.total_entries);
    println!("  Actor activity:");
    for (actor, count) in &report.actor_activity {
        println!("    {:<20} {}", actor, count);
    }
    println!(
        "  Emergency-access rate:    {:.1}%",
        report.compliance.emergency_access * 100.0
    );
    println!("  Anomalies:");
    for a in &report.anomalies {
        println!("    [{:?}] {}", a.kind, a.detail);
    }

    let flagged_suspect = report
        .anomalies
        .iter()
        .any(|a| a.subject.as_deref() == Some(SUSPECT));
    println!(
        "  RESULT: {}",
        if flagged_suspect && report.integrity.is_valid {
            "suspicious account flagged on an intact chain (expected)"
        } else {
            "UNEXPECTED: suspicious account not flagged"
        }
    );
    println!();
    Ok(())
}
