//! Scenario 5: Retention Review
//!
//! Classifies a morning of clinic activity by retention category, then asks
//! what the policy would require at several future review dates. Entries
//! are only reported as expired; nothing is deleted, and the chain still
//! validates after every review.

use std::sync::Arc;

use chrono::{Duration, Utc};

use tessera_audit::{ChainValidator, InMemoryAuditStore};
use tessera_contracts::{error::AuditResult, validation::ChainAnchor};
use tessera_core::ChainBuilder;
use tessera_forensics::{RetentionAnalyzer, RetentionCategory};

use crate::mock_data;
use crate::scenarios::clinic_config;

/// Review dates, in years from today.
const REVIEW_YEARS: [i64; 4] = [1, 3, 6, 11];

pub fn run_scenario() -> AuditResult<()> {
    println!("=== Scenario 5: Retention Review ===");
    println!();

    let config = clinic_config()?;
    let keys = mock_data::demo_key_ring()?;
    let store = InMemoryAuditStore::new();
    let builder = ChainBuilder::bootstrap(Arc::new(store.clone()), keys.clone())?;
    for event in mock_data::routine_morning() {
        builder.append(event)?;
    }
    let [(doctor, doctor_ip), ..] = mock_data::STAFF;
    builder.append(mock_data::emergency_access(
        doctor,
        doctor_ip,
        "patient-0417",
        "unconscious on arrival",
    ))?;

    let entries = store.entries();
    let analyzer = RetentionAnalyzer::new(config.retention);

    println!("  Windows (days):");
    for category in RetentionCategory::ALL {
        println!(
            "    {:<18} {}",
            category.as_str(),
            analyzer.policy().windows.days(category)
        );
    }
    println!();

    let now = Utc::now();
    for years in REVIEW_YEARS {
        let at = now + Duration::days(365 * years);
        let report = analyzer.analyze_at(&entries, at);
        println!(
            "  Review in {:>2} year(s):     {} expired, {} retained",
            years, report.expired, report.retained
        );
        for (category, totals) in &report.categories {
            if totals.expired > 0 {
                println!(
                    "    {:<18} {}/{} past {}-day window",
                    category.as_str(),
                    totals.expired,
                    totals.total,
                    totals.window_days
                );
            }
        }
    }

    let validation = ChainValidator::new(keys).validate_anchored(&entries, &ChainAnchor::Genesis);
    println!();
    println!(
        "  Chain after reviews:      {}",
        validation.summary()
    );
    println!(
        "  RESULT: {}",
        if validation.is_valid && store.len() == entries.len() {
            "retention reported without touching the chain (expected)"
        } else {
            "UNEXPECTED: chain changed during retention review"
        }
    );
    println!();
    Ok(())
}
