//! Clinic reference scenarios.
//!
//! Each scenario wires real TESSERA components (sequencer, chain builder,
//! validator, analyzers) to mock clinic activity and demonstrates one
//! property of the audit chain.

pub mod access_anomaly;
pub mod consent_lifecycle;
pub mod restart_recovery;
pub mod retention_review;
pub mod tamper_detection;

use tessera_contracts::{
    entry::AuditEntry,
    error::AuditResult,
    validation::ChainValidationResult,
};
use tessera_forensics::AnalysisConfig;

/// Analysis configuration shipped with the reference clinic.
pub const CLINIC_ANALYSIS_CONFIG: &str = include_str!("../../config/analysis.toml");

pub fn clinic_config() -> AuditResult<AnalysisConfig> {
    AnalysisConfig::from_toml_str(CLINIC_ANALYSIS_CONFIG)
}

/// First eight characters of a hex hash.
pub(crate) fn short(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}

/// Print one line per entry: sequence, event type, actor, short hashes.
pub(crate) fn print_entries(entries: &[AuditEntry]) {
    for e in entries {
        println!(
            "    #{:<3} {:<28} {:<18} prev={}.. hash={}..",
            e.sequence_number,
            e.event_type,
            e.context.actor_id.as_deref().unwrap_or("-"),
            short(&e.previous_hash),
            short(&e.content_hash),
        );
    }
}

/// Print the summary line plus every violation.
pub(crate) fn print_validation(label: &str, result: &ChainValidationResult) {
    println!("  {:<26} {}", label, result.summary());
    for v in &result.errors {
        println!(
            "      position {:<2} seq {:<4} {:<20} {}",
            v.position,
            v.sequence_number
                .map(|s| s.to_string())
                .unwrap_or_else(|| "?".to_string()),
            v.kind.to_string(),
            v.detail
        );
    }
}
