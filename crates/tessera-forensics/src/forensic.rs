//! Forensic analysis over a validated batch.
//!
//! `ForensicAnalyzer` never touches the entries it summarizes. Integrity is
//! taken from the caller's `ChainValidationResult`, which must describe the
//! same batch.
//!
//! Access anomalies compare each actor (or source IP) against the mean
//! count of its peers, excluding itself.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tessera_contracts::{
    entry::AuditEntry,
    error::AnalysisError,
    validation::ChainValidationResult,
};

use crate::config::ForensicThresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    ExcessiveUserAccess,
    ExcessiveIpAccess,
    ExcessiveEmergencyAccess,
    ChainIntegrityViolation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    /// Actor id or source IP; `None` for batch-wide anomalies.
    pub subject: Option<String>,
    pub observed: f64,
    pub threshold: f64,
    pub detail: String,
}

/// Fraction of entries with each compliance flag set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRates {
    pub data_protection_compliant: f64,
    pub access_control_enforced: f64,
    pub consent_validated: f64,
    pub emergency_access: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegritySummary {
    pub is_valid: bool,
    pub broken_at: Option<u64>,
    pub valid_count: usize,
    pub violation_count: usize,
    /// Violations per kind, keyed by the kind's display name.
    pub violations_by_kind: BTreeMap<String, usize>,
}

impl From<&ChainValidationResult> for IntegritySummary {
    fn from(v: &ChainValidationResult) -> Self {
        let mut violations_by_kind = BTreeMap::new();
        for e in &v.errors {
            *violations_by_kind.entry(e.kind.to_string()).or_insert(0) += 1;
        }
        Self {
            is_valid: v.is_valid,
            broken_at: v.broken_at,
            valid_count: v.valid_count,
            violation_count: v.errors.len(),
            violations_by_kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForensicReport {
    pub total_entries: usize,
    pub first_sequence: u64,
    pub last_sequence: u64,
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
    pub event_types: BTreeMap<String, usize>,
    pub actor_activity: BTreeMap<String, usize>,
    pub ip_activity: BTreeMap<String, usize>,
    pub compliance: ComplianceRates,
    pub integrity: IntegritySummary,
    pub anomalies: Vec<Anomaly>,
}

impl ForensicReport {
    pub fn has_anomaly(&self, kind: AnomalyKind) -> bool {
        self.anomalies.iter().any(|a| a.kind == kind)
    }

    pub fn anomalies_of(&self, kind: AnomalyKind) -> impl Iterator<Item = &Anomaly> {
        self.anomalies.iter().filter(move |a| a.kind == kind)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ForensicAnalyzer {
    thresholds: ForensicThresholds,
}

impl ForensicAnalyzer {
    pub fn new(thresholds: ForensicThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ForensicThresholds {
        &self.thresholds
    }

    /// Summarize `entries` and flag anomalies.
    ///
    /// Fails with `EmptyBatch` when there is nothing to analyze and with
    /// `BatchMismatch` when `validation` was computed over a different
    /// number of records.
    pub fn analyze(
        &self,
        entries: &[AuditEntry],
        validation: &ChainValidationResult,
    ) -> Result<ForensicReport, AnalysisError> {
        let first = entries.first().ok_or(AnalysisError::EmptyBatch)?;
        if validation.total != entries.len() {
            return Err(AnalysisError::BatchMismatch {
                entries: entries.len(),
                validated: validation.total,
            });
        }

        let mut event_types = BTreeMap::new();
        let mut actor_activity = BTreeMap::new();
        let mut ip_activity = BTreeMap::new();
        let mut flags = [0usize; 4];
        let (mut first_sequence, mut last_sequence) = (first.sequence_number, first.sequence_number);
        let (mut earliest, mut latest) = (first.timestamp, first.timestamp);

        for e in entries {
            *event_types.entry(e.event_type.clone()).or_insert(0) += 1;
            if let Some(actor) = &e.context.actor_id {
                *actor_activity.entry(actor.clone()).or_insert(0) += 1;
            }
            if let Some(ip) = &e.context.source_ip {
                *ip_activity.entry(ip.clone()).or_insert(0) += 1;
            }

            let f = &e.compliance_flags;
            for (slot, set) in flags.iter_mut().zip([
                f.data_protection_compliant,
                f.access_control_enforced,
                f.consent_validated,
                f.emergency_access,
            ]) {
                *slot += usize::from(set);
            }

            first_sequence = first_sequence.min(e.sequence_number);
            last_sequence = last_sequence.max(e.sequence_number);
            earliest = earliest.min(e.timestamp);
            latest = latest.max(e.timestamp);
        }

        let total = entries.len() as f64;
        let compliance = ComplianceRates {
            data_protection_compliant: flags[0] as f64 / total,
            access_control_enforced: flags[1] as f64 / total,
            consent_validated: flags[2] as f64 / total,
            emergency_access: flags[3] as f64 / total,
        };

        let mut anomalies = Vec::new();
        anomalies.extend(excessive_access(
            &actor_activity,
            self.thresholds.user_access_multiplier,
            AnomalyKind::ExcessiveUserAccess,
            "actor",
        ));
        anomalies.extend(excessive_access(
            &ip_activity,
            self.thresholds.ip_access_multiplier,
            AnomalyKind::ExcessiveIpAccess,
            "source IP",
        ));

        let emergency_threshold = self.thresholds.emergency_access_rate_threshold;
        if compliance.emergency_access > emergency_threshold {
            anomalies.push(Anomaly {
                kind: AnomalyKind::ExcessiveEmergencyAccess,
                subject: None,
                observed: compliance.emergency_access,
                threshold: emergency_threshold,
                detail: format!(
                    "{} of {} entries ({:.1}%) used emergency access; threshold is {:.1}%",
                    flags[3],
                    entries.len(),
                    compliance.emergency_access * 100.0,
                    emergency_threshold * 100.0
                ),
            });
        }

        if !validation.is_valid {
            anomalies.push(Anomaly {
                kind: AnomalyKind::ChainIntegrityViolation,
                subject: None,
                observed: validation.errors.len() as f64,
                threshold: 0.0,
                detail: validation.summary(),
            });
        }

        for a in &anomalies {
            warn!(
                kind = ?a.kind,
                subject = a.subject.as_deref().unwrap_or("-"),
                observed = a.observed,
                threshold = a.threshold,
                "forensic anomaly"
            );
        }

        let report = ForensicReport {
            total_entries: entries.len(),
            first_sequence,
            last_sequence,
            earliest,
            latest,
            event_types,
            actor_activity,
            ip_activity,
            compliance,
            integrity: IntegritySummary::from(validation),
            anomalies,
        };

        info!(
            entries = report.total_entries,
            actors = report.actor_activity.len(),
            anomalies = report.anomalies.len(),
            chain_valid = report.integrity.is_valid,
            "forensic analysis complete"
        );

        Ok(report)
    }
}

/// Flag every key whose count exceeds `multiplier` times the mean count of
/// the other keys. A lone key has no peers and is never flagged.
fn excessive_access(
    counts: &BTreeMap<String, usize>,
    multiplier: f64,
    kind: AnomalyKind,
    noun: &str,
) -> Vec<Anomaly> {
    if counts.len() < 2 {
        return Vec::new();
    }
    let sum: usize = counts.values().sum();
    let peers = (counts.len() - 1) as f64;

    counts
        .iter()
        .filter_map(|(subject, &count)| {
            let peer_mean = (sum - count) as f64 / peers;
            let threshold = multiplier * peer_mean;
            (count as f64 > threshold).then(|| Anomaly {
                kind,
                subject: Some(subject.clone()),
                observed: count as f64,
                threshold,
                detail: format!(
                    "{} '{}' has {} entries; peer mean is {:.2} (limit {:.2})",
                    noun, subject, count, peer_mean, threshold
                ),
            })
        })
        .collect()
}
