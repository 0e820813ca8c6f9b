//! # tessera-forensics
//!
//! Forensic and retention analysis over validated TESSERA audit chains.
//!
//! ## Overview
//!
//! - [`ForensicAnalyzer`] summarizes a batch (event-type histogram, actor and
//!   source-IP activity, compliance-flag rates, integrity) and flags
//!   anomalies against configurable thresholds.
//! - [`RetentionAnalyzer`] classifies each entry into a retention category
//!   and reports which entries have outlived their category's window.
//!
//! Both are configured from one TOML document, [`AnalysisConfig`].
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use tessera_forensics::{AnalysisConfig, ForensicAnalyzer, RetentionAnalyzer};
//!
//! let config = AnalysisConfig::from_file(Path::new("config/analysis.toml"))?;
//! let validation = validator.validate(&entries);
//! let report = ForensicAnalyzer::new(config.forensics).analyze(&entries, &validation)?;
//! let retention = RetentionAnalyzer::new(config.retention).analyze(&entries);
//! ```

pub mod config;
pub mod forensic;
pub mod retention;

pub use config::{
    AnalysisConfig, ForensicThresholds, RetentionCategory, RetentionPolicy, RetentionRule,
    RetentionWindows,
};
pub use forensic::{Anomaly, AnomalyKind, ComplianceRates, ForensicAnalyzer, ForensicReport};
pub use retention::{RetentionAnalyzer, RetentionDecision, RetentionReport, RetentionStatus};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};

    use tessera_audit::{ChainValidator, InMemoryAuditStore};
    use tessera_contracts::{
        entry::{AuditContext, AuditEntry, ComplianceFlags, NewAuditEvent},
        error::{AnalysisError, AuditError},
    };
    use tessera_core::{ChainBuilder, KeyRing, SigningKey};

    use crate::{
        AnalysisConfig, AnomalyKind, ForensicAnalyzer, RetentionAnalyzer, RetentionCategory,
        RetentionStatus,
    };

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn keys() -> Arc<KeyRing> {
        Arc::new(KeyRing::new(
            SigningKey::new("k1", b"forensics-test-key".to_vec()).unwrap(),
        ))
    }

    /// Build a chain with one entry per `(event_type, actor, ip, flags)`.
    fn chain(events: &[Event]) -> Vec<AuditEntry> {
        let store = InMemoryAuditStore::new();
        let builder = ChainBuilder::bootstrap(Arc::new(store.clone()), keys()).unwrap();
        for (event_type, actor, ip, flags) in events {
            builder
                .append(
                    NewAuditEvent::new(*event_type)
                        .context(AuditContext::for_actor(*actor).source_ip(*ip))
                        .flags(*flags),
                )
                .unwrap();
        }
        store.entries()
    }

    type Event = (&'static str, &'static str, &'static str, ComplianceFlags);

    fn access(actor: &'static str, ip: &'static str) -> Event {
        ("PATIENT_DATA_ACCESS", actor, ip, ComplianceFlags::compliant())
    }

    fn analyze(entries: &[AuditEntry]) -> crate::ForensicReport {
        let validation = ChainValidator::new(keys()).validate(entries);
        ForensicAnalyzer::default().analyze(entries, &validation).unwrap()
    }

    // ── 1. configuration ──────────────────────────────────────────────────────

    /// An empty document yields the documented defaults.
    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AnalysisConfig::from_toml_str("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.forensics.user_access_multiplier, 3.0);
        assert_eq!(config.forensics.ip_access_multiplier, 5.0);
        assert_eq!(config.forensics.emergency_access_rate_threshold, 0.05);
        assert_eq!(config.retention.windows.emergency_access, 3650);
        assert_eq!(config.retention.windows.system, 730);
    }

    /// Fields left out of a section keep their defaults.
    #[test]
    fn test_partial_override() {
        let toml = r#"
            [forensics]
            user_access_multiplier = 2.5

            [retention.windows]
            financial = 3650
        "#;

        let config = AnalysisConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.forensics.user_access_multiplier, 2.5);
        assert_eq!(config.forensics.ip_access_multiplier, 5.0);
        assert_eq!(config.retention.windows.financial, 3650);
        assert_eq!(config.retention.windows.patient_data, 7300);
        assert!(!config.retention.rules.is_empty());
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        for toml in [
            "[forensics]\nuser_access_multiplier = 0.0",
            "[forensics]\nip_access_multiplier = -1.0",
            "[forensics]\nemergency_access_rate_threshold = 1.5",
            "[retention.windows]\nsystem = 0",
            "[[retention.rules]]\nid = \"empty\"\ncategory = \"financial\"\npatterns = []",
            "[forensics]\nuser_access_multiplier = \"three\"",
        ] {
            match AnalysisConfig::from_toml_str(toml) {
                Err(AuditError::Config { .. }) => {}
                other => panic!("expected Config error for {toml:?}, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_missing_config_file_is_config_error() {
        let err = AnalysisConfig::from_file(std::path::Path::new("/nonexistent/analysis.toml"));
        assert!(matches!(err, Err(AuditError::Config { .. })));
    }

    // ── 2. classification ─────────────────────────────────────────────────────

    #[test]
    fn test_default_classification() {
        let r = RetentionAnalyzer::default();
        assert_eq!(r.classify("EMERGENCY_ACCESS_GRANTED"), RetentionCategory::EmergencyAccess);
        assert_eq!(r.classify("PATIENT_CONSENT_WITHDRAWN"), RetentionCategory::ConsentChange);
        assert_eq!(r.classify("PAYMENT_RECEIVED"), RetentionCategory::Financial);
        assert_eq!(r.classify("INVOICE_ISSUED"), RetentionCategory::Financial);
        assert_eq!(r.classify("PATIENT_DATA_ACCESS"), RetentionCategory::PatientData);
        assert_eq!(r.classify("PRESCRIPTION_CREATED"), RetentionCategory::PatientData);
        assert_eq!(r.classify("USER_LOGIN"), RetentionCategory::Administrative);
        assert_eq!(r.classify("CLINIC_SETTINGS_UPDATED"), RetentionCategory::Administrative);
        assert_eq!(r.classify("BACKUP_COMPLETED"), RetentionCategory::System);
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        let r = RetentionAnalyzer::default();
        assert_eq!(r.classify("emergency_override"), RetentionCategory::EmergencyAccess);
        assert_eq!(r.classify("patient_record_viewed"), RetentionCategory::PatientData);
    }

    /// Supplied rules replace the defaults; the first match wins.
    #[test]
    fn test_custom_rules_first_match_wins() {
        let toml = r#"
            [[retention.rules]]
            id = "lab"
            category = "patient_data"
            patterns = ["LAB_*"]

            [[retention.rules]]
            id = "results"
            category = "financial"
            patterns = ["*_RESULT"]
        "#;

        let config = AnalysisConfig::from_toml_str(toml).unwrap();
        let r = RetentionAnalyzer::new(config.retention);
        assert_eq!(r.classify("LAB_RESULT"), RetentionCategory::PatientData);
        assert_eq!(r.classify("IMAGING_RESULT"), RetentionCategory::Financial);
        assert_eq!(r.classify("EMERGENCY_ACCESS"), RetentionCategory::System);
    }

    // ── 3. retention windows ──────────────────────────────────────────────────

    /// 3651 days against a 3650-day window is expired; 3649 is retained.
    #[test]
    fn test_retention_boundary() {
        let mut entries = chain(&[
            ("EMERGENCY_ACCESS", "dr-lima", "10.0.0.1", ComplianceFlags::emergency()),
            ("EMERGENCY_ACCESS", "dr-lima", "10.0.0.1", ComplianceFlags::emergency()),
            ("EMERGENCY_ACCESS", "dr-lima", "10.0.0.1", ComplianceFlags::emergency()),
        ]);
        let now = Utc::now();
        entries[0].timestamp = now - Duration::days(3651);
        entries[1].timestamp = now - Duration::days(3649);
        entries[2].timestamp = now - Duration::days(3650);

        let report = RetentionAnalyzer::default().analyze_at(&entries, now);
        let statuses: Vec<_> = report.decisions.iter().map(|d| d.status).collect();
        assert_eq!(
            statuses,
            vec![
                RetentionStatus::Expired,
                RetentionStatus::Retained,
                RetentionStatus::Retained
            ]
        );
        assert_eq!(report.decisions[0].age_days, 3651);
        assert_eq!(report.decisions[0].window_days, 3650);
        assert_eq!(report.expired, 1);
        assert_eq!(report.expired_entries().count(), 1);
    }

    #[test]
    fn test_retention_category_totals() {
        let mut entries = chain(&[
            ("USER_LOGIN", "recepcao", "10.0.0.2", ComplianceFlags::compliant()),
            ("USER_LOGOUT", "recepcao", "10.0.0.2", ComplianceFlags::compliant()),
            ("PAYMENT_RECEIVED", "recepcao", "10.0.0.2", ComplianceFlags::compliant()),
            ("CACHE_FLUSHED", "system", "127.0.0.1", ComplianceFlags::default()),
        ]);
        let now = Utc::now();
        entries[0].timestamp = now - Duration::days(3000);
        entries[1].timestamp = now - Duration::days(10);
        entries[2].timestamp = now - Duration::days(1826);
        entries[3].timestamp = now - Duration::days(731);

        let report = RetentionAnalyzer::default().analyze_at(&entries, now);
        assert_eq!(report.total, 4);
        assert_eq!(report.expired, 3);
        assert_eq!(report.retained, 1);

        let admin = &report.categories[&RetentionCategory::Administrative];
        assert_eq!((admin.total, admin.expired, admin.retained), (2, 1, 1));
        assert_eq!(admin.window_days, 2555);
        assert_eq!(report.categories[&RetentionCategory::Financial].expired, 1);
        assert_eq!(report.categories[&RetentionCategory::System].expired, 1);
        assert!(!report.categories.contains_key(&RetentionCategory::PatientData));
    }

    #[test]
    fn test_future_timestamp_is_age_zero() {
        let mut entries = chain(&[access("dr-lima", "10.0.0.1")]);
        let now = Utc::now();
        entries[0].timestamp = now + Duration::days(30);

        let report = RetentionAnalyzer::default().analyze_at(&entries, now);
        assert_eq!(report.decisions[0].age_days, 0);
        assert_eq!(report.decisions[0].status, RetentionStatus::Retained);
    }

    #[test]
    fn test_retention_never_mutates_entries() {
        let entries = chain(&[access("dr-lima", "10.0.0.1")]);
        let before = entries.clone();
        let _ = RetentionAnalyzer::default().analyze(&entries);
        assert_eq!(entries, before);
    }

    // ── 4. anomalies ──────────────────────────────────────────────────────────

    /// One actor with 8 of 10 entries is flagged; the others are not.
    #[test]
    fn test_excessive_user_access() {
        let mut events = vec![access("dr-souza", "10.0.0.1"); 8];
        events.push(access("dr-lima", "10.0.0.2"));
        events.push(access("enf-alves", "10.0.0.3"));
        let entries = chain(&events);

        let report = analyze(&entries);
        let flagged: Vec<_> = report
            .anomalies_of(AnomalyKind::ExcessiveUserAccess)
            .map(|a| a.subject.clone())
            .collect();
        assert_eq!(flagged, vec![Some("dr-souza".to_string())]);
        assert_eq!(report.actor_activity["dr-souza"], 8);
    }

    #[test]
    fn test_balanced_activity_has_no_anomalies() {
        let events: Vec<_> = ["dr-souza", "dr-lima", "enf-alves", "recepcao"]
            .into_iter()
            .zip(["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4"])
            .flat_map(|(actor, ip)| vec![access(actor, ip); 3])
            .collect();
        let entries = chain(&events);

        let report = analyze(&entries);
        assert!(report.anomalies.is_empty(), "{:?}", report.anomalies);
        assert!(report.integrity.is_valid);
    }

    #[test]
    fn test_single_actor_has_no_peer_baseline() {
        let entries = chain(&vec![access("dr-souza", "10.0.0.1"); 5]);
        let report = analyze(&entries);
        assert!(!report.has_anomaly(AnomalyKind::ExcessiveUserAccess));
        assert!(!report.has_anomaly(AnomalyKind::ExcessiveIpAccess));
    }

    /// IPs use the higher multiplier: 4x the peer mean is not enough, 6x is.
    #[test]
    fn test_excessive_ip_access() {
        let mut events = vec![access("dr-souza", "203.0.113.9"); 4];
        events.push(access("dr-lima", "10.0.0.2"));
        events.push(access("enf-alves", "10.0.0.3"));
        let report = analyze(&chain(&events));
        assert!(!report.has_anomaly(AnomalyKind::ExcessiveIpAccess));

        events.extend(vec![access("dr-lima", "203.0.113.9"); 2]);
        let report = analyze(&chain(&events));
        let ip: Vec<_> = report.anomalies_of(AnomalyKind::ExcessiveIpAccess).collect();
        assert_eq!(ip.len(), 1);
        assert_eq!(ip[0].subject.as_deref(), Some("203.0.113.9"));
        assert_eq!(ip[0].observed, 6.0);
    }

    #[test]
    fn test_excessive_emergency_access() {
        let mut events = vec![access("dr-souza", "10.0.0.1"); 9];
        events.push(("EMERGENCY_ACCESS", "dr-lima", "10.0.0.1", ComplianceFlags::emergency()));
        let report = analyze(&chain(&events));

        assert_eq!(report.compliance.emergency_access, 0.1);
        assert!(report.has_anomaly(AnomalyKind::ExcessiveEmergencyAccess));

        let strict = AnalysisConfig::from_toml_str("[forensics]\nemergency_access_rate_threshold = 0.2")
            .unwrap();
        let entries = chain(&events);
        let validation = ChainValidator::new(keys()).validate(&entries);
        let report = ForensicAnalyzer::new(strict.forensics)
            .analyze(&entries, &validation)
            .unwrap();
        assert!(!report.has_anomaly(AnomalyKind::ExcessiveEmergencyAccess));
    }

    #[test]
    fn test_broken_chain_is_an_anomaly() {
        let mut entries = chain(&vec![access("dr-souza", "10.0.0.1"); 3]);
        entries[1].event_type = "PATIENT_DATA_EXPORT".to_string();

        let report = analyze(&entries);
        assert!(report.has_anomaly(AnomalyKind::ChainIntegrityViolation));
        assert!(!report.integrity.is_valid);
        assert_eq!(report.integrity.broken_at, Some(2));
        assert_eq!(report.integrity.violations_by_kind["hash mismatch"], 1);
        assert_eq!(report.integrity.violations_by_kind["broken link"], 1);
    }

    // ── 5. statistics ─────────────────────────────────────────────────────────

    #[test]
    fn test_histogram_and_rates() {
        let entries = chain(&[
            ("PATIENT_DATA_ACCESS", "dr-souza", "10.0.0.1", ComplianceFlags::compliant()),
            ("PATIENT_DATA_ACCESS", "dr-lima", "10.0.0.2", ComplianceFlags::compliant()),
            ("CONSENT_GRANTED", "recepcao", "10.0.0.3", ComplianceFlags::default()),
            ("USER_LOGIN", "recepcao", "10.0.0.3", ComplianceFlags::default()),
        ]);

        let report = analyze(&entries);
        assert_eq!(report.total_entries, 4);
        assert_eq!(report.event_types["PATIENT_DATA_ACCESS"], 2);
        assert_eq!(report.event_types["CONSENT_GRANTED"], 1);
        assert_eq!(report.compliance.data_protection_compliant, 0.5);
        assert_eq!(report.compliance.emergency_access, 0.0);
        assert_eq!((report.first_sequence, report.last_sequence), (1, 4));
        assert!(report.earliest <= report.latest);
    }

    // ── 6. analysis that cannot run ───────────────────────────────────────────

    #[test]
    fn test_empty_batch_is_an_error() {
        let validation = ChainValidator::new(keys()).validate(&[]);
        assert_eq!(
            ForensicAnalyzer::default().analyze(&[], &validation),
            Err(AnalysisError::EmptyBatch)
        );
    }

    #[test]
    fn test_mismatched_validation_is_an_error() {
        let entries = chain(&vec![access("dr-souza", "10.0.0.1"); 3]);
        let validation = ChainValidator::new(keys()).validate(&entries[..2]);
        assert_eq!(
            ForensicAnalyzer::default().analyze(&entries, &validation),
            Err(AnalysisError::BatchMismatch {
                entries: 3,
                validated: 2
            })
        );
    }
}
