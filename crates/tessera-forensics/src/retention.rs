//! Retention review.
//!
//! Reports what the retention policy would require for each entry. Nothing
//! is deleted or archived here; acting on the report is someone else's job.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tessera_contracts::entry::{AuditEntry, EntryId};

use crate::config::{RetentionCategory, RetentionPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionStatus {
    Retained,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionDecision {
    pub entry_id: EntryId,
    pub sequence_number: u64,
    pub event_type: String,
    pub category: RetentionCategory,
    /// Whole days since the entry's timestamp. Future timestamps count as 0.
    pub age_days: u64,
    pub window_days: u32,
    pub status: RetentionStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub window_days: u32,
    pub total: usize,
    pub expired: usize,
    pub retained: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionReport {
    pub evaluated_at: DateTime<Utc>,
    pub total: usize,
    pub expired: usize,
    pub retained: usize,
    /// Only categories that occur in the batch.
    pub categories: BTreeMap<RetentionCategory, CategoryTotals>,
    pub decisions: Vec<RetentionDecision>,
}

impl RetentionReport {
    pub fn expired_entries(&self) -> impl Iterator<Item = &RetentionDecision> {
        self.decisions
            .iter()
            .filter(|d| d.status == RetentionStatus::Expired)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RetentionAnalyzer {
    policy: RetentionPolicy,
}

impl RetentionAnalyzer {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    pub fn classify(&self, event_type: &str) -> RetentionCategory {
        self.policy.classify(event_type)
    }

    /// Review `entries` as of the current time.
    pub fn analyze(&self, entries: &[AuditEntry]) -> RetentionReport {
        self.analyze_at(entries, Utc::now())
    }

    /// Review `entries` as of `now`. An entry is expired when its age in
    /// whole days is strictly greater than its category's window.
    pub fn analyze_at(&self, entries: &[AuditEntry], now: DateTime<Utc>) -> RetentionReport {
        let mut categories: BTreeMap<RetentionCategory, CategoryTotals> = BTreeMap::new();
        let mut decisions = Vec::with_capacity(entries.len());

        for entry in entries {
            let category = self.classify(&entry.event_type);
            let window_days = self.policy.windows.days(category);
            let age_days = u64::try_from((now - entry.timestamp).num_days()).unwrap_or(0);
            let status = if age_days > u64::from(window_days) {
                RetentionStatus::Expired
            } else {
                RetentionStatus::Retained
            };

            let totals = categories.entry(category).or_insert_with(|| CategoryTotals {
                window_days,
                ..CategoryTotals::default()
            });
            totals.total += 1;
            match status {
                RetentionStatus::Expired => totals.expired += 1,
                RetentionStatus::Retained => totals.retained += 1,
            }

            debug!(
                sequence_number = entry.sequence_number,
                category = %category,
                age_days,
                window_days,
                status = ?status,
                "retention decision"
            );

            decisions.push(RetentionDecision {
                entry_id: entry.id,
                sequence_number: entry.sequence_number,
                event_type: entry.event_type.clone(),
                category,
                age_days,
                window_days,
                status,
            });
        }

        let expired = decisions
            .iter()
            .filter(|d| d.status == RetentionStatus::Expired)
            .count();
        let report = RetentionReport {
            evaluated_at: now,
            total: decisions.len(),
            expired,
            retained: decisions.len() - expired,
            categories,
            decisions,
        };

        info!(
            total = report.total,
            expired = report.expired,
            retained = report.retained,
            "retention review complete"
        );

        report
    }
}
