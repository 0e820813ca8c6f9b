//! Analysis configuration schema.
//!
//! An `AnalysisConfig` is deserialized from TOML. Every section is optional;
//! anything left out takes the default shown below.
//!
//! ```toml
//! [forensics]
//! user_access_multiplier = 3.0
//! ip_access_multiplier = 5.0
//! emergency_access_rate_threshold = 0.05
//!
//! [retention.windows]
//! emergency_access = 3650
//! patient_data = 7300
//!
//! [[retention.rules]]
//! id = "emergency"
//! category = "emergency_access"
//! patterns = ["*EMERGENCY*"]
//! ```
//!
//! Supplying any `[[retention.rules]]` replaces the default rule list
//! entirely. Rules are evaluated in declaration order and the first match
//! wins; an event type no rule matches falls into `system`.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use tessera_contracts::error::{AuditError, AuditResult};

/// Top-level structure deserialized from an analysis TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub forensics: ForensicThresholds,
    pub retention: RetentionPolicy,
}

impl AnalysisConfig {
    /// Parse `s` as TOML and validate the result.
    ///
    /// Returns `AuditError::Config` if the TOML is malformed, does not match
    /// the schema, or carries out-of-range values.
    pub fn from_toml_str(s: &str) -> AuditResult<Self> {
        let config: AnalysisConfig = toml::from_str(s).map_err(|e| AuditError::Config {
            reason: format!("failed to parse analysis TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file at `path` and parse it as analysis configuration.
    pub fn from_file(path: &Path) -> AuditResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| AuditError::Config {
            reason: format!("failed to read analysis config '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> AuditResult<()> {
        self.forensics.validate()?;
        self.retention.validate()
    }
}

// ── Forensics ─────────────────────────────────────────────────────────────────

/// Anomaly thresholds. These are deployment policy, not constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForensicThresholds {
    /// An actor is flagged when its entry count exceeds this multiple of
    /// the mean count of the other actors.
    pub user_access_multiplier: f64,

    /// Same as `user_access_multiplier`, for source IPs.
    pub ip_access_multiplier: f64,

    /// The batch is flagged when the fraction of emergency-access entries
    /// exceeds this rate. Must lie in `[0, 1]`.
    pub emergency_access_rate_threshold: f64,
}

impl Default for ForensicThresholds {
    fn default() -> Self {
        Self {
            user_access_multiplier: 3.0,
            ip_access_multiplier: 5.0,
            emergency_access_rate_threshold: 0.05,
        }
    }
}

impl ForensicThresholds {
    pub fn validate(&self) -> AuditResult<()> {
        for (name, value) in [
            ("user_access_multiplier", self.user_access_multiplier),
            ("ip_access_multiplier", self.ip_access_multiplier),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(AuditError::Config {
                    reason: format!("forensics.{} must be a positive number, got {}", name, value),
                });
            }
        }
        let rate = self.emergency_access_rate_threshold;
        if !(0.0..=1.0).contains(&rate) {
            return Err(AuditError::Config {
                reason: format!(
                    "forensics.emergency_access_rate_threshold must lie in [0, 1], got {}",
                    rate
                ),
            });
        }
        Ok(())
    }
}

// ── Retention ─────────────────────────────────────────────────────────────────

/// Retention category of an event type. Serialized in snake_case, both in
/// TOML and in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionCategory {
    EmergencyAccess,
    PatientData,
    ConsentChange,
    Financial,
    Administrative,
    System,
}

impl RetentionCategory {
    pub const ALL: [RetentionCategory; 6] = [
        RetentionCategory::EmergencyAccess,
        RetentionCategory::PatientData,
        RetentionCategory::ConsentChange,
        RetentionCategory::Financial,
        RetentionCategory::Administrative,
        RetentionCategory::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RetentionCategory::EmergencyAccess => "emergency_access",
            RetentionCategory::PatientData => "patient_data",
            RetentionCategory::ConsentChange => "consent_change",
            RetentionCategory::Financial => "financial",
            RetentionCategory::Administrative => "administrative",
            RetentionCategory::System => "system",
        }
    }
}

impl fmt::Display for RetentionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maximum age in days per category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionWindows {
    pub emergency_access: u32,
    pub patient_data: u32,
    pub consent_change: u32,
    pub financial: u32,
    pub administrative: u32,
    pub system: u32,
}

impl Default for RetentionWindows {
    fn default() -> Self {
        Self {
            emergency_access: 3650,
            patient_data: 7300,
            consent_change: 3650,
            financial: 1825,
            administrative: 2555,
            system: 730,
        }
    }
}

impl RetentionWindows {
    pub fn days(&self, category: RetentionCategory) -> u32 {
        match category {
            RetentionCategory::EmergencyAccess => self.emergency_access,
            RetentionCategory::PatientData => self.patient_data,
            RetentionCategory::ConsentChange => self.consent_change,
            RetentionCategory::Financial => self.financial,
            RetentionCategory::Administrative => self.administrative,
            RetentionCategory::System => self.system,
        }
    }
}

/// Maps event-type patterns to a category.
///
/// Pattern syntax (case-insensitive):
/// - `"*"` matches anything
/// - `"PREFIX*"`, `"*SUFFIX"`, `"*INFIX*"`
/// - anything else must match exactly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionRule {
    /// Identifier used in logs and error messages.
    pub id: String,
    pub category: RetentionCategory,
    pub patterns: Vec<String>,
}

impl RetentionRule {
    pub fn new(id: &str, category: RetentionCategory, patterns: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            category,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// True if any pattern matches `event_type`.
    pub fn matches(&self, event_type: &str) -> bool {
        self.patterns.iter().any(|p| pattern_matches(p, event_type))
    }
}

fn pattern_matches(pattern: &str, value: &str) -> bool {
    let pattern = pattern.to_ascii_uppercase();
    let value = value.to_ascii_uppercase();

    if pattern == "*" {
        return true;
    }
    match (pattern.strip_prefix('*'), pattern.strip_suffix('*')) {
        (Some(rest), Some(_)) => {
            let infix = rest.strip_suffix('*').unwrap_or(rest);
            value.contains(infix)
        }
        (Some(suffix), None) => value.ends_with(suffix),
        (None, Some(prefix)) => value.starts_with(prefix),
        (None, None) => value == pattern,
    }
}

/// Windows plus the ordered classification rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    pub windows: RetentionWindows,
    pub rules: Vec<RetentionRule>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        use RetentionCategory::*;
        Self {
            windows: RetentionWindows::default(),
            rules: vec![
                RetentionRule::new("emergency", EmergencyAccess, &["*EMERGENCY*"]),
                RetentionRule::new("consent", ConsentChange, &["*CONSENT*"]),
                RetentionRule::new(
                    "financial",
                    Financial,
                    &["*PAYMENT*", "*BILLING*", "*INVOICE*", "*FINANCIAL*"],
                ),
                RetentionRule::new(
                    "patient-data",
                    PatientData,
                    &["PATIENT_*", "*MEDICAL_RECORD*", "*PRESCRIPTION*", "*CLINICAL*"],
                ),
                RetentionRule::new(
                    "administrative",
                    Administrative,
                    &["USER_*", "ROLE_*", "*PERMISSION*", "*SETTINGS*", "ADMIN_*"],
                ),
            ],
        }
    }
}

impl RetentionPolicy {
    /// Category of `event_type`: the first matching rule, else `System`.
    pub fn classify(&self, event_type: &str) -> RetentionCategory {
        self.rules
            .iter()
            .find(|r| r.matches(event_type))
            .map(|r| r.category)
            .unwrap_or(RetentionCategory::System)
    }

    pub fn validate(&self) -> AuditResult<()> {
        for category in RetentionCategory::ALL {
            if self.windows.days(category) == 0 {
                return Err(AuditError::Config {
                    reason: format!("retention.windows.{} must be at least 1 day", category),
                });
            }
        }
        for rule in &self.rules {
            if rule.patterns.is_empty() || rule.patterns.iter().any(|p| p.trim().is_empty()) {
                return Err(AuditError::Config {
                    reason: format!("retention rule '{}' has an empty pattern list or pattern", rule.id),
                });
            }
        }
        Ok(())
    }
}
