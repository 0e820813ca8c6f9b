//! # tessera-ref-clinic
//!
//! Clinic reference runtime for the TESSERA tamper-evident audit chain.
//!
//! Demonstrates five scenarios using mock clinic activity:
//!
//! 1. **Consent Lifecycle**: consent granted, used, withdrawn; redaction of
//!    sensitive fields before hashing.
//! 2. **Tamper Detection**: edit, forged hash, deletion, and reordering are
//!    each reported with the specific violation kind.
//! 3. **Restart Recovery**: a file-backed chain continues across a process
//!    restart and survives a failed write without a gap.
//! 4. **Access Anomaly**: forensic analysis flags an over-active account.
//! 5. **Retention Review**: per-category retention windows at future dates.
//!
//! All data is hardcoded and fictional. No external systems are contacted.

pub mod mock_data;
pub mod scenarios;
