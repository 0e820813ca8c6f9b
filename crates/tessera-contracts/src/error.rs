//! Error taxonomy for the TESSERA audit chain.
//!
//! Append-path failures (`AuditError`) abort a single append and surface to
//! the caller. Store collaborators report `StoreError`. Analysis that cannot
//! run reports `AnalysisError`. Chain integrity problems are never errors:
//! they are returned as data inside `ChainValidationResult`.

use thiserror::Error;

/// The unified error type for the append path and configuration.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The chain tip could not be established or advanced.
    ///
    /// Fatal to startup when raised during bootstrap.
    #[error("sequencing error: {reason}")]
    Sequencing { reason: String },

    /// Hashing or signing failed. No entry may be stored without both.
    #[error("cryptographic error: {reason}")]
    Crypto { reason: String },

    /// The store rejected the durable write. The chain tip is unchanged and
    /// the append may be retried.
    #[error("audit store write failed for sequence {sequence_number}: {reason}")]
    StoreWrite { sequence_number: u64, reason: String },

    /// Entries could not be read back from the store.
    #[error("audit store read failed: {reason}")]
    StoreRead { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// A forensic pass could not run.
    #[error("analysis error: {0}")]
    Analysis(#[from] AnalysisError),
}

/// Convenience alias used throughout the TESSERA crates.
pub type AuditResult<T> = Result<T, AuditError>;

/// Errors reported by an `AuditStore` implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("write failed: {reason}")]
    Write { reason: String },

    #[error("read failed: {reason}")]
    Read { reason: String },
}

/// Reasons an analysis pass could not run at all.
///
/// Distinct from a completed analysis that found nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// There is nothing to analyze; rates would be undefined.
    #[error("cannot analyze an empty batch")]
    EmptyBatch,

    /// The supplied validation result describes a different batch.
    #[error("validation result covers {validated} entries but {entries} were supplied")]
    BatchMismatch { entries: usize, validated: usize },
}
