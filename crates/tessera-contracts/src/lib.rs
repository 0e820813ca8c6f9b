//! # tessera-contracts
//!
//! Shared types and the error taxonomy for the TESSERA audit chain.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate — only data definitions and error types.

pub mod entry;
pub mod error;
pub mod event_data;
pub mod validation;

pub use entry::{
    AuditContext, AuditEntry, ChainTip, ComplianceFlags, EntryCore, EntryId, KeyId, NewAuditEvent,
};
pub use error::{AnalysisError, AuditError, AuditResult, StoreError};
pub use event_data::{EventData, EventValue};
pub use validation::{
    ChainAnchor, ChainValidationResult, ChainViolation, StoredRecord, ViolationKind,
};
