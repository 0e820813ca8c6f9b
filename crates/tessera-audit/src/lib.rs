//! # tessera-audit
//!
//! Chain validation and reference stores for the TESSERA audit chain.
//!
//! ## Overview
//!
//! Every entry links to the previous entry via its SHA-256 content hash and
//! carries an HMAC signature. Editing, deleting, inserting, or reordering
//! any entry is detected by `ChainValidator`, which reports every violation
//! it finds rather than stopping at the first.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tessera_audit::{ChainValidator, InMemoryAuditStore};
//!
//! let store = InMemoryAuditStore::new();
//! let builder = ChainBuilder::bootstrap(Arc::new(store.clone()), keys.clone())?;
//! builder.append(event)?;
//!
//! let result = ChainValidator::new(keys).validate(&store.entries());
//! assert!(result.is_valid);
//! ```

pub mod jsonl;
pub mod memory;
pub mod validator;

pub use jsonl::{load_records, JsonlAuditStore};
pub use memory::InMemoryAuditStore;
pub use validator::ChainValidator;

// ── Tests ─────────────────────────────────────────────────────────────────────
