//! Hasher/Signer: content hashing and keyed signatures over audit entries.
//!
//! Both primitives are computed over the same canonical byte layout of an
//! entry's core fields. Every variable-length field is length-prefixed so
//! that no two different cores share an encoding.
//!
//! Canonical core layout (bytes, in order):
//!   1. id                 — string
//!   2. timestamp          — string, RFC 3339 with nanoseconds and `Z`
//!   3. sequence_number    — 8-byte little-endian
//!   4. event_type         — string
//!   5. event_data         — string, canonical JSON (keys sorted)
//!   6. actor_id, tenant_id, source_ip, user_agent, session_id
//!                         — optional strings
//!   7. key_id             — string
//!   8. compliance flags   — four bytes, 0 or 1 each
//!
//! A string is its byte length as 8-byte little-endian followed by its
//! UTF-8 bytes. An optional string is a presence byte (0 or 1) followed by
//! the string when present.
//!
//! content_hash = hex(SHA-256(core || previous_hash))
//! signature    = hex(HMAC-SHA256(key, core || content_hash))

use chrono::SecondsFormat;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use tessera_contracts::{
    entry::{AuditEntry, EntryCore},
    error::{AuditError, AuditResult},
};

use crate::keys::SigningKey;

type HmacSha256 = Hmac<Sha256>;

/// Encode the core fields of an entry in canonical form.
pub fn canonical_core_bytes(core: &EntryCore<'_>) -> AuditResult<Vec<u8>> {
    let event_json = core
        .event_data
        .canonical_json()
        .map_err(|e| AuditError::Crypto {
            reason: format!("event data could not be canonicalized: {}", e),
        })?;

    let mut buf = Vec::with_capacity(256 + event_json.len());
    put_str(&mut buf, &core.id.to_string());
    put_str(
        &mut buf,
        &core.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
    );
    buf.extend_from_slice(&core.sequence_number.to_le_bytes());
    put_str(&mut buf, core.event_type);
    put_bytes(&mut buf, &event_json);

    let ctx = core.context;
    for field in [
        &ctx.actor_id,
        &ctx.tenant_id,
        &ctx.source_ip,
        &ctx.user_agent,
        &ctx.session_id,
    ] {
        put_opt_str(&mut buf, field.as_deref());
    }

    put_str(&mut buf, core.key_id.as_str());

    let flags = core.compliance_flags;
    buf.extend_from_slice(&[
        u8::from(flags.data_protection_compliant),
        u8::from(flags.access_control_enforced),
        u8::from(flags.consent_validated),
        u8::from(flags.emergency_access),
    ]);

    Ok(buf)
}

/// Compute the content hash of an entry core linked to `previous_hash`.
///
/// Returns a lowercase 64-character hex string.
pub fn content_hash(core: &EntryCore<'_>, previous_hash: &str) -> AuditResult<String> {
    let bytes = canonical_core_bytes(core)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    hasher.update(previous_hash.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Sign an entry core and its content hash with `key`.
///
/// HMAC is deterministic: the same inputs always yield the same signature.
pub fn sign(key: &SigningKey, core: &EntryCore<'_>, content_hash: &str) -> AuditResult<String> {
    let mac = mac_over(key, core, content_hash)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check `expected_signature` against a freshly computed signature.
///
/// The comparison runs in constant time with respect to where the two
/// signatures differ.
pub fn verify(
    key: &SigningKey,
    core: &EntryCore<'_>,
    content_hash: &str,
    expected_signature: &str,
) -> AuditResult<bool> {
    let computed = sign(key, core, content_hash)?;
    Ok(constant_time_eq(computed.as_bytes(), expected_signature.as_bytes()))
}

/// Verify a stored entry end to end.
///
/// The content hash is recomputed from the entry's own fields rather than
/// taken from `entry.content_hash`, so overwriting the stored hash cannot
/// hide an edit to the core.
pub fn verify_entry(key: &SigningKey, entry: &AuditEntry) -> AuditResult<bool> {
    let core = entry.core();
    let recomputed = content_hash(&core, &entry.previous_hash)?;
    verify(key, &core, &recomputed, &entry.signature)
}

/// Constant-time byte comparison. Slices of different length compare
/// unequal.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

fn mac_over(key: &SigningKey, core: &EntryCore<'_>, content_hash: &str) -> AuditResult<HmacSha256> {
    let bytes = canonical_core_bytes(core)?;
    let mut mac = HmacSha256::new_from_slice(key.secret()).map_err(|e| AuditError::Crypto {
        reason: format!("HMAC key '{}' rejected: {}", key.key_id(), e),
    })?;
    mac.update(&bytes);
    mac.update(content_hash.as_bytes());
    Ok(mac)
}

fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    buf.extend_from_slice(bytes);
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    put_bytes(buf, s.as_bytes());
}

fn put_opt_str(buf: &mut Vec<u8>, s: Option<&str>) {
    match s {
        Some(s) => {
            buf.push(1);
            put_str(buf, s);
        }
        None => buf.push(0),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use tessera_contracts::{
        entry::{AuditContext, ComplianceFlags, EntryId, KeyId},
        event_data::EventData,
    };

    use super::*;

    struct Fixture {
        id: EntryId,
        timestamp: chrono::DateTime<Utc>,
        event_type: String,
        event_data: EventData,
        context: AuditContext,
        flags: ComplianceFlags,
        key_id: KeyId,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                id: EntryId::new(),
                timestamp: Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap(),
                event_type: "PATIENT_DATA_ACCESS".to_string(),
                event_data: EventData::new().with("patient_id", "patient-101"),
                context: AuditContext::for_actor("dr-alves"),
                flags: ComplianceFlags::compliant(),
                key_id: KeyId::new("k1"),
            }
        }

        fn core(&self, sequence_number: u64) -> EntryCore<'_> {
            EntryCore {
                id: &self.id,
                timestamp: &self.timestamp,
                sequence_number,
                event_type: &self.event_type,
                event_data: &self.event_data,
                context: &self.context,
                compliance_flags: &self.flags,
                key_id: &self.key_id,
            }
        }
    }

    fn key() -> SigningKey {
        SigningKey::new("k1", b"test-secret-0123456789".to_vec()).unwrap()
    }

    #[test]
    fn content_hash_is_deterministic_hex() {
        let f = Fixture::new();
        let a = content_hash(&f.core(1), AuditEntry::GENESIS_HASH).unwrap();
        let b = content_hash(&f.core(1), AuditEntry::GENESIS_HASH).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn content_hash_depends_on_previous_hash() {
        let f = Fixture::new();
        let a = content_hash(&f.core(1), AuditEntry::GENESIS_HASH).unwrap();
        let b = content_hash(&f.core(1), &"f".repeat(64)).unwrap();
        assert_ne!(a, b, "identical cores with different predecessors must hash differently");
    }

    #[test]
    fn content_hash_depends_on_sequence_number() {
        let f = Fixture::new();
        let a = content_hash(&f.core(1), AuditEntry::GENESIS_HASH).unwrap();
        let b = content_hash(&f.core(2), AuditEntry::GENESIS_HASH).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn optional_fields_do_not_collide() {
        // actor "ab" + no tenant must not encode like actor "a" + tenant "b".
        let mut f = Fixture::new();
        f.context = AuditContext {
            actor_id: Some("ab".to_string()),
            ..AuditContext::default()
        };
        let mut g = Fixture::new();
        g.id = f.id;
        g.context = AuditContext {
            actor_id: Some("a".to_string()),
            tenant_id: Some("b".to_string()),
            ..AuditContext::default()
        };

        assert_ne!(
            canonical_core_bytes(&f.core(1)).unwrap(),
            canonical_core_bytes(&g.core(1)).unwrap()
        );
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let f = Fixture::new();
        let core = f.core(1);
        let hash = content_hash(&core, AuditEntry::GENESIS_HASH).unwrap();
        let sig = sign(&key(), &core, &hash).unwrap();

        assert_eq!(sig, sign(&key(), &core, &hash).unwrap(), "HMAC must be deterministic");
        assert!(verify(&key(), &core, &hash, &sig).unwrap());
    }

    #[test]
    fn verify_rejects_wrong_key_and_truncated_signature() {
        let f = Fixture::new();
        let core = f.core(1);
        let hash = content_hash(&core, AuditEntry::GENESIS_HASH).unwrap();
        let sig = sign(&key(), &core, &hash).unwrap();

        let other = SigningKey::new("k1", b"a-different-secret".to_vec()).unwrap();
        assert!(!verify(&other, &core, &hash, &sig).unwrap());
        assert!(!verify(&key(), &core, &hash, &sig[..32]).unwrap());
    }

    #[test]
    fn constant_time_eq_behaves_like_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
        assert!(constant_time_eq(b"", b""));
    }
}
