//! Signing-key material and the in-process `KeyRing` provider.

use std::collections::BTreeMap;
use std::fmt;

use tessera_contracts::{
    entry::KeyId,
    error::{AuditError, AuditResult},
};

use crate::traits::KeyProvider;

/// A named HMAC key.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey {
    key_id: KeyId,
    secret: Vec<u8>,
}

impl SigningKey {
    /// Build a key. Empty secrets are rejected.
    pub fn new(key_id: impl Into<String>, secret: impl Into<Vec<u8>>) -> AuditResult<Self> {
        let secret = secret.into();
        let key_id = KeyId::new(key_id);
        if secret.is_empty() {
            return Err(AuditError::Config {
                reason: format!("signing key '{}' has an empty secret", key_id),
            });
        }
        Ok(Self { key_id, secret })
    }

    /// Build a key from a hex-encoded secret.
    pub fn from_hex(key_id: impl Into<String>, secret_hex: &str) -> AuditResult<Self> {
        let secret = hex::decode(secret_hex.trim()).map_err(|e| AuditError::Config {
            reason: format!("signing key is not valid hex: {}", e),
        })?;
        Self::new(key_id, secret)
    }

    pub fn key_id(&self) -> &KeyId {
        &self.key_id
    }

    pub(crate) fn secret(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// One active signing key plus any number of retired keys kept for
/// verifying history.
#[derive(Debug, Clone)]
pub struct KeyRing {
    active: KeyId,
    keys: BTreeMap<KeyId, SigningKey>,
}

impl KeyRing {
    pub fn new(active: SigningKey) -> Self {
        let active_id = active.key_id().clone();
        let mut keys = BTreeMap::new();
        keys.insert(active_id.clone(), active);
        Self {
            active: active_id,
            keys,
        }
    }

    /// Add a key that is only used for verification.
    pub fn with_retired(mut self, key: SigningKey) -> Self {
        self.keys.entry(key.key_id().clone()).or_insert(key);
        self
    }

    /// Make `key` the active signing key. The previous active key stays in
    /// the ring so entries it signed remain verifiable.
    pub fn rotate(&mut self, key: SigningKey) {
        let id = key.key_id().clone();
        self.keys.insert(id.clone(), key);
        self.active = id;
    }

    pub fn active_key_id(&self) -> &KeyId {
        &self.active
    }
}

impl KeyProvider for KeyRing {
    fn current_key(&self) -> AuditResult<SigningKey> {
        self.keys
            .get(&self.active)
            .cloned()
            .ok_or_else(|| AuditError::Crypto {
                reason: format!("active signing key '{}' missing from key ring", self.active),
            })
    }

    fn key(&self, key_id: &KeyId) -> Option<SigningKey> {
        self.keys.get(key_id).cloned()
    }
}
