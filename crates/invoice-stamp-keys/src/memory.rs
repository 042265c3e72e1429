// invoice-stamp-keys/src/memory.rs
// ============================================================================
// Module: In-Memory Key Provider
// Description: Generated RSA keypairs for tests and local demos.
// Purpose: Provide the `KeyProvider` contract without touching disk.
// Dependencies: invoice-stamp-core, rand, rsa
// ============================================================================

//! ## Overview
//! This provider generates keypairs on demand and keeps them only in memory.
//! It is intended for tests and local demos; production deployments load
//! provisioned key material through [`crate::FileKeyProvider`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::RwLock;

use invoice_stamp_core::KeyHandle;
use invoice_stamp_core::KeyLoadError;
use invoice_stamp_core::KeyProvider;
use rsa::RsaPrivateKey;
use rsa::RsaPublicKey;
use tracing::debug;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default RSA modulus size in bits.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// Identifier prefix for generated keys.
const KEY_ID_PREFIX: &str = "key";

// ============================================================================
// SECTION: In-Memory Provider
// ============================================================================

/// Key provider holding generated keypairs in memory.
#[derive(Debug)]
pub struct InMemoryKeyProvider {
    /// Generated handles keyed by key identifier.
    handles: RwLock<BTreeMap<String, Arc<KeyHandle>>>,
    /// Identifier of the active signing key.
    active: RwLock<String>,
    /// Modulus size used for generated keys.
    bits: usize,
    /// Monotonic counter for generated key identifiers.
    next_index: RwLock<u64>,
}

impl InMemoryKeyProvider {
    /// Generates an initial keypair with the default modulus size.
    ///
    /// # Errors
    ///
    /// Returns [`KeyLoadError::Invalid`] when key generation fails.
    pub fn generate() -> Result<Self, KeyLoadError> {
        Self::generate_with_bits(DEFAULT_KEY_BITS)
    }

    /// Generates an initial keypair with an explicit modulus size.
    ///
    /// # Errors
    ///
    /// Returns [`KeyLoadError::Invalid`] when key generation fails.
    pub fn generate_with_bits(bits: usize) -> Result<Self, KeyLoadError> {
        let key_id = format!("{KEY_ID_PREFIX}-1");
        let handle = generate_handle(&key_id, bits)?;
        let mut handles = BTreeMap::new();
        handles.insert(key_id.clone(), Arc::new(handle));
        Ok(Self {
            handles: RwLock::new(handles),
            active: RwLock::new(key_id),
            bits,
            next_index: RwLock::new(2),
        })
    }

    /// Builds a provider around an existing private key.
    #[must_use]
    pub fn from_private_key(key_id: &str, private: RsaPrivateKey) -> Self {
        let mut handles = BTreeMap::new();
        handles.insert(key_id.to_string(), Arc::new(KeyHandle::new(key_id, private)));
        Self {
            handles: RwLock::new(handles),
            active: RwLock::new(key_id.to_string()),
            bits: DEFAULT_KEY_BITS,
            next_index: RwLock::new(2),
        }
    }
}

impl KeyProvider for InMemoryKeyProvider {
    fn get_current_key(&self) -> Result<Arc<KeyHandle>, KeyLoadError> {
        let active = self
            .active
            .read()
            .map_err(|_| KeyLoadError::Io("active key lock poisoned".to_string()))?
            .clone();
        let guard = self
            .handles
            .read()
            .map_err(|_| KeyLoadError::Io("key handle lock poisoned".to_string()))?;
        guard.get(&active).cloned().ok_or(KeyLoadError::UnknownKeyId(active))
    }

    fn get_verification_key(&self, key_id: &str) -> Result<RsaPublicKey, KeyLoadError> {
        let guard = self
            .handles
            .read()
            .map_err(|_| KeyLoadError::Io("key handle lock poisoned".to_string()))?;
        guard
            .get(key_id)
            .map(|handle| handle.public().clone())
            .ok_or_else(|| KeyLoadError::UnknownKeyId(key_id.to_string()))
    }

    fn rotate_key(&self) -> Result<String, KeyLoadError> {
        let index = {
            let mut guard = self
                .next_index
                .write()
                .map_err(|_| KeyLoadError::Io("key index lock poisoned".to_string()))?;
            let index = *guard;
            *guard = guard.saturating_add(1);
            index
        };
        let key_id = format!("{KEY_ID_PREFIX}-{index}");
        let handle = generate_handle(&key_id, self.bits)?;
        {
            let mut guard = self
                .handles
                .write()
                .map_err(|_| KeyLoadError::Io("key handle lock poisoned".to_string()))?;
            guard.insert(key_id.clone(), Arc::new(handle));
        }
        let mut active = self
            .active
            .write()
            .map_err(|_| KeyLoadError::Io("active key lock poisoned".to_string()))?;
        active.clone_from(&key_id);
        drop(active);
        debug!(key_id = %key_id, "in-memory key provider rotated");
        Ok(key_id)
    }
}

// ============================================================================
// SECTION: Key Generation
// ============================================================================

/// Generates a keypair handle.
fn generate_handle(key_id: &str, bits: usize) -> Result<KeyHandle, KeyLoadError> {
    let mut rng = rand::thread_rng();
    let private = RsaPrivateKey::new(&mut rng, bits)
        .map_err(|err| KeyLoadError::Invalid(format!("key generation failed: {err}")))?;
    Ok(KeyHandle::new(key_id, private))
}
