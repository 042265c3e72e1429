// invoice-stamp-core/src/interfaces/mod.rs
// ============================================================================
// Module: Invoice Stamp Interfaces
// Description: Backend-agnostic interfaces for key material and audit hooks.
// Purpose: Define the contract surfaces used by the Invoice Stamp runtime.
// Dependencies: crate::core, rsa
// ============================================================================

//! ## Overview
//! Interfaces define how the signing core integrates with external systems
//! without embedding backend-specific details. Key storage and rotation
//! persistence live behind [`KeyProvider`]; the optional persistence layer
//! observes verification activity through [`VerificationRecorder`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use rsa::RsaPrivateKey;
use rsa::RsaPublicKey;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::runtime::verifier::VerificationStatus;

// ============================================================================
// SECTION: Key Material
// ============================================================================

/// Loaded keypair handle referenced by the signing core.
///
/// # Invariants
/// - The core holds `Arc` references only; key bytes are never persisted or
///   logged by this crate.
#[derive(Clone)]
pub struct KeyHandle {
    /// Opaque key identifier assigned by the provider.
    key_id: String,
    /// RSA private key used for stamp generation.
    private: RsaPrivateKey,
    /// RSA public key used for stamp verification.
    public: RsaPublicKey,
}

impl KeyHandle {
    /// Builds a handle from a private key, deriving the public half.
    #[must_use]
    pub fn new(key_id: impl Into<String>, private: RsaPrivateKey) -> Self {
        let public = RsaPublicKey::from(&private);
        Self {
            key_id: key_id.into(),
            private,
            public,
        }
    }

    /// Returns the key identifier.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Returns the private key reference.
    #[must_use]
    pub const fn private(&self) -> &RsaPrivateKey {
        &self.private
    }

    /// Returns the public key reference.
    #[must_use]
    pub const fn public(&self) -> &RsaPublicKey {
        &self.public
    }
}

impl fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Key material is intentionally excluded from debug output.
        f.debug_struct("KeyHandle").field("key_id", &self.key_id).finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Key Provider
// ============================================================================

/// Key material errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyLoadError {
    /// I/O failure while reading key material.
    #[error("key io error: {0}")]
    Io(String),
    /// Key material was present but unusable.
    #[error("key material invalid: {0}")]
    Invalid(String),
    /// No key registered under the requested identifier.
    #[error("unknown key id: {0}")]
    UnknownKeyId(String),
}

/// Supplier of the active keypair and verification keys.
///
/// Rotation replaces the active handle wholesale rather than mutating it in
/// place. Callers that cache signatures must clear their cache after a
/// rotation; see `SignatureCache::clear`.
pub trait KeyProvider: Send + Sync {
    /// Returns the active signing key handle.
    ///
    /// # Errors
    ///
    /// Returns [`KeyLoadError`] when key material is unavailable or corrupt.
    fn get_current_key(&self) -> Result<Arc<KeyHandle>, KeyLoadError>;

    /// Returns the verification key registered under an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`KeyLoadError::UnknownKeyId`] when no key matches.
    fn get_verification_key(&self, key_id: &str) -> Result<RsaPublicKey, KeyLoadError>;

    /// Rotates to a new active key and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`KeyLoadError`] when no successor key can be activated.
    fn rotate_key(&self) -> Result<String, KeyLoadError>;
}

// ============================================================================
// SECTION: Verification Recorder
// ============================================================================

/// Verification attempt metadata emitted for the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationAttempt {
    /// Verification outcome.
    pub status: VerificationStatus,
    /// Hex fingerprint of the verified invoice, when computable.
    pub fingerprint: Option<String>,
    /// Identifier of the key used for verification, when known.
    pub key_id: Option<String>,
}

/// Observer hook for verification activity.
///
/// Implementations must not fail the verification path; the runtime logs and
/// swallows recorder errors.
pub trait VerificationRecorder: Send + Sync {
    /// Records a verification attempt.
    fn record(&self, attempt: &VerificationAttempt);
}
