// invoice-stamp-core/src/runtime/signer.rs
// ============================================================================
// Module: Stamp Signer
// Description: RSA-PSS-SHA256 stamp generation over canonical invoice bytes.
// Purpose: Produce CSID envelopes that verify against the matching public key.
// Dependencies: crate::core, base64, rsa, sha2
// ============================================================================

//! ## Overview
//! Signing canonicalizes the invoice, hashes the bytes with SHA-256, and
//! signs the digest with RSA-PSS using an MGF1/SHA-256 mask function and
//! digest-length salt. The padding scheme must match the verifier exactly;
//! deterministic PKCS#1 v1.5 signing is not used here. The raw signature is
//! base64-encoded and wrapped in the CSID envelope.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64;
use rsa::pss::Pss;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

use crate::core::canonical::EncodingError;
use crate::core::canonical::canonical_json_bytes;
use crate::core::invoice::InvoiceDocument;
use crate::core::stamp::ALGORITHM_RSA_PSS_SHA256;
use crate::core::stamp::CryptographicStamp;
use crate::core::stamp::StampEnvelope;
use crate::interfaces::KeyHandle;
use crate::interfaces::KeyLoadError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while generating a stamp.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    /// Invoice data could not be canonicalized.
    #[error("signing encoding error: {0}")]
    Encoding(#[from] EncodingError),
    /// Key material was unavailable or unusable.
    #[error("signing key error: {0}")]
    Key(#[from] KeyLoadError),
    /// Underlying signature operation failed.
    #[error("signature generation failed: {0}")]
    Crypto(String),
    /// Runtime infrastructure failure (lock or worker pool).
    #[error("signing internal error: {0}")]
    Internal(String),
}

// ============================================================================
// SECTION: Signing
// ============================================================================

/// Signs an invoice and returns a new stamp.
///
/// The input invoice is not mutated; callers merge the returned stamp via
/// [`InvoiceDocument::attach_stamp`].
///
/// # Errors
///
/// Returns [`SigningError::Encoding`] when the invoice cannot be
/// canonicalized or has no signable fields, and [`SigningError::Crypto`] when
/// the signature operation fails.
pub fn sign_invoice(
    invoice: &InvoiceDocument,
    key: &KeyHandle,
    version: &str,
) -> Result<CryptographicStamp, SigningError> {
    let bytes = signable_bytes(invoice)?;
    let signature = sign_bytes(&bytes, key)?;
    stamp_from_inner(&Base64.encode(signature), version)
}

/// Returns canonical bytes for signing, rejecting empty documents.
///
/// # Errors
///
/// Returns [`EncodingError::EmptyDocument`] when nothing signable remains
/// after stripping prior signing artifacts.
pub(crate) fn signable_bytes(invoice: &InvoiceDocument) -> Result<Vec<u8>, EncodingError> {
    let stripped = invoice.stripped_fields();
    if stripped.is_empty() {
        return Err(EncodingError::EmptyDocument);
    }
    canonical_json_bytes(&stripped)
}

/// Signs canonical bytes, returning the raw RSA-PSS signature.
///
/// # Errors
///
/// Returns [`SigningError::Crypto`] when the signature operation fails.
pub(crate) fn sign_bytes(bytes: &[u8], key: &KeyHandle) -> Result<Vec<u8>, SigningError> {
    let digest = Sha256::digest(bytes);
    let mut rng = rand::thread_rng();
    key.private()
        .sign_with_rng(&mut rng, Pss::new::<Sha256>(), &digest)
        .map_err(|err| SigningError::Crypto(err.to_string()))
}

/// Builds a stamp around an inner base64 signature with a fresh timestamp.
///
/// Cache hits reuse the cryptographic content but are re-enveloped so the
/// timestamp reflects the request time, not the original signing time.
///
/// # Errors
///
/// Returns [`SigningError::Encoding`] when the envelope cannot be serialized.
pub(crate) fn stamp_from_inner(
    inner_csid: &str,
    version: &str,
) -> Result<CryptographicStamp, SigningError> {
    let timestamp = unix_timestamp();
    let envelope = StampEnvelope {
        csid: inner_csid.to_string(),
        timestamp,
        algorithm: ALGORITHM_RSA_PSS_SHA256.to_string(),
    };
    let csid = envelope
        .encode()
        .map_err(|err| SigningError::Encoding(EncodingError::Canonicalization(err.to_string())))?;
    Ok(CryptographicStamp::new(csid, timestamp, ALGORITHM_RSA_PSS_SHA256, version))
}

/// Returns the current unix epoch time in seconds.
pub(crate) fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
}
