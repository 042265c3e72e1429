// invoice-stamp-core/src/core/canonical.rs
// ============================================================================
// Module: Canonical Invoice Encoding
// Description: RFC 8785 JSON canonicalization and fingerprinting for invoices.
// Purpose: Provide deterministic bytes for stamp generation and verification.
// Dependencies: serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Signing and verification must agree on the exact byte sequence an invoice
//! hashes to, regardless of field insertion order. Canonical bytes use
//! RFC 8785 (JCS): keys sorted at every nesting level, fixed separators, and
//! UTF-8 output. Prior signing artifacts (`signature`, `csid`,
//! `cryptographic_stamp`) are stripped before serialization so a stamped
//! invoice re-canonicalizes to the bytes that were originally signed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

use crate::core::invoice::InvoiceDocument;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when canonicalizing invoice data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// JSON canonicalization failed.
    #[error("failed to canonicalize invoice: {0}")]
    Canonicalization(String),
    /// Invoice payload was not a JSON object.
    #[error("invoice document must be a json object")]
    NotAnObject,
    /// Invoice has no fields left after stripping signing artifacts.
    #[error("invoice has no signable fields")]
    EmptyDocument,
}

// ============================================================================
// SECTION: Fingerprint
// ============================================================================

/// SHA-256 fingerprint of canonical invoice bytes.
///
/// # Invariants
/// - Derived from the same canonical bytes the signer hashes, so cache keys
///   and signing inputs share one code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(
    /// Raw SHA-256 digest bytes.
    [u8; 32],
);

impl Fingerprint {
    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the lowercase hex encoding of the digest.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex_encode(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ============================================================================
// SECTION: Canonical Encoding
// ============================================================================

/// Returns canonical bytes for an invoice with signing artifacts stripped.
///
/// The same logical invoice canonicalizes to byte-identical output regardless
/// of field insertion order. This is the load-bearing property the signer and
/// verifier rely on for agreement.
///
/// # Errors
///
/// Returns [`EncodingError::Canonicalization`] when serialization fails.
pub fn canonical_invoice_bytes(invoice: &InvoiceDocument) -> Result<Vec<u8>, EncodingError> {
    let stripped = invoice.stripped_fields();
    serde_jcs::to_vec(&stripped).map_err(|err| EncodingError::Canonicalization(err.to_string()))
}

/// Returns canonical bytes for any serializable value.
///
/// # Errors
///
/// Returns [`EncodingError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, EncodingError> {
    serde_jcs::to_vec(value).map_err(|err| EncodingError::Canonicalization(err.to_string()))
}

/// Computes the SHA-256 fingerprint of an invoice's canonical bytes.
///
/// # Errors
///
/// Returns [`EncodingError::Canonicalization`] when serialization fails.
pub fn fingerprint(invoice: &InvoiceDocument) -> Result<Fingerprint, EncodingError> {
    let bytes = canonical_invoice_bytes(invoice)?;
    Ok(fingerprint_bytes(&bytes))
}

/// Computes the SHA-256 fingerprint of already-canonical bytes.
#[must_use]
pub fn fingerprint_bytes(bytes: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    Fingerprint(digest.into())
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}
