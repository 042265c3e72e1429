// invoice-stamp-core/src/core/stamp.rs
// ============================================================================
// Module: Cryptographic Stamp Model
// Description: CSID envelope encoding and the stamp structure attached to invoices.
// Purpose: Preserve the stamp wire format bit-for-bit across implementations.
// Dependencies: base64, serde, serde_json
// ============================================================================

//! ## Overview
//! A Cryptographic Stamp ID (CSID) is a base64 outer envelope wrapping a JSON
//! object `{csid, timestamp, algorithm}` whose inner `csid` field is the
//! base64 raw signature. The double encoding is intentional: the outer
//! envelope carries the metadata a verifier needs to self-describe the check
//! without external lookup, and must not be flattened — previously issued
//! stamps depend on this exact shape.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Signature algorithm identifier carried in envelopes and stamps.
pub const ALGORITHM_RSA_PSS_SHA256: &str = "RSA-PSS-SHA256";

/// Stamp format version for forward compatibility.
pub const STAMP_VERSION: &str = "2.0";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when decoding a CSID envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// Outer or inner base64 decoding failed.
    #[error("envelope base64 decode failed")]
    Base64,
    /// Envelope payload was not valid UTF-8.
    #[error("envelope payload is not utf-8")]
    Utf8,
    /// Envelope JSON was malformed or missing required fields.
    #[error("envelope json invalid: {0}")]
    Json(String),
}

// ============================================================================
// SECTION: Stamp Envelope
// ============================================================================

/// Inner CSID envelope serialized as JSON and base64-wrapped.
///
/// # Invariants
/// - Field names and types are wire format; renames break interoperability
///   with previously issued stamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StampEnvelope {
    /// Base64-encoded raw signature bytes.
    pub csid: String,
    /// Unix epoch seconds when the envelope was produced.
    pub timestamp: i64,
    /// Signature algorithm identifier.
    pub algorithm: String,
}

impl StampEnvelope {
    /// Encodes the envelope as base64-wrapped JSON.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Json`] when serialization fails.
    pub fn encode(&self) -> Result<String, EnvelopeError> {
        let json = serde_json::to_vec(self).map_err(|err| EnvelopeError::Json(err.to_string()))?;
        Ok(Base64.encode(json))
    }

    /// Decodes a base64-wrapped envelope.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError`] when the base64, UTF-8, or JSON layers are
    /// malformed.
    pub fn decode(encoded: &str) -> Result<Self, EnvelopeError> {
        let json = Base64.decode(encoded.trim()).map_err(|_| EnvelopeError::Base64)?;
        let text = std::str::from_utf8(&json).map_err(|_| EnvelopeError::Utf8)?;
        serde_json::from_str(text).map_err(|err| EnvelopeError::Json(err.to_string()))
    }

    /// Decodes the inner raw signature bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Base64`] when the inner signature is not
    /// valid base64.
    pub fn signature_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        Base64.decode(self.csid.trim()).map_err(|_| EnvelopeError::Base64)
    }
}

// ============================================================================
// SECTION: Cryptographic Stamp
// ============================================================================

/// Stamp attached to an invoice after signing.
///
/// # Invariants
/// - `csid` holds the encoded envelope; the stamp is only valid for the exact
///   canonical bytes of the invoice excluding prior signing artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptographicStamp {
    /// Base64-encoded CSID envelope.
    pub csid: String,
    /// Unix epoch seconds when the stamp was issued.
    pub timestamp: i64,
    /// Signature algorithm identifier.
    pub algorithm: String,
    /// Stamp format version.
    pub version: String,
}

impl CryptographicStamp {
    /// Builds a stamp from an encoded envelope.
    #[must_use]
    pub fn new(csid: String, timestamp: i64, algorithm: &str, version: &str) -> Self {
        Self {
            csid,
            timestamp,
            algorithm: algorithm.to_string(),
            version: version.to_string(),
        }
    }
}
