// invoice-stamp-core/src/runtime/verifier.rs
// ============================================================================
// Module: Stamp Verifier
// Description: RSA-PSS-SHA256 verification of CSID envelopes against invoices.
// Purpose: Report verification outcomes as values, never as errors.
// Dependencies: crate::core, rsa, sha2
// ============================================================================

//! ## Overview
//! Verification mirrors the signer: decode the envelope, canonicalize the
//! invoice with the same stripping rule, hash, and check the signature with
//! RSA-PSS/MGF1-SHA256. Invalid input from untrusted sources is routine, not
//! exceptional, so every failure is represented as a [`VerificationStatus`]
//! value. An absent CSID is reported distinctly from a mismatched one so
//! callers can tell "never signed" from "tampered".

// ============================================================================
// SECTION: Imports
// ============================================================================

use rsa::RsaPublicKey;
use rsa::pss::Pss;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

use crate::core::canonical::canonical_invoice_bytes;
use crate::core::invoice::InvoiceDocument;
use crate::core::stamp::ALGORITHM_RSA_PSS_SHA256;
use crate::core::stamp::StampEnvelope;

// ============================================================================
// SECTION: Verification Status
// ============================================================================

/// Verification outcome classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Signature verified against the invoice bytes.
    Valid,
    /// No CSID was present on the invoice or supplied by the caller.
    NoSignature,
    /// CSID envelope could not be decoded.
    MalformedEnvelope,
    /// Signature did not match the invoice bytes or key.
    SignatureMismatch,
    /// Envelope declared an unsupported algorithm.
    AlgorithmMismatch,
}

impl VerificationStatus {
    /// Returns the stable string form used in reports and audit records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::NoSignature => "no_signature",
            Self::MalformedEnvelope => "malformed_envelope",
            Self::SignatureMismatch => "signature_mismatch",
            Self::AlgorithmMismatch => "algorithm_mismatch",
        }
    }

    /// Returns true for a successful verification.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }
}

// ============================================================================
// SECTION: Verification Report
// ============================================================================

/// Verification result returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Verification outcome.
    pub status: VerificationStatus,
    /// Algorithm declared by the envelope, when decodable.
    pub algorithm: Option<String>,
    /// Envelope timestamp (unix epoch seconds), when decodable.
    pub signed_at: Option<i64>,
}

impl VerificationReport {
    /// Builds a report with no envelope metadata.
    #[must_use]
    pub const fn bare(status: VerificationStatus) -> Self {
        Self {
            status,
            algorithm: None,
            signed_at: None,
        }
    }

    /// Builds a report carrying envelope metadata.
    #[must_use]
    pub fn with_envelope(status: VerificationStatus, envelope: &StampEnvelope) -> Self {
        Self {
            status,
            algorithm: Some(envelope.algorithm.clone()),
            signed_at: Some(envelope.timestamp),
        }
    }

    /// Returns true for a successful verification.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.status.is_valid()
    }
}

// ============================================================================
// SECTION: Verification
// ============================================================================

/// Verifies a CSID against an invoice and public key.
///
/// Failures are values; this function never returns an error.
#[must_use]
pub fn verify_csid(
    invoice: &InvoiceDocument,
    csid: &str,
    public: &RsaPublicKey,
) -> VerificationReport {
    let Ok(envelope) = StampEnvelope::decode(csid) else {
        return VerificationReport::bare(VerificationStatus::MalformedEnvelope);
    };
    if envelope.algorithm != ALGORITHM_RSA_PSS_SHA256 {
        return VerificationReport::with_envelope(VerificationStatus::AlgorithmMismatch, &envelope);
    }
    let Ok(signature) = envelope.signature_bytes() else {
        return VerificationReport::with_envelope(VerificationStatus::MalformedEnvelope, &envelope);
    };
    let Ok(bytes) = canonical_invoice_bytes(invoice) else {
        return VerificationReport::with_envelope(VerificationStatus::SignatureMismatch, &envelope);
    };
    let digest = Sha256::digest(&bytes);
    match public.verify(Pss::new::<Sha256>(), &digest, &signature) {
        Ok(()) => VerificationReport::with_envelope(VerificationStatus::Valid, &envelope),
        Err(_) => {
            VerificationReport::with_envelope(VerificationStatus::SignatureMismatch, &envelope)
        }
    }
}

/// Verifies the CSID carried by the invoice itself.
///
/// Reports [`VerificationStatus::NoSignature`] when the invoice carries no
/// CSID in either its top-level `csid` field or an attached stamp.
#[must_use]
pub fn verify_document(invoice: &InvoiceDocument, public: &RsaPublicKey) -> VerificationReport {
    match invoice.csid() {
        Some(csid) => verify_csid(invoice, csid, public),
        None => VerificationReport::bare(VerificationStatus::NoSignature),
    }
}
