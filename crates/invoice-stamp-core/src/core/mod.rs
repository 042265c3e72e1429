// invoice-stamp-core/src/core/mod.rs
// ============================================================================
// Module: Invoice Stamp Core Types
// Description: Canonical invoice, stamp, and fingerprint structures.
// Purpose: Provide stable, serializable types for stamp generation and audit.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Core types define the invoice document model, the canonical byte encoding
//! used for hashing and signing, and the cryptographic stamp envelope. These
//! types are the canonical source of truth for any derived API surfaces.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod canonical;
pub mod invoice;
pub mod stamp;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use canonical::EncodingError;
pub use canonical::Fingerprint;
pub use canonical::canonical_invoice_bytes;
pub use canonical::canonical_json_bytes;
pub use canonical::fingerprint;
pub use canonical::fingerprint_bytes;
pub use invoice::InvoiceDocument;
pub use invoice::STRIPPED_FIELDS;
pub use stamp::ALGORITHM_RSA_PSS_SHA256;
pub use stamp::CryptographicStamp;
pub use stamp::EnvelopeError;
pub use stamp::STAMP_VERSION;
pub use stamp::StampEnvelope;
