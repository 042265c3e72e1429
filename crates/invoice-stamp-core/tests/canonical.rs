// invoice-stamp-core/tests/canonical.rs
// ============================================================================
// Module: Canonicalization Tests
// Description: Tests for deterministic invoice encoding and fingerprints.
// ============================================================================
//! ## Overview
//! Validates that canonical bytes are stable across field insertion order and
//! that prior signing artifacts never reach the signable byte sequence.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use invoice_stamp_core::EncodingError;
use invoice_stamp_core::InvoiceDocument;
use invoice_stamp_core::canonical_invoice_bytes;
use invoice_stamp_core::fingerprint;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a document from a JSON literal.
fn document(value: serde_json::Value) -> InvoiceDocument {
    InvoiceDocument::from_value(value).unwrap()
}

// ============================================================================
// SECTION: Determinism
// ============================================================================

/// Tests canonical bytes are stable across insertion order.
#[test]
fn test_canonical_bytes_are_order_independent() {
    let first = document(json!({
        "invoice_number": "INV001",
        "amount": 100,
        "customer": {"name": "Acme", "tin": "1234"}
    }));
    let second = document(json!({
        "customer": {"tin": "1234", "name": "Acme"},
        "amount": 100,
        "invoice_number": "INV001"
    }));

    assert_eq!(
        canonical_invoice_bytes(&first).unwrap(),
        canonical_invoice_bytes(&second).unwrap()
    );
}

/// Tests fingerprints agree for logically identical invoices.
#[test]
fn test_fingerprint_matches_for_identical_content() {
    let first = document(json!({"a": 1, "b": [1, 2, 3]}));
    let second = document(json!({"b": [1, 2, 3], "a": 1}));

    assert_eq!(fingerprint(&first).unwrap(), fingerprint(&second).unwrap());
}

/// Tests fingerprints differ once any field changes.
#[test]
fn test_fingerprint_changes_with_content() {
    let first = document(json!({"invoice_number": "INV001", "amount": 100}));
    let second = document(json!({"invoice_number": "INV001", "amount": 200}));

    assert_ne!(fingerprint(&first).unwrap(), fingerprint(&second).unwrap());
}

// ============================================================================
// SECTION: Artifact Stripping
// ============================================================================

/// Tests signing artifacts are excluded from canonical bytes.
#[test]
fn test_signing_artifacts_are_stripped() {
    let bare = document(json!({"invoice_number": "INV001", "amount": 100}));
    let stamped = document(json!({
        "invoice_number": "INV001",
        "amount": 100,
        "signature": "stale",
        "csid": "stale-csid",
        "cryptographic_stamp": {"csid": "stale", "timestamp": 1, "algorithm": "x", "version": "2.0"}
    }));

    assert_eq!(
        canonical_invoice_bytes(&bare).unwrap(),
        canonical_invoice_bytes(&stamped).unwrap()
    );
}

/// Tests nested fields named like artifacts are preserved.
#[test]
fn test_nested_artifact_names_are_not_stripped() {
    let with_nested = document(json!({
        "invoice_number": "INV001",
        "details": {"signature": "part-of-payload"}
    }));
    let without_nested = document(json!({"invoice_number": "INV001", "details": {}}));

    assert_ne!(
        canonical_invoice_bytes(&with_nested).unwrap(),
        canonical_invoice_bytes(&without_nested).unwrap()
    );
}

// ============================================================================
// SECTION: Document Construction
// ============================================================================

/// Tests non-object payloads are rejected at construction.
#[test]
fn test_from_value_rejects_non_object() {
    let result = InvoiceDocument::from_value(json!([1, 2, 3]));
    assert_eq!(result.unwrap_err(), EncodingError::NotAnObject);
}

/// Tests CSID lookup prefers the bare field over the attached stamp.
#[test]
fn test_csid_lookup_precedence() {
    let both = document(json!({
        "csid": "bare-csid",
        "cryptographic_stamp": {"csid": "stamp-csid"}
    }));
    assert_eq!(both.csid(), Some("bare-csid"));

    let stamp_only = document(json!({
        "cryptographic_stamp": {"csid": "stamp-csid"}
    }));
    assert_eq!(stamp_only.csid(), Some("stamp-csid"));

    let none = document(json!({"invoice_number": "INV001"}));
    assert_eq!(none.csid(), None);
}
