// invoice-stamp-core/tests/batch.rs
// ============================================================================
// Module: Batch Signing Tests
// Description: Order preservation, failure isolation, and cache routing.
// ============================================================================
//! ## Overview
//! Validates that batches preserve input order under concurrency, isolate
//! per-item failures, and route identical invoices through the cache.

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

use std::sync::Arc;
use std::sync::OnceLock;

use invoice_stamp_core::InvoiceDocument;
use invoice_stamp_core::KeyHandle;
use invoice_stamp_core::KeyLoadError;
use invoice_stamp_core::KeyProvider;
use invoice_stamp_core::SigningService;
use invoice_stamp_core::SigningSettings;
use invoice_stamp_core::runtime::SigningError;
use invoice_stamp_core::runtime::VerificationStatus;
use invoice_stamp_core::runtime::verify_csid;
use rsa::RsaPublicKey;
use serde_json::json;

// ============================================================================
// SECTION: Test Key Provider
// ============================================================================

/// Static key provider serving one pre-generated handle.
struct StaticKeyProvider {
    /// The only handle this provider serves.
    handle: Arc<KeyHandle>,
}

impl StaticKeyProvider {
    /// Builds a provider around the shared test key.
    fn new() -> Self {
        Self {
            handle: Arc::new(test_key().clone()),
        }
    }
}

impl KeyProvider for StaticKeyProvider {
    fn get_current_key(&self) -> Result<Arc<KeyHandle>, KeyLoadError> {
        Ok(Arc::clone(&self.handle))
    }

    fn get_verification_key(&self, key_id: &str) -> Result<RsaPublicKey, KeyLoadError> {
        if key_id == self.handle.key_id() {
            Ok(self.handle.public().clone())
        } else {
            Err(KeyLoadError::UnknownKeyId(key_id.to_string()))
        }
    }

    fn rotate_key(&self) -> Result<String, KeyLoadError> {
        Err(KeyLoadError::Invalid("static provider does not rotate".to_string()))
    }
}

/// Returns a shared 2048-bit test key handle.
fn test_key() -> &'static KeyHandle {
    static KEY: OnceLock<KeyHandle> = OnceLock::new();
    KEY.get_or_init(|| {
        let mut rng = rand::thread_rng();
        let private = rsa::RsaPrivateKey::new(&mut rng, 2048).unwrap();
        KeyHandle::new("batch-test-key", private)
    })
}

/// Builds a service with the given settings over the static provider.
fn service_with(settings: SigningSettings) -> SigningService {
    SigningService::new(settings, Arc::new(StaticKeyProvider::new())).unwrap()
}

/// Builds a numbered invoice document.
fn invoice(number: u32) -> InvoiceDocument {
    InvoiceDocument::from_value(json!({
        "invoice_number": format!("INV{number:04}"),
        "amount": number * 10,
    }))
    .unwrap()
}

// ============================================================================
// SECTION: Order Preservation
// ============================================================================

/// Tests batch results line up with their inputs under parallelism.
#[test]
fn test_batch_preserves_input_order() {
    let settings = SigningSettings {
        max_workers: 4,
        ..SigningSettings::default()
    };
    let service = service_with(settings);

    let invoices: Vec<InvoiceDocument> = (0..12).map(invoice).collect();
    let results = service.sign_batch(&invoices).unwrap();
    assert_eq!(results.len(), invoices.len());

    // Each slot's stamp must verify against the invoice at the same index;
    // a reordered result would verify against the wrong document.
    for (document, result) in invoices.iter().zip(&results) {
        let stamp = result.as_ref().unwrap();
        let report = verify_csid(document, &stamp.csid, test_key().public());
        assert_eq!(report.status, VerificationStatus::Valid);
    }
}

/// Tests sequential mode produces the same contract.
#[test]
fn test_sequential_batch_matches_contract() {
    let settings = SigningSettings {
        parallel_processing: false,
        ..SigningSettings::default()
    };
    let service = service_with(settings);

    let invoices: Vec<InvoiceDocument> = (0..4).map(invoice).collect();
    let results = service.sign_batch(&invoices).unwrap();

    for (document, result) in invoices.iter().zip(&results) {
        let stamp = result.as_ref().unwrap();
        let report = verify_csid(document, &stamp.csid, test_key().public());
        assert_eq!(report.status, VerificationStatus::Valid);
    }
}

// ============================================================================
// SECTION: Failure Isolation
// ============================================================================

/// Tests one failing invoice does not abort its siblings.
#[test]
fn test_failure_is_isolated_to_its_slot() {
    let service = service_with(SigningSettings::default());

    let empty = InvoiceDocument::from_value(json!({"csid": "only-artifacts"})).unwrap();
    let invoices = vec![invoice(1), empty, invoice(2)];
    let results = service.sign_batch(&invoices).unwrap();

    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(SigningError::Encoding(_))));
    assert!(results[2].is_ok());

    let metrics = service.metrics_snapshot();
    assert_eq!(metrics.generated, 2);
    assert_eq!(metrics.failed, 1);
}

// ============================================================================
// SECTION: Cache Routing
// ============================================================================

/// Tests identical invoices in one batch record cache hits.
#[test]
fn test_duplicate_invoices_hit_the_cache() {
    let settings = SigningSettings {
        // Sequential keeps the duplicate ordering deterministic for the
        // hit/miss assertion below.
        parallel_processing: false,
        ..SigningSettings::default()
    };
    let service = service_with(settings);

    let repeated = vec![invoice(7), invoice(7), invoice(7)];
    let results = service.sign_batch(&repeated).unwrap();
    assert!(results.iter().all(Result::is_ok));

    let cache = service.cache_metrics();
    assert_eq!(cache.misses, 1);
    assert_eq!(cache.hits, 2);
    assert_eq!(cache.entries, 1);

    // Cache hits still verify: the signature bytes are reused, the envelope
    // timestamp is fresh.
    for result in &results {
        let stamp = result.as_ref().unwrap();
        let report = verify_csid(&invoice(7), &stamp.csid, test_key().public());
        assert_eq!(report.status, VerificationStatus::Valid);
    }
}

/// Tests disabling caching bypasses the cache entirely.
#[test]
fn test_disabled_cache_is_bypassed() {
    let settings = SigningSettings {
        enable_caching: false,
        ..SigningSettings::default()
    };
    let service = service_with(settings);

    let repeated = vec![invoice(9), invoice(9)];
    let results = service.sign_batch(&repeated).unwrap();
    assert!(results.iter().all(Result::is_ok));

    let cache = service.cache_metrics();
    assert_eq!(cache.hits, 0);
    assert_eq!(cache.misses, 0);
    assert_eq!(cache.entries, 0);
}

// ============================================================================
// SECTION: Metrics
// ============================================================================

/// Tests batch signing feeds the metrics accumulator.
#[test]
fn test_batch_records_timings() {
    let service = service_with(SigningSettings::default());

    let invoices: Vec<InvoiceDocument> = (0..5).map(invoice).collect();
    let results = service.sign_batch(&invoices).unwrap();
    assert!(results.iter().all(Result::is_ok));

    let metrics = service.metrics_snapshot();
    assert_eq!(metrics.generated, 5);
    assert_eq!(metrics.failed, 0);
    assert!(metrics.total_ms > 0.0);
    assert!(metrics.min_ms <= metrics.max_ms);
    assert!(metrics.average_ms >= metrics.min_ms);
    assert!(metrics.average_ms <= metrics.max_ms);

    service.reset_metrics();
    let reset = service.metrics_snapshot();
    assert_eq!(reset.generated, 0);
    assert!(reset.total_ms.abs() < f64::EPSILON);
}
