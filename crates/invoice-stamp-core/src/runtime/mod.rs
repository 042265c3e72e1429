// invoice-stamp-core/src/runtime/mod.rs
// ============================================================================
// Module: Invoice Stamp Runtime
// Description: Signing engine, verifier, cache, metrics, and batch optimizer.
// Purpose: Execute stamp generation and verification behind one service path.
// Dependencies: crate::{core, interfaces}, rsa, rayon
// ============================================================================

//! ## Overview
//! Runtime modules implement stamp generation, verification, the signature
//! cache, and the batch optimizer. All external interfaces must call into the
//! same [`SigningService`] methods to preserve invariance and observability.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod cache;
pub mod metrics;
pub mod optimizer;
pub mod service;
pub mod signer;
pub mod verifier;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cache::CacheMetrics;
pub use cache::CachedSignature;
pub use cache::SignatureCache;
pub use metrics::MetricsSnapshot;
pub use metrics::SigningMetrics;
pub use service::DEFAULT_CACHE_SIZE;
pub use service::DEFAULT_CACHE_TTL_SECS;
pub use service::DEFAULT_MAX_WORKERS;
pub use service::InMemoryVerificationRecorder;
pub use service::SigningService;
pub use service::SigningSettings;
pub use signer::SigningError;
pub use signer::sign_invoice;
pub use verifier::VerificationReport;
pub use verifier::VerificationStatus;
pub use verifier::verify_csid;
pub use verifier::verify_document;
