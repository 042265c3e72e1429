// invoice-stamp-core/src/runtime/service.rs
// ============================================================================
// Module: Signing Service
// Description: Owned aggregate of settings, cache, metrics, and worker pool.
// Purpose: Provide the single canonical execution path for stamp operations.
// Dependencies: crate::{core, interfaces, runtime}, rayon
// ============================================================================

//! ## Overview
//! The signing service owns every piece of mutable signing state: runtime
//! settings, the signature cache, the metrics accumulator, and the batch
//! worker pool. It is constructed once at startup and passed by reference to
//! request handlers; there are no ambient globals. All API surfaces (CLI,
//! HTTP, or embedding hosts) must call into these methods to preserve cache
//! correctness and observability.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;
use std::time::Duration;
use std::time::Instant;

use rayon::ThreadPool;
use rayon::ThreadPoolBuilder;
use rsa::RsaPublicKey;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

use crate::core::canonical::fingerprint;
use crate::core::invoice::InvoiceDocument;
use crate::core::stamp::ALGORITHM_RSA_PSS_SHA256;
use crate::core::stamp::CryptographicStamp;
use crate::core::stamp::STAMP_VERSION;
use crate::interfaces::KeyLoadError;
use crate::interfaces::KeyProvider;
use crate::interfaces::VerificationAttempt;
use crate::interfaces::VerificationRecorder;
use crate::runtime::cache::CacheMetrics;
use crate::runtime::cache::SignatureCache;
use crate::runtime::metrics::MetricsSnapshot;
use crate::runtime::metrics::SigningMetrics;
use crate::runtime::optimizer::execute_batch;
use crate::runtime::optimizer::sign_item;
use crate::runtime::signer::SigningError;
use crate::runtime::verifier::VerificationReport;
use crate::runtime::verifier::verify_csid;
use crate::runtime::verifier::verify_document;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Default signature cache capacity.
pub const DEFAULT_CACHE_SIZE: usize = 1024;
/// Default signature cache TTL in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
/// Default batch worker count.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Runtime signing settings.
///
/// Hosts reconfigure a live service through
/// [`SigningService::reconfigure`]; no process restart is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningSettings {
    /// Signature algorithm identifier; only RSA-PSS-SHA256 is supported.
    pub algorithm: String,
    /// Stamp format version attached to new stamps.
    pub version: String,
    /// Whether the signature cache is consulted and populated.
    pub enable_caching: bool,
    /// Signature cache capacity in entries.
    pub cache_size: usize,
    /// Signature cache entry TTL.
    pub cache_ttl: Duration,
    /// Whether batches fan out across the worker pool.
    pub parallel_processing: bool,
    /// Upper bound on concurrent signing workers.
    pub max_workers: usize,
}

impl Default for SigningSettings {
    fn default() -> Self {
        Self {
            algorithm: ALGORITHM_RSA_PSS_SHA256.to_string(),
            version: STAMP_VERSION.to_string(),
            enable_caching: true,
            cache_size: DEFAULT_CACHE_SIZE,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            parallel_processing: true,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

// ============================================================================
// SECTION: Signing Service
// ============================================================================

/// Owned signing engine aggregate.
pub struct SigningService {
    /// Live settings guarded for concurrent readers.
    settings: RwLock<SigningSettings>,
    /// Shared signature cache.
    cache: SignatureCache,
    /// Shared metrics accumulator.
    metrics: SigningMetrics,
    /// Key material supplier.
    keys: Arc<dyn KeyProvider>,
    /// Optional verification audit hook.
    recorder: Option<Arc<dyn VerificationRecorder>>,
    /// Batch worker pool; absent when parallelism is disabled.
    pool: RwLock<Option<Arc<ThreadPool>>>,
}

impl SigningService {
    /// Builds a service from settings and a key provider.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::Internal`] when the worker pool cannot be
    /// built.
    pub fn new(
        settings: SigningSettings,
        keys: Arc<dyn KeyProvider>,
    ) -> Result<Self, SigningError> {
        let pool = build_pool(&settings)?;
        let cache = SignatureCache::new(settings.cache_size);
        Ok(Self {
            settings: RwLock::new(settings),
            cache,
            metrics: SigningMetrics::new(),
            keys,
            recorder: None,
            pool: RwLock::new(pool),
        })
    }

    /// Attaches a verification recorder for the persistence layer.
    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn VerificationRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Returns a snapshot of the live settings.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::Internal`] when the settings lock is poisoned.
    pub fn settings(&self) -> Result<SigningSettings, SigningError> {
        self.settings
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| SigningError::Internal("settings lock poisoned".to_string()))
    }

    /// Applies new settings to the live service.
    ///
    /// The cache is resized in place and cleared when caching is toggled
    /// off; the worker pool is rebuilt when parallelism or the worker count
    /// changes.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::Internal`] when the worker pool cannot be
    /// rebuilt or a lock is poisoned.
    pub fn reconfigure(&self, settings: SigningSettings) -> Result<(), SigningError> {
        let previous = self.settings()?;
        let pool_changed = previous.parallel_processing != settings.parallel_processing
            || previous.max_workers != settings.max_workers;
        if pool_changed {
            let rebuilt = build_pool(&settings)?;
            let mut guard = self
                .pool
                .write()
                .map_err(|_| SigningError::Internal("worker pool lock poisoned".to_string()))?;
            *guard = rebuilt;
        }
        if previous.cache_size != settings.cache_size {
            self.cache.resize(settings.cache_size);
        }
        if previous.enable_caching && !settings.enable_caching {
            self.cache.clear();
            debug!("signature caching disabled; cache cleared");
        }
        let mut guard = self
            .settings
            .write()
            .map_err(|_| SigningError::Internal("settings lock poisoned".to_string()))?;
        *guard = settings;
        drop(guard);
        debug!("signing settings reconfigured");
        Ok(())
    }

    /// Signs a single invoice, consulting the cache when enabled.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError`] when key material is unavailable, the invoice
    /// cannot be canonicalized, or the signature operation fails.
    pub fn sign_invoice(
        &self,
        invoice: &InvoiceDocument,
    ) -> Result<CryptographicStamp, SigningError> {
        let settings = self.settings()?;
        let key = self.keys.get_current_key()?;
        let cache = settings.enable_caching.then_some(&self.cache);
        let start = Instant::now();
        let result = sign_item(invoice, &key, cache, settings.cache_ttl, &settings.version);
        if result.is_ok() {
            self.metrics.record_generation(start.elapsed());
        } else {
            self.metrics.record_failure();
        }
        result
    }

    /// Signs an invoice and attaches the stamp to it.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError`] when signing or stamp attachment fails.
    pub fn sign_and_attach(
        &self,
        invoice: &mut InvoiceDocument,
    ) -> Result<CryptographicStamp, SigningError> {
        let stamp = self.sign_invoice(invoice)?;
        invoice.attach_stamp(&stamp)?;
        Ok(stamp)
    }

    /// Signs a batch of invoices, preserving input order.
    ///
    /// One invoice's failure lands in its own result slot; siblings proceed.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::Key`] when the active key cannot be loaded;
    /// per-item failures are reported in the result slots instead.
    pub fn sign_batch(
        &self,
        invoices: &[InvoiceDocument],
    ) -> Result<Vec<Result<CryptographicStamp, SigningError>>, SigningError> {
        let settings = self.settings()?;
        let key = self.keys.get_current_key()?;
        let cache = settings.enable_caching.then_some(&self.cache);
        let pool = self
            .pool
            .read()
            .map_err(|_| SigningError::Internal("worker pool lock poisoned".to_string()))?
            .clone();
        let sign_one = |invoice: &InvoiceDocument| {
            let start = Instant::now();
            let result = sign_item(invoice, &key, cache, settings.cache_ttl, &settings.version);
            if result.is_ok() {
                self.metrics.record_generation(start.elapsed());
            } else {
                self.metrics.record_failure();
            }
            result
        };
        Ok(execute_batch(pool.as_deref(), invoices, sign_one))
    }

    /// Verifies the CSID carried by an invoice against the active key.
    ///
    /// Verification failures are reported as values in the returned report.
    ///
    /// # Errors
    ///
    /// Returns [`KeyLoadError`] when the active verification key cannot be
    /// loaded.
    pub fn verify_invoice(
        &self,
        invoice: &InvoiceDocument,
    ) -> Result<VerificationReport, KeyLoadError> {
        let key = self.keys.get_current_key()?;
        let report = verify_document(invoice, key.public());
        self.record_attempt(invoice, &report, Some(key.key_id()));
        Ok(report)
    }

    /// Verifies an explicit CSID against an invoice and public key.
    #[must_use]
    pub fn verify_with_key(
        &self,
        invoice: &InvoiceDocument,
        csid: &str,
        public: &RsaPublicKey,
    ) -> VerificationReport {
        let report = verify_csid(invoice, csid, public);
        self.record_attempt(invoice, &report, None);
        report
    }

    /// Rotates the signing key and clears the signature cache.
    ///
    /// Clearing is mandatory here: a signature cached under the previous key
    /// must never be served once the new key is active.
    ///
    /// # Errors
    ///
    /// Returns [`KeyLoadError`] when no successor key can be activated.
    pub fn rotate_signing_key(&self) -> Result<String, KeyLoadError> {
        let key_id = self.keys.rotate_key()?;
        self.cache.clear();
        debug!(key_id = %key_id, "signing key rotated; signature cache cleared");
        Ok(key_id)
    }

    /// Returns a snapshot of signing metrics.
    #[must_use]
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Resets signing metrics to zero.
    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    /// Returns cache hit/miss counters and entry count.
    #[must_use]
    pub fn cache_metrics(&self) -> CacheMetrics {
        self.cache.metrics()
    }

    /// Removes expired entries from the signature cache.
    pub fn purge_cache(&self) {
        self.cache.purge_expired();
    }

    /// Clears the signature cache and resets its counters.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Emits a verification attempt to the recorder, when attached.
    fn record_attempt(
        &self,
        invoice: &InvoiceDocument,
        report: &VerificationReport,
        key_id: Option<&str>,
    ) {
        let Some(recorder) = &self.recorder else {
            return;
        };
        let attempt = VerificationAttempt {
            status: report.status,
            fingerprint: fingerprint(invoice).ok().map(|digest| digest.to_hex()),
            key_id: key_id.map(ToString::to_string),
        };
        recorder.record(&attempt);
    }
}

// ============================================================================
// SECTION: Worker Pool
// ============================================================================

/// Builds the batch worker pool for the given settings.
fn build_pool(settings: &SigningSettings) -> Result<Option<Arc<ThreadPool>>, SigningError> {
    if !settings.parallel_processing {
        return Ok(None);
    }
    let workers = settings.max_workers.max(1);
    ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|index| format!("stamp-worker-{index}"))
        .build()
        .map(|pool| Some(Arc::new(pool)))
        .map_err(|err| SigningError::Internal(format!("worker pool build failed: {err}")))
}

// ============================================================================
// SECTION: In-Memory Recorder
// ============================================================================

/// In-memory verification recorder for tests and local demos.
#[derive(Debug, Default)]
pub struct InMemoryVerificationRecorder {
    /// Recorded attempts guarded by a mutex.
    attempts: Mutex<Vec<VerificationAttempt>>,
}

impl InMemoryVerificationRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded attempts.
    #[must_use]
    pub fn attempts(&self) -> Vec<VerificationAttempt> {
        self.attempts.lock().map_or_else(|_| Vec::new(), |guard| guard.clone())
    }
}

impl VerificationRecorder for InMemoryVerificationRecorder {
    fn record(&self, attempt: &VerificationAttempt) {
        if let Ok(mut guard) = self.attempts.lock() {
            guard.push(attempt.clone());
        } else {
            warn!("verification recorder lock poisoned; attempt dropped");
        }
    }
}
