// invoice-stamp-core/src/runtime/optimizer.rs
// ============================================================================
// Module: Batch Signing Optimizer
// Description: Cache-aware signing of invoice batches across a worker pool.
// Purpose: Fan signing work out while preserving input order and isolation.
// Dependencies: crate::runtime::{cache, signer}, base64, rayon
// ============================================================================

//! ## Overview
//! The optimizer routes every invoice through one cache-checked signing path.
//! Batches fan out across a bounded rayon pool; results are reassembled in
//! input order regardless of worker completion order, and one item's failure
//! never aborts its siblings. Signing identical canonical bytes twice under
//! the same key yields distinct but equally valid signatures (PSS salts are
//! random), so concurrent misses on one fingerprint are tolerated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64;
use rayon::ThreadPool;
use rayon::prelude::*;

use crate::core::canonical::fingerprint_bytes;
use crate::core::invoice::InvoiceDocument;
use crate::core::stamp::CryptographicStamp;
use crate::interfaces::KeyHandle;
use crate::runtime::cache::SignatureCache;
use crate::runtime::signer::SigningError;
use crate::runtime::signer::sign_bytes;
use crate::runtime::signer::signable_bytes;
use crate::runtime::signer::stamp_from_inner;

// ============================================================================
// SECTION: Cache-Checked Signing
// ============================================================================

/// Signs one invoice, consulting the cache when one is supplied.
///
/// On a hit the cached signature is re-enveloped with a fresh timestamp; on a
/// miss the invoice is signed and the cache populated. Without a cache the
/// invoice is signed directly.
pub(crate) fn sign_item(
    invoice: &InvoiceDocument,
    key: &KeyHandle,
    cache: Option<&SignatureCache>,
    ttl: Duration,
    version: &str,
) -> Result<CryptographicStamp, SigningError> {
    let bytes = signable_bytes(invoice)?;
    if let Some(cache) = cache {
        let fingerprint = fingerprint_bytes(&bytes);
        if let Some(hit) = cache.get(&fingerprint) {
            return stamp_from_inner(&hit.signature_blob, version);
        }
        let signature = sign_bytes(&bytes, key)?;
        let inner = Base64.encode(signature);
        cache.put(fingerprint, inner.clone(), ttl);
        return stamp_from_inner(&inner, version);
    }
    let signature = sign_bytes(&bytes, key)?;
    stamp_from_inner(&Base64.encode(signature), version)
}

// ============================================================================
// SECTION: Batch Execution
// ============================================================================

/// Runs a signing closure over a batch, preserving input order.
///
/// With a pool, items are signed concurrently and collected back into input
/// order; without one, items are signed sequentially. The closure is invoked
/// once per invoice and its per-item result lands in the matching slot.
pub(crate) fn execute_batch<F>(
    pool: Option<&ThreadPool>,
    invoices: &[InvoiceDocument],
    sign_one: F,
) -> Vec<Result<CryptographicStamp, SigningError>>
where
    F: Fn(&InvoiceDocument) -> Result<CryptographicStamp, SigningError> + Sync,
{
    match pool {
        Some(pool) => pool.install(|| invoices.par_iter().map(&sign_one).collect()),
        None => invoices.iter().map(&sign_one).collect(),
    }
}
