// invoice-stamp-core/src/runtime/cache.rs
// ============================================================================
// Module: Signature Cache
// Description: Bounded, TTL-aware cache of signatures keyed by fingerprint.
// Purpose: Avoid redundant RSA signing of byte-identical invoices.
// Dependencies: lru, crate::core::canonical
// ============================================================================

//! ## Overview
//! The cache maps an invoice fingerprint to a previously computed inner
//! signature. Entries are immutable once written, expire after a TTL, and are
//! evicted least-recently-used once capacity is reached. An expired entry is
//! never returned; it is purged lazily on access or by an explicit sweep.
//!
//! The cache is a performance optimization, never a correctness dependency:
//! on any malfunction (including a poisoned lock) lookups degrade to misses
//! and callers fall back to direct signing. Two workers that miss on the same
//! fingerprint may both sign; last write wins, and both values are
//! cryptographically valid for the same bytes.
//!
//! Cached signatures are bound to the key that produced them. Callers must
//! invoke [`SignatureCache::clear`] when the signing key rotates or signing
//! settings change.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use lru::LruCache;
use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::core::canonical::Fingerprint;

// ============================================================================
// SECTION: Cache Entries
// ============================================================================

/// Internal cache slot; immutable apart from its hit counter.
struct CacheSlot {
    /// Cached inner base64 signature.
    blob: String,
    /// Monotonic creation time.
    created_at: Instant,
    /// Monotonic expiry bound.
    expires_at: Instant,
    /// Number of times this slot has been served.
    hit_count: u64,
}

/// Cached signature returned to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedSignature {
    /// Cached inner base64 signature.
    pub signature_blob: String,
    /// Number of times this entry has been served, including this lookup.
    pub hit_count: u64,
    /// Age of the entry at lookup time.
    pub age: Duration,
}

/// Cache observability counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheMetrics {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that fell through to direct signing.
    pub misses: u64,
    /// Hit ratio in `[0.0, 1.0]`; zero when no lookups occurred.
    pub hit_rate: f64,
    /// Live entries currently stored.
    pub entries: usize,
}

// ============================================================================
// SECTION: Signature Cache
// ============================================================================

/// Concurrency-safe signature cache with TTL and LRU eviction.
pub struct SignatureCache {
    /// Bounded LRU map guarded by a mutex.
    entries: Mutex<LruCache<Fingerprint, CacheSlot>>,
    /// Hit counter.
    hits: AtomicU64,
    /// Miss counter.
    misses: AtomicU64,
}

impl SignatureCache {
    /// Creates a cache with the given capacity (clamped to at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(non_zero_capacity(capacity))),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Looks up a signature by fingerprint.
    ///
    /// Returns `None` for absent or TTL-expired entries; expired entries are
    /// removed on access.
    #[must_use]
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<CachedSignature> {
        let now = Instant::now();
        let Ok(mut guard) = self.entries.lock() else {
            warn!("signature cache lock poisoned; treating lookup as a miss");
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };
        let cached = match guard.get_mut(fingerprint) {
            Some(slot) if slot.expires_at <= now => None,
            Some(slot) => {
                slot.hit_count = slot.hit_count.saturating_add(1);
                Some(CachedSignature {
                    signature_blob: slot.blob.clone(),
                    hit_count: slot.hit_count,
                    age: now.saturating_duration_since(slot.created_at),
                })
            }
            None => None,
        };
        if cached.is_none() {
            // Lazy purge: an expired slot is removed the moment it is seen.
            guard.pop(fingerprint);
        }
        drop(guard);
        if cached.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        cached
    }

    /// Stores a signature under a fingerprint with the given TTL.
    ///
    /// At capacity, the least-recently-used entry is evicted first. Writing
    /// an existing fingerprint replaces the slot (last write wins).
    pub fn put(&self, fingerprint: Fingerprint, signature_blob: String, ttl: Duration) {
        let now = Instant::now();
        let Ok(mut guard) = self.entries.lock() else {
            warn!("signature cache lock poisoned; dropping write");
            return;
        };
        guard.put(
            fingerprint,
            CacheSlot {
                blob: signature_blob,
                created_at: now,
                expires_at: now.checked_add(ttl).unwrap_or(now),
                hit_count: 0,
            },
        );
    }

    /// Empties the cache and resets hit/miss counters.
    ///
    /// Used when signing settings change or the signing key rotates; a
    /// signature computed under a previous key must never be served again.
    pub fn clear(&self) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.clear();
        } else {
            warn!("signature cache lock poisoned; counters reset without purge");
        }
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Resizes the cache, evicting least-recently-used entries as needed.
    pub fn resize(&self, capacity: usize) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.resize(non_zero_capacity(capacity));
        } else {
            warn!("signature cache lock poisoned; resize skipped");
        }
    }

    /// Removes all TTL-expired entries.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        let Ok(mut guard) = self.entries.lock() else {
            warn!("signature cache lock poisoned; sweep skipped");
            return;
        };
        let expired: Vec<Fingerprint> = guard
            .iter()
            .filter(|(_, slot)| slot.expires_at <= now)
            .map(|(fingerprint, _)| *fingerprint)
            .collect();
        for fingerprint in expired {
            guard.pop(&fingerprint);
        }
    }

    /// Returns the number of stored entries, including not-yet-purged
    /// expired ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |guard| guard.len())
    }

    /// Returns true when the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns hit/miss counters and the live entry count.
    #[must_use]
    pub fn metrics(&self) -> CacheMetrics {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits.saturating_add(misses);
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            hits as f64 / lookups as f64
        };
        CacheMetrics {
            hits,
            misses,
            hit_rate,
            entries: self.len(),
        }
    }
}

/// Clamps a capacity to the non-zero domain required by the LRU map.
fn non_zero_capacity(capacity: usize) -> NonZeroUsize {
    NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN)
}
