// invoice-stamp-core/src/runtime/metrics.rs
// ============================================================================
// Module: Signing Metrics
// Description: Process-wide counters and timings for stamp generation.
// Purpose: Provide a single, lock-guarded accumulation point for workers.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Metrics accumulate for the life of the owning service and reset only via
//! an explicit [`SigningMetrics::reset`] call, never silently. Concurrent
//! workers funnel updates through one mutex-guarded accumulator rather than
//! racing on individual counters, so snapshots are internally consistent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

// ============================================================================
// SECTION: Accumulator
// ============================================================================

/// Interior accumulator state guarded by the metrics mutex.
#[derive(Debug, Default, Clone)]
struct MetricsInner {
    /// Stamps generated successfully.
    generated: u64,
    /// Generation attempts that failed.
    failed: u64,
    /// Cumulative generation time across successes.
    total: Duration,
    /// Fastest observed generation, when any.
    min: Option<Duration>,
    /// Slowest observed generation.
    max: Duration,
}

/// Thread-safe signing metrics accumulator.
#[derive(Debug, Default)]
pub struct SigningMetrics {
    /// Accumulator state.
    inner: Mutex<MetricsInner>,
}

impl SigningMetrics {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one successful generation with its elapsed time.
    pub fn record_generation(&self, elapsed: Duration) {
        let Ok(mut guard) = self.inner.lock() else {
            warn!("signing metrics lock poisoned; sample dropped");
            return;
        };
        guard.generated = guard.generated.saturating_add(1);
        guard.total = guard.total.saturating_add(elapsed);
        guard.min = Some(guard.min.map_or(elapsed, |min| min.min(elapsed)));
        guard.max = guard.max.max(elapsed);
    }

    /// Records one failed generation attempt.
    pub fn record_failure(&self) {
        let Ok(mut guard) = self.inner.lock() else {
            warn!("signing metrics lock poisoned; sample dropped");
            return;
        };
        guard.failed = guard.failed.saturating_add(1);
    }

    /// Returns a consistent snapshot of the accumulated values.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let Ok(guard) = self.inner.lock() else {
            warn!("signing metrics lock poisoned; returning empty snapshot");
            return MetricsSnapshot::default();
        };
        let average_ms = if guard.generated == 0 {
            0.0
        } else {
            duration_ms(guard.total) / guard.generated as f64
        };
        MetricsSnapshot {
            generated: guard.generated,
            failed: guard.failed,
            total_ms: duration_ms(guard.total),
            average_ms,
            min_ms: guard.min.map_or(0.0, duration_ms),
            max_ms: duration_ms(guard.max),
        }
    }

    /// Clears all counters and timings.
    pub fn reset(&self) {
        let Ok(mut guard) = self.inner.lock() else {
            warn!("signing metrics lock poisoned; reset skipped");
            return;
        };
        *guard = MetricsInner::default();
    }
}

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// Point-in-time view of signing metrics.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Stamps generated successfully.
    pub generated: u64,
    /// Generation attempts that failed.
    pub failed: u64,
    /// Cumulative generation time in milliseconds.
    pub total_ms: f64,
    /// Average generation time in milliseconds; zero when nothing generated.
    pub average_ms: f64,
    /// Fastest generation in milliseconds; zero when nothing generated.
    pub min_ms: f64,
    /// Slowest generation in milliseconds; zero when nothing generated.
    pub max_ms: f64,
}

/// Converts a duration to fractional milliseconds.
fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000.0
}
