// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for slice-lifecycle.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The host application is responsible for installing a recorder/exporter.
//!
//! # Metric Naming Convention
//! - `slice_lifecycle_` prefix for all metrics
//! - `_total` suffix for counters
//!
//! # Labels
//! - `feature`, `slice`: slice identity (evictions only)
//! - `reason`: why a cleanup was cancelled or a fetch skipped
//! - `outcome`: fetch-cache result (hit, miss, coalesced)

use metrics::{counter, gauge};

/// Record a dispatched eviction
pub fn record_eviction(feature: &str, slice: &str) {
    counter!(
        "slice_lifecycle_evictions_total",
        "feature" => feature.to_string(),
        "slice" => slice.to_string()
    )
    .increment(1);
}

/// Record a deferred eviction being scheduled
pub fn record_cleanup_scheduled() {
    counter!("slice_lifecycle_cleanups_scheduled_total").increment(1);
}

/// Record a pending eviction cancelled by a keep-alive event (component, route, pin)
pub fn record_cleanup_cancelled(reason: &str) {
    counter!(
        "slice_lifecycle_cleanups_cancelled_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record an eviction aborted by the final re-check
pub fn record_cleanup_aborted() {
    counter!("slice_lifecycle_cleanups_aborted_total").increment(1);
}

/// Set number of slices with runtime state
pub fn set_tracked_slices(count: usize) {
    gauge!("slice_lifecycle_tracked_slices").set(count as f64);
}

/// Record a fetch skipped because existing data was reusable
pub fn record_fetch_skipped(reason: &str) {
    counter!(
        "slice_lifecycle_fetch_skipped_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record a fetch-cache lookup result
pub fn record_fetch_cache(outcome: &str) {
    counter!(
        "slice_lifecycle_fetch_cache_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Set fetch-cache entry count
pub fn set_fetch_cache_entries(count: usize) {
    gauge!("slice_lifecycle_fetch_cache_entries").set(count as f64);
}
