//! Engine queries used by fetch flows.
//!
//! Each query resolves the [`SliceManagerHandle`] first. When the engine has
//! been torn down the query logs a warning and returns a safe default, so a
//! fetch never fails just because lifecycle tracking went away.

use tracing::warn;

use crate::clock::{Clock, SystemClock};
use crate::config::SliceManagerConfig;
use crate::lifecycle::SliceManagerHandle;
use crate::slice::SliceConfig;

/// Slice config, or `None` when unknown or the engine is gone.
pub fn slice_config(handle: &SliceManagerHandle, slice_name: &str) -> Option<SliceConfig> {
    match handle.upgrade() {
        Some(manager) => manager.get_slice_config(slice_name),
        None => {
            warn!(slice = %slice_name, "Failed to get slice config: slice manager unavailable");
            None
        }
    }
}

/// Whether results for this slice go into the fetch cache. `false` on failure.
pub fn should_use_slice_cache(handle: &SliceManagerHandle, slice_name: &str) -> bool {
    match handle.upgrade() {
        Some(manager) => manager.is_slice_caching_enabled(slice_name),
        None => {
            warn!(slice = %slice_name, "Failed to check cache strategy: slice manager unavailable");
            false
        }
    }
}

/// Last access time (epoch millis). `0` on failure.
pub fn get_slice_last_accessed(handle: &SliceManagerHandle, slice_name: &str) -> u64 {
    match handle.upgrade() {
        Some(manager) => manager.get_slice_last_accessed(slice_name),
        None => {
            warn!(slice = %slice_name, "Failed to get last accessed time: slice manager unavailable");
            0
        }
    }
}

/// Bump the slice's access time. No-op on failure.
pub fn update_slice_access_time(handle: &SliceManagerHandle, slice_name: &str) {
    match handle.upgrade() {
        Some(manager) => manager.update_slice_access(slice_name),
        None => warn!(slice = %slice_name, "Failed to update access time: slice manager unavailable"),
    }
}

pub(crate) fn now_millis(handle: &SliceManagerHandle) -> u64 {
    handle
        .upgrade()
        .map_or_else(|| SystemClock.now_millis(), |manager| manager.now_millis())
}

pub(crate) fn default_cache_timeout(handle: &SliceManagerHandle) -> u64 {
    handle
        .upgrade()
        .map_or_else(|| SliceManagerConfig::default().cache_timeout_ms, |manager| manager.config().cache_timeout_ms)
}
