// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::time::Duration;

use crate::config::SliceManagerConfig;
use crate::slice::{CleanupStrategy, CleanupTrigger, SliceConfig};

/// Snapshot of the runtime facts the policy looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceView {
    pub active_components: usize,
    pub is_route_active: bool,
    pub is_pinned: bool,
    /// Epoch millis
    pub last_accessed: u64,
}

/// Outcome of a cleanup evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupDecision {
    /// Leave the slice alone
    Keep,
    /// Evict now
    Immediate,
    /// Evict after the delay unless something keeps the slice alive first
    Deferred(Duration),
}

/// Strategy state machine.
///
/// Holds the engine-wide defaults; per-slice values in [`SliceConfig`]
/// override them.
#[derive(Debug, Clone)]
pub struct CleanupPolicy {
    pub component_delay_ms: u64,
    pub route_delay_ms: u64,
    pub cache_timeout_ms: u64,
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        Self::from_config(&SliceManagerConfig::default())
    }
}

impl CleanupPolicy {
    pub fn from_config(config: &SliceManagerConfig) -> Self {
        Self {
            component_delay_ms: config.component_cleanup_delay_ms,
            route_delay_ms: config.route_cleanup_delay_ms,
            cache_timeout_ms: config.cache_timeout_ms,
        }
    }

    /// Freshness window of a slice (ms). An explicit `0` is kept, not
    /// replaced by the default.
    pub fn cache_timeout(&self, config: &SliceConfig) -> u64 {
        config.cache_timeout.unwrap_or(self.cache_timeout_ms)
    }

    /// True once strictly more than the cache timeout has passed since `last_accessed`.
    pub fn is_expired(&self, config: &SliceConfig, last_accessed: u64, now: u64) -> bool {
        now.saturating_sub(last_accessed) > self.cache_timeout(config)
    }

    /// Decide whether and when a slice should be evicted.
    pub fn decide(
        &self,
        config: &SliceConfig,
        view: SliceView,
        trigger: CleanupTrigger,
        now: u64,
    ) -> CleanupDecision {
        if view.is_pinned {
            return CleanupDecision::Keep;
        }

        let unused = view.active_components == 0;
        let (evict, delay_ms) = match config.cleanup_strategy {
            CleanupStrategy::Component => (
                unused,
                config.effective_delay().unwrap_or(self.component_delay_ms),
            ),
            CleanupStrategy::Route => (
                !view.is_route_active && unused,
                config.effective_delay().unwrap_or(self.route_delay_ms),
            ),
            CleanupStrategy::Cached => (
                unused && self.is_expired(config, view.last_accessed, now),
                0,
            ),
            CleanupStrategy::Persistent => (false, 0),
            CleanupStrategy::Manual => (trigger == CleanupTrigger::Manual, 0),
        };

        match (evict, delay_ms) {
            (false, _) => CleanupDecision::Keep,
            (true, 0) => CleanupDecision::Immediate,
            (true, ms) => CleanupDecision::Deferred(Duration::from_millis(ms)),
        }
    }

    /// Final check run right before dispatch.
    ///
    /// Returns true when the slice gained a reason to live since the
    /// eviction was decided. Only pins, components and route activity are
    /// re-checked; a forced cleanup of a `cached` or `manual` slice proceeds.
    pub fn should_abort(config: &SliceConfig, view: SliceView) -> bool {
        if view.is_pinned {
            return true;
        }
        match config.cleanup_strategy {
            CleanupStrategy::Component => view.active_components > 0,
            CleanupStrategy::Route => view.is_route_active || view.active_components > 0,
            _ => false,
        }
    }
}
