//! Runtime state and status snapshots for the lifecycle manager.

use std::collections::BTreeSet;
use serde::Serialize;

use crate::eviction::{CleanupTimer, SliceView};
use crate::slice::CleanupStrategy;

/// Mutable per-slice state, created on first `register_slice`.
#[derive(Debug)]
pub(crate) struct SliceRuntimeState {
    pub(crate) active_components: BTreeSet<String>,
    pub(crate) is_route_active: bool,
    /// Epoch millis
    pub(crate) last_accessed: u64,
    pub(crate) is_pinned: bool,
    /// Pending deferred eviction, at most one
    pub(crate) cleanup_timer: Option<CleanupTimer>,
}

impl SliceRuntimeState {
    pub(crate) fn new(now: u64) -> Self {
        Self {
            active_components: BTreeSet::new(),
            is_route_active: false,
            last_accessed: now,
            is_pinned: false,
            cleanup_timer: None,
        }
    }

    pub(crate) fn view(&self) -> SliceView {
        SliceView {
            active_components: self.active_components.len(),
            is_route_active: self.is_route_active,
            is_pinned: self.is_pinned,
            last_accessed: self.last_accessed,
        }
    }

    /// Take and cancel the pending timer. Returns whether one was pending.
    pub(crate) fn cancel_timer(&mut self) -> bool {
        match self.cleanup_timer.take() {
            Some(timer) => {
                timer.cancel();
                true
            }
            None => false,
        }
    }

    /// In use by a component or the current route.
    pub(crate) fn is_active(&self) -> bool {
        self.is_route_active || !self.active_components.is_empty()
    }
}

/// Point-in-time view of one slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceStatus {
    /// `None` if runtime state exists without config
    pub feature: Option<String>,
    pub strategy: Option<CleanupStrategy>,
    pub active_components: usize,
    pub component_ids: Vec<String>,
    pub is_route_active: bool,
    pub is_pinned: bool,
    /// Epoch millis
    pub last_accessed: u64,
    pub has_cleanup_timeout: bool,
}

impl std::fmt::Display for SliceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}[{}] components={} route={} pinned={} pending={}",
            self.feature.as_deref().unwrap_or("?"),
            self.strategy.map(|s| s.to_string()).unwrap_or_else(|| "?".into()),
            self.active_components,
            self.is_route_active,
            self.is_pinned,
            self.has_cleanup_timeout,
        )
    }
}

/// One slice's entry inside a [`FeatureStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureSliceStatus {
    pub name: String,
    /// Route-active or used by a component
    pub active: bool,
    pub components: usize,
    pub pinned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureStatus {
    pub slices: Vec<FeatureSliceStatus>,
    pub is_any_slice_active: bool,
}
