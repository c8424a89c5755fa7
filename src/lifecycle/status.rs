//! Access tracking and status reporting.

use std::collections::BTreeMap;

use crate::slice::CleanupStrategy;

use super::{FeatureSliceStatus, FeatureStatus, SliceLifecycleManager, SliceStatus};

impl SliceLifecycleManager {
    /// Mark a slice as accessed now. Unknown slices are ignored.
    pub fn update_slice_access(&self, slice_name: &str) {
        let now = self.now_millis();
        if let Some(state) = self.shared.tables.lock().states.get_mut(slice_name) {
            state.last_accessed = now;
        }
    }

    /// True iff the slice uses the `cached` strategy.
    #[must_use]
    pub fn is_slice_caching_enabled(&self, slice_name: &str) -> bool {
        self.shared
            .tables
            .lock()
            .slices
            .get(slice_name)
            .is_some_and(|c| c.cleanup_strategy == CleanupStrategy::Cached)
    }

    /// Last access (epoch millis), or `0` for unknown slices.
    #[must_use]
    pub fn get_slice_last_accessed(&self, slice_name: &str) -> u64 {
        self.shared
            .tables
            .lock()
            .states
            .get(slice_name)
            .map_or(0, |s| s.last_accessed)
    }

    /// Snapshot of every tracked slice, keyed by name.
    #[must_use]
    pub fn get_slice_status(&self) -> BTreeMap<String, SliceStatus> {
        let tables = self.shared.tables.lock();
        tables
            .states
            .iter()
            .map(|(name, state)| {
                let config = tables.slices.get(name);
                let status = SliceStatus {
                    feature: config.map(|c| c.feature.clone()),
                    strategy: config.map(|c| c.cleanup_strategy),
                    active_components: state.active_components.len(),
                    component_ids: state.active_components.iter().cloned().collect(),
                    is_route_active: state.is_route_active,
                    is_pinned: state.is_pinned,
                    last_accessed: state.last_accessed,
                    has_cleanup_timeout: state.cleanup_timer.is_some(),
                };
                (name.clone(), status)
            })
            .collect()
    }

    /// Snapshot of every registered feature and its slices.
    ///
    /// Slices named by a feature but never registered report as inactive.
    #[must_use]
    pub fn get_feature_status(&self) -> BTreeMap<String, FeatureStatus> {
        let tables = self.shared.tables.lock();
        tables
            .features
            .iter()
            .map(|(name, feature)| {
                let slices: Vec<FeatureSliceStatus> = feature
                    .slices
                    .iter()
                    .map(|slice_name| {
                        let state = tables.states.get(slice_name);
                        FeatureSliceStatus {
                            name: slice_name.clone(),
                            active: state.is_some_and(|s| s.is_active()),
                            components: state.map_or(0, |s| s.active_components.len()),
                            pinned: state.is_some_and(|s| s.is_pinned),
                        }
                    })
                    .collect();
                let is_any_slice_active = slices.iter().any(|s| s.active);
                (name.clone(), FeatureStatus { slices, is_any_slice_active })
            })
            .collect()
    }
}
