//! Manual lifecycle controls: pinning and forced cleanup.

use tracing::debug;

use crate::slice::CleanupTrigger;

use super::SliceLifecycleManager;

impl SliceLifecycleManager {
    /// Pin a slice. Pinned slices are never evicted, and a pending cleanup
    /// is cancelled.
    pub fn pin_slice(&self, slice_name: &str) {
        let mut tables = self.shared.tables.lock();
        if let Some(state) = tables.states.get_mut(slice_name) {
            state.is_pinned = true;
            if state.cancel_timer() {
                crate::metrics::record_cleanup_cancelled("pin");
            }
            debug!(slice = %slice_name, "Slice pinned");
        }
    }

    /// Unpin a slice and re-run evaluation with a manual trigger.
    ///
    /// A `manual`-strategy slice is therefore evicted on unpin; other
    /// strategies follow their normal predicate.
    pub fn unpin_slice(&self, slice_name: &str) {
        let mut actions = Vec::new();
        {
            let mut guard = self.shared.tables.lock();
            let tables = &mut *guard;
            let Some(state) = tables.states.get_mut(slice_name) else {
                return;
            };
            state.is_pinned = false;
            self.evaluate_locked(tables, slice_name, CleanupTrigger::Manual, &mut actions);
            debug!(slice = %slice_name, "Slice unpinned");
        }
        self.flush(actions);
    }

    /// Evict a slice now, skipping the strategy predicate.
    ///
    /// The liveness re-check still applies: pinned slices, `component` slices
    /// with users and `route` slices on an active route are left alone.
    pub fn manual_cleanup(&self, slice_name: &str) {
        debug!(slice = %slice_name, "Manual cleanup requested");
        self.execute_slice_cleanup(slice_name);
    }

    /// [`manual_cleanup`](Self::manual_cleanup) for several slices.
    pub fn manual_cleanup_many<S: AsRef<str>>(&self, slice_names: &[S]) {
        let actions = {
            let mut tables = self.shared.tables.lock();
            let actions: Vec<_> = slice_names
                .iter()
                .filter_map(|name| self.execute_locked(&mut tables, name.as_ref()))
                .collect();
            actions
        };
        self.flush(actions);
    }

    /// Manually clean every slice of a feature. Unknown features are ignored.
    pub fn cleanup_feature(&self, feature_name: &str) {
        let actions = {
            let mut tables = self.shared.tables.lock();
            let Some(slices) = tables.features.get(feature_name).map(|f| f.slices.clone()) else {
                return;
            };
            let actions: Vec<_> = slices
                .iter()
                .filter_map(|name| self.execute_locked(&mut tables, name))
                .collect();
            debug!(feature = %feature_name, evicted = actions.len(), "Feature cleaned up");
            actions
        };
        self.flush(actions);
    }

    /// Manually clean every slice that is route-inactive, unused and unpinned.
    pub fn cleanup_all_inactive(&self) {
        let actions = {
            let mut tables = self.shared.tables.lock();
            let idle: Vec<String> = tables
                .states
                .iter()
                .filter(|(_, s)| !s.is_active() && !s.is_pinned)
                .map(|(name, _)| name.clone())
                .collect();
            let actions: Vec<_> = idle
                .iter()
                .filter_map(|name| self.execute_locked(&mut tables, name))
                .collect();
            actions
        };
        self.flush(actions);
    }
}
