//! Route activity evaluation.

use std::collections::{BTreeSet, HashSet};
use tracing::debug;

use crate::slice::CleanupTrigger;

use super::SliceLifecycleManager;

impl SliceLifecycleManager {
    /// Recompute route activity for `new_path`.
    ///
    /// A feature is active when any of its patterns matches. Only slices
    /// whose activity flips are touched: newly inactive slices are evaluated
    /// for cleanup, newly active ones have their pending cleanup cancelled
    /// and access time refreshed.
    pub fn handle_route_change(&self, new_path: &str) {
        let now = self.now_millis();
        let mut actions = Vec::new();

        {
            let mut guard = self.shared.tables.lock();
            let tables = &mut *guard;
            let previous_path = std::mem::replace(&mut tables.current_path, new_path.to_string());

            let mut active_features = BTreeSet::new();
            let mut active_slices: HashSet<&str> = HashSet::new();
            for (name, feature) in &tables.features {
                if feature.matches(new_path) {
                    active_features.insert(name.clone());
                    active_slices.extend(feature.slices.iter().map(String::as_str));
                }
            }

            let mut deactivated = Vec::new();
            for (slice_name, state) in tables.states.iter_mut() {
                let is_active = active_slices.contains(slice_name.as_str());
                if state.is_route_active == is_active {
                    continue;
                }
                state.is_route_active = is_active;

                if is_active {
                    if state.cancel_timer() {
                        debug!(slice = %slice_name, "Cleanup cancelled - route became active");
                        crate::metrics::record_cleanup_cancelled("route");
                    }
                    state.last_accessed = now;
                } else {
                    deactivated.push(slice_name.clone());
                }
            }

            for slice_name in &deactivated {
                self.evaluate_locked(tables, slice_name, CleanupTrigger::Route, &mut actions);
            }

            debug!(from = %previous_path, to = %new_path, active_features = ?active_features, "Route changed");
        }

        self.flush(actions);
    }

    /// Last path passed to [`handle_route_change`](Self::handle_route_change).
    #[must_use]
    pub fn current_path(&self) -> String {
        self.shared.tables.lock().current_path.clone()
    }
}
