//! Component reference tracking.
//!
//! Components declare the slices they depend on when they mount and release
//! them when they unmount. A registration always wins over a pending
//! cleanup: the timer is cancelled in the same critical section.

use std::collections::HashSet;
use tracing::debug;

use crate::slice::CleanupTrigger;

use super::SliceLifecycleManager;

impl SliceLifecycleManager {
    /// Record that `component_id` depends on `slice_names`.
    ///
    /// Replaces any earlier declaration for the same id. Slices dropped from
    /// the declaration are released as if the component had unmounted from
    /// them. Unregistered slice names are remembered but otherwise ignored.
    pub fn register_component<S: AsRef<str>>(&self, component_id: &str, slice_names: &[S]) {
        let now = self.now_millis();
        let declared: HashSet<String> = slice_names.iter().map(|s| s.as_ref().to_string()).collect();
        let mut actions = Vec::new();

        {
            let mut guard = self.shared.tables.lock();
            let tables = &mut *guard;

            for slice_name in &declared {
                if let Some(state) = tables.states.get_mut(slice_name) {
                    state.active_components.insert(component_id.to_string());
                    state.last_accessed = now;
                    if state.cancel_timer() {
                        debug!(slice = %slice_name, component = %component_id, "Cleanup cancelled - component registered");
                        crate::metrics::record_cleanup_cancelled("component");
                    }
                }
            }

            let previous = tables.components.insert(component_id.to_string(), declared.clone());
            if let Some(previous) = previous {
                for released in previous.difference(&declared) {
                    if let Some(state) = tables.states.get_mut(released) {
                        state.active_components.remove(component_id);
                        self.evaluate_locked(tables, released, CleanupTrigger::Component, &mut actions);
                    }
                }
            }

            debug!(component = %component_id, slices = ?declared, "Component registered");
        }

        self.flush(actions);
    }

    /// Release every slice `component_id` declared and evaluate each for cleanup.
    pub fn unregister_component(&self, component_id: &str) {
        let mut actions = Vec::new();

        {
            let mut guard = self.shared.tables.lock();
            let tables = &mut *guard;

            let Some(declared) = tables.components.remove(component_id) else {
                return;
            };

            for slice_name in &declared {
                if let Some(state) = tables.states.get_mut(slice_name) {
                    state.active_components.remove(component_id);
                    self.evaluate_locked(tables, slice_name, CleanupTrigger::Component, &mut actions);
                }
            }
            debug!(component = %component_id, "Component unregistered");
        }

        self.flush(actions);
    }

    /// Number of mounted components currently tracked.
    #[must_use]
    pub fn tracked_components(&self) -> usize {
        self.shared.tables.lock().components.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::lifecycle::test_support::{recording_manager, types_of};
    use crate::slice::{CleanupStrategy, SliceConfig};

    #[test]
    fn test_register_adds_to_every_declared_slice() {
        let (manager, _, clock) = recording_manager(100);
        manager.register_slice(SliceConfig::new("posts", "blogDemo", CleanupStrategy::Cached));
        manager.register_slice(SliceConfig::new("authors", "blogDemo", CleanupStrategy::Cached));

        clock.set(500);
        manager.register_component("list", &["posts", "authors", "unknown"]);

        let status = manager.get_slice_status();
        assert_eq!(status["posts"].component_ids, vec!["list".to_string()]);
        assert_eq!(status["authors"].active_components, 1);
        assert_eq!(status["posts"].last_accessed, 500);
        assert!(!status.contains_key("unknown"));
        assert_eq!(manager.tracked_components(), 1);
    }

    #[test]
    fn test_unregister_unknown_component_is_noop() {
        let (manager, seen, _) = recording_manager(0);
        manager.unregister_component("ghost");
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_unregister_removes_from_all_slices() {
        let (manager, _, _) = recording_manager(0);
        manager.register_slice(SliceConfig::new("a", "f", CleanupStrategy::Persistent));
        manager.register_slice(SliceConfig::new("b", "f", CleanupStrategy::Persistent));
        manager.register_component("c1", &["a", "b"]);
        manager.register_component("c2", &["a"]);

        manager.unregister_component("c1");
        let status = manager.get_slice_status();
        assert_eq!(status["a"].component_ids, vec!["c2".to_string()]);
        assert_eq!(status["b"].active_components, 0);
        assert_eq!(manager.tracked_components(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_redeclaration_releases_dropped_slices() {
        let (manager, seen, _) = recording_manager(0);
        manager.register_slice(SliceConfig::new("comments", "blogDemo", CleanupStrategy::Component).with_reducer("cleanup"));
        manager.register_slice(SliceConfig::new("posts", "blogDemo", CleanupStrategy::Persistent));

        manager.register_component("view", &["comments", "posts"]);
        manager.register_component("view", &["posts"]);

        let status = manager.get_slice_status();
        assert_eq!(status["comments"].active_components, 0);
        assert!(status["comments"].has_cleanup_timeout);
        assert_eq!(status["posts"].active_components, 1);

        tokio::time::sleep(Duration::from_millis(2001)).await;
        assert_eq!(types_of(&seen), vec!["blogDemo/comments/cleanup".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_cancels_pending_cleanup() {
        let (manager, seen, _) = recording_manager(0);
        manager.register_slice(SliceConfig::new("wallet", "wallet", CleanupStrategy::Component));
        manager.register_component("A", &["wallet"]);
        manager.unregister_component("A");
        assert!(manager.get_slice_status()["wallet"].has_cleanup_timeout);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        manager.register_component("B", &["wallet"]);
        assert!(!manager.get_slice_status()["wallet"].has_cleanup_timeout);

        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert!(seen.lock().is_empty());
    }
}
