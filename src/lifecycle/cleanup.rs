// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Cleanup evaluation, scheduling and execution.
//!
//! Evaluation asks [`CleanupPolicy::decide`] what to do. Deferred evictions
//! get a [`CleanupTimer`] that replaces any earlier one. Execution re-checks
//! liveness with [`CleanupPolicy::should_abort`] right before building the
//! reset action, so a slice that regained a user while the timer was pending
//! is never evicted.

use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::debug;

use crate::dispatch::SliceAction;
use crate::eviction::{CleanupDecision, CleanupPolicy, CleanupTimer};
use crate::slice::CleanupTrigger;

use super::{Shared, SliceLifecycleManager, Tables};

impl SliceLifecycleManager {
    /// Run the strategy state machine for one slice.
    ///
    /// No-op for unconfigured or pinned slices.
    pub fn evaluate_slice_cleanup(&self, slice_name: &str, trigger: CleanupTrigger) {
        let mut actions = Vec::new();
        {
            let mut tables = self.shared.tables.lock();
            self.evaluate_locked(&mut tables, slice_name, trigger, &mut actions);
        }
        self.flush(actions);
    }

    pub(crate) fn evaluate_locked(
        &self,
        tables: &mut Tables,
        slice_name: &str,
        trigger: CleanupTrigger,
        actions: &mut Vec<SliceAction>,
    ) {
        let now = self.now_millis();
        let (Some(config), Some(state)) = (tables.slices.get(slice_name), tables.states.get(slice_name)) else {
            return;
        };
        if state.is_pinned {
            return;
        }

        match self.shared.policy.decide(config, state.view(), trigger, now) {
            CleanupDecision::Keep => {}
            CleanupDecision::Immediate => {
                actions.extend(self.execute_locked(tables, slice_name));
            }
            CleanupDecision::Deferred(delay) => {
                self.schedule_locked(tables, slice_name, delay);
            }
        }
    }

    /// Cancel any pending timer, re-check liveness and dispatch the reset.
    ///
    /// This is what a deferred cleanup runs when its timer fires.
    pub fn execute_slice_cleanup(&self, slice_name: &str) {
        let action = {
            let mut tables = self.shared.tables.lock();
            self.execute_locked(&mut tables, slice_name)
        };
        self.flush(action.into_iter().collect());
    }

    /// Replace any pending timer for `slice_name` with a new one.
    fn schedule_locked(&self, tables: &mut Tables, slice_name: &str, delay: Duration) {
        tables.next_timer_id += 1;
        let timer_id = tables.next_timer_id;

        let Some(state) = tables.states.get_mut(slice_name) else {
            return;
        };
        state.cancel_timer();

        let weak = Arc::downgrade(&self.shared);
        let name = slice_name.to_string();
        state.cleanup_timer = CleanupTimer::spawn(timer_id, delay, move || {
            on_timer_fired(&weak, &name, timer_id);
        });

        if let Some(timer) = &state.cleanup_timer {
            debug!(slice = %slice_name, timer_id, delay_ms = timer.delay().as_millis() as u64, "Cleanup scheduled");
            crate::metrics::record_cleanup_scheduled();
        }
    }

    /// Clear the timer, re-check liveness and build the reset action.
    ///
    /// Returns `None` when the slice is unknown or the re-check aborts.
    pub(crate) fn execute_locked(&self, tables: &mut Tables, slice_name: &str) -> Option<SliceAction> {
        let config = tables.slices.get(slice_name)?;
        let state = tables.states.get_mut(slice_name)?;

        state.cancel_timer();

        if CleanupPolicy::should_abort(config, state.view()) {
            debug!(slice = %slice_name, "Cleanup aborted - conditions changed");
            crate::metrics::record_cleanup_aborted();
            return None;
        }

        let reducer = config
            .reducer_name()
            .unwrap_or(self.shared.config.default_reducer_name.as_str());
        let action = SliceAction::cleanup(&config.feature, slice_name, reducer, self.now_millis());

        debug!(feature = %config.feature, slice = %slice_name, action = %action.action_type, "Slice cleaned up");
        crate::metrics::record_eviction(&config.feature, slice_name);
        Some(action)
    }

    /// Whether a deferred eviction is pending for `slice_name`.
    #[must_use]
    pub fn has_pending_cleanup(&self, slice_name: &str) -> bool {
        self.shared
            .tables
            .lock()
            .states
            .get(slice_name)
            .is_some_and(|s| s.cleanup_timer.is_some())
    }
}

/// Timer callback. Runs on the tokio runtime.
fn on_timer_fired(weak: &Weak<Shared>, slice_name: &str, timer_id: u64) {
    let Some(shared) = weak.upgrade() else {
        return;
    };
    let manager = SliceLifecycleManager { shared };

    let action = {
        let mut tables = manager.shared.tables.lock();
        let current = tables
            .states
            .get(slice_name)
            .and_then(|s| s.cleanup_timer.as_ref())
            .map(CleanupTimer::id);
        if current != Some(timer_id) {
            // Cancelled or replaced after this task woke up
            debug!(slice = %slice_name, timer_id, "Stale cleanup timer ignored");
            return;
        }
        manager.execute_locked(&mut tables, slice_name)
    };

    manager.flush(action.into_iter().collect());
}
