// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Slice lifecycle manager.
//!
//! The [`SliceLifecycleManager`] reconciles three independent signals into
//! one eviction decision per slice:
//! - component mount/unmount ([`register_component`](SliceLifecycleManager::register_component) /
//!   [`unregister_component`](SliceLifecycleManager::unregister_component))
//! - navigation ([`handle_route_change`](SliceLifecycleManager::handle_route_change))
//! - explicit controls (pin, unpin, manual cleanup)
//!
//! # Flow
//!
//! ```text
//!  mount ──────► register_component ──► cancel pending timer
//!  unmount ────► unregister_component ─┐
//!  navigate ───► handle_route_change ──┼─► evaluate (CleanupPolicy::decide)
//!  unpin ──────► unpin_slice ──────────┘        │
//!                                     ┌─────────┼──────────┐
//!                                   Keep    Deferred     Immediate
//!                                              │            │
//!                                        CleanupTimer       │
//!                                              └──► execute ◄┘
//!                                                     │ re-check
//!                                                     ▼
//!                                            Dispatch(SliceAction)
//! ```
//!
//! # Example
//!
//! ```
//! use slice_lifecycle::{SliceLifecycleManager, SliceConfig, CleanupStrategy, SliceAction};
//!
//! let manager = SliceLifecycleManager::new(|action: SliceAction| {
//!     println!("reset: {}", action.action_type);
//! });
//! manager.register_slice(SliceConfig::new("categories", "blogDemo", CleanupStrategy::Persistent));
//! manager.register_component("sidebar", &["categories"]);
//!
//! let status = manager.get_slice_status();
//! assert_eq!(status["categories"].active_components, 1);
//! ```
//!
//! # Thread Safety
//!
//! The manager is a cheap `Clone` handle. All state lives behind one
//! `parking_lot::Mutex`; every public operation completes its state change
//! (including timer cancellation) inside one critical section. Actions are
//! dispatched after the lock is released.
//!
//! Deferred evictions need a tokio runtime; see
//! [`SliceLifecycleManager`](crate::SliceLifecycleManager#runtime).

mod types;
mod registry;
mod components;
mod routes;
mod cleanup;
mod manual;
mod status;

pub use types::{FeatureSliceStatus, FeatureStatus, SliceStatus};
pub(crate) use types::SliceRuntimeState;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Weak};
use parking_lot::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::config::SliceManagerConfig;
use crate::dispatch::{Dispatch, SliceAction};
use crate::eviction::CleanupPolicy;
use crate::slice::{FeatureRouteConfig, SliceConfig};

/// Registry and runtime tables. Only ever touched under `Shared::tables`.
#[derive(Default)]
pub(crate) struct Tables {
    pub(crate) slices: HashMap<String, SliceConfig>,
    pub(crate) states: BTreeMap<String, SliceRuntimeState>,
    pub(crate) features: BTreeMap<String, FeatureRouteConfig>,
    /// component id → declared slice names
    pub(crate) components: HashMap<String, HashSet<String>>,
    pub(crate) current_path: String,
    pub(crate) next_timer_id: u64,
}

pub(crate) struct Shared {
    pub(crate) tables: Mutex<Tables>,
    pub(crate) policy: CleanupPolicy,
    pub(crate) config: SliceManagerConfig,
    pub(crate) dispatch: Arc<dyn Dispatch>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        for state in self.tables.get_mut().states.values_mut() {
            state.cancel_timer();
        }
    }
}

/// The lifecycle engine.
///
/// Construct once at bootstrap and pass it (or a [`SliceManagerHandle`])
/// to whatever needs it.
///
/// # Runtime
///
/// Deferred evictions (`component` and `route` strategies) run on tokio
/// timers spawned from the calling context. When an operation that would
/// schedule one runs outside a tokio runtime, the eviction is dropped with a
/// `warn!` and [`has_pending_cleanup`](Self::has_pending_cleanup) stays
/// `false`. Immediate evictions (`cached`, `manual`, manual controls) and
/// every query work without a runtime.
#[derive(Clone)]
pub struct SliceLifecycleManager {
    pub(crate) shared: Arc<Shared>,
}

impl SliceLifecycleManager {
    /// Create an engine with default config and the system clock.
    pub fn new(dispatch: impl Dispatch + 'static) -> Self {
        Self::with_config(SliceManagerConfig::default(), Arc::new(dispatch), Arc::new(SystemClock))
    }

    /// Create an engine with explicit config, sink and clock.
    pub fn with_config(
        config: SliceManagerConfig,
        dispatch: Arc<dyn Dispatch>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: Mutex::new(Tables::default()),
                policy: CleanupPolicy::from_config(&config),
                config,
                dispatch,
                clock,
            }),
        }
    }

    /// Engine-wide defaults.
    #[must_use]
    pub fn config(&self) -> &SliceManagerConfig {
        &self.shared.config
    }

    #[must_use]
    pub fn policy(&self) -> &CleanupPolicy {
        &self.shared.policy
    }

    /// Current time according to the engine clock (epoch millis).
    #[must_use]
    pub fn now_millis(&self) -> u64 {
        self.shared.clock.now_millis()
    }

    /// A non-owning handle for data-fetch flows.
    #[must_use]
    pub fn handle(&self) -> SliceManagerHandle {
        SliceManagerHandle {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Send collected actions to the sink. Must be called without the lock held.
    pub(crate) fn flush(&self, actions: Vec<SliceAction>) {
        for action in actions {
            self.shared.dispatch.dispatch(action);
        }
    }
}

/// Weak reference to an engine.
///
/// Fetch flows hold this instead of the engine itself, so a torn-down
/// engine degrades their queries to defaults rather than keeping it alive.
#[derive(Clone, Default)]
pub struct SliceManagerHandle {
    shared: Weak<Shared>,
}

impl SliceManagerHandle {
    /// A handle that never resolves.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn upgrade(&self) -> Option<SliceLifecycleManager> {
        self.shared.upgrade().map(|shared| SliceLifecycleManager { shared })
    }
}

impl std::fmt::Debug for SliceLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.shared.tables.lock();
        f.debug_struct("SliceLifecycleManager")
            .field("slices", &tables.slices.len())
            .field("features", &tables.features.len())
            .field("components", &tables.components.len())
            .field("current_path", &tables.current_path)
            .finish()
    }
}

impl std::fmt::Debug for SliceManagerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SliceManagerHandle")
            .field("alive", &(self.shared.strong_count() > 0))
            .finish()
    }
}
