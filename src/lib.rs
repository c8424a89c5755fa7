//! # Slice Lifecycle
//!
//! Lifecycle and staleness management for named partitions ("slices") of a
//! client-side application store.
//!
//! ## Architecture
//!
//! The engine reconciles three asynchronous signals into one eviction decision
//! per slice, and answers "is existing data still good enough?" for fetch flows:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Signals (caller-driven)                 │
//! │  • component mount / unmount                               │
//! │  • route change                                            │
//! │  • pin / unpin / manual cleanup                            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  SliceLifecycleManager                      │
//! │  • registry (slices, features, components)                 │
//! │  • per-slice runtime state                                 │
//! │  • CleanupPolicy decides Keep / Immediate / Deferred       │
//! │  • CleanupTimer (tokio) for deferred eviction              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                   (re-check, then dispatch)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Dispatch sink (the store)                  │
//! │  • "{feature}/{slice}/{reducer}" reset action              │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Fetch flows (fetch::*)                   │
//! │  • should_fetch_data: data / params / language / TTL       │
//! │  • SmartFetcher::smart_fetch → FetchCache (SliceCache)     │
//! │  • hold a SliceManagerHandle (weak), degrade to defaults   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use slice_lifecycle::{
//!     CleanupStrategy, FeatureRouteConfig, SliceAction, SliceConfig, SliceLifecycleManager,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = SliceLifecycleManager::new(|action: SliceAction| {
//!         println!("dispatch {}", action.action_type);
//!     });
//!
//!     manager.register_feature(
//!         FeatureRouteConfig::new("wallet", &["^/wallet"], &["wallet"]).expect("valid pattern"),
//!     );
//!     manager.register_slice(SliceConfig::new("wallet", "wallet", CleanupStrategy::Component));
//!
//!     manager.register_component("WalletPanel", &["wallet"]);
//!     manager.unregister_component("WalletPanel");
//!
//!     // Two seconds later "wallet/wallet/reset" is dispatched,
//!     // unless something declares the slice again first.
//!     tokio::time::sleep(std::time::Duration::from_millis(2100)).await;
//! }
//! ```
//!
//! ## Cleanup Strategies
//!
//! - **component**: evict when no mounted component uses the slice (delay 2s)
//! - **route**: evict when the route is inactive and no component uses it (delay 5s)
//! - **cached**: evict when idle longer than the cache timeout (default 5 min)
//! - **persistent**: never evicted automatically
//! - **manual**: evicted only on explicit request
//!
//! Pinned slices are never evicted under any strategy.
//!
//! ## Configuration
//!
//! See [`SliceManagerConfig`] for engine-wide defaults and [`SliceManifest`]
//! for declaring features and slices in JSON.
//!
//! ## Modules
//!
//! - [`lifecycle`]: The [`SliceLifecycleManager`] and its status types
//! - [`eviction`]: Pure cleanup policy and cancellable timers
//! - [`fetch`]: Staleness checks, keyed fetch cache, smart fetch
//! - [`slice`]: Slice and feature configuration
//! - [`manifest`]: JSON bootstrap manifest
//! - [`dispatch`]: Reset actions and the dispatch sink
//! - [`clock`]: Time source abstraction

pub mod config;
pub mod slice;
pub mod manifest;
pub mod clock;
pub mod dispatch;
pub mod eviction;
pub mod lifecycle;
pub mod fetch;
pub mod metrics;

pub use config::SliceManagerConfig;
pub use slice::{CleanupStrategy, CleanupTrigger, ConfigError, FeatureRouteConfig, SliceConfig};
pub use manifest::{FeatureManifest, SliceManifest};
pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatch::{CleanupPayload, Dispatch, SliceAction};
pub use eviction::{CleanupDecision, CleanupPolicy};
pub use lifecycle::{FeatureSliceStatus, FeatureStatus, SliceLifecycleManager, SliceManagerHandle, SliceStatus};
pub use fetch::{
    are_params_equal, create_cache_key, should_fetch_data, CacheOptions, FetchCache, FetchError, FetchParams,
    FreshnessCheck, ParamValue, SliceCache, SmartFetchOptions, SmartFetcher,
};
