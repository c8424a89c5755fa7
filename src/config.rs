//! Configuration for the slice lifecycle engine.
//!
//! # Example
//!
//! ```
//! use slice_lifecycle::SliceManagerConfig;
//!
//! // Minimal config (uses defaults)
//! let config = SliceManagerConfig::default();
//! assert_eq!(config.component_cleanup_delay_ms, 2000);
//! assert_eq!(config.cache_timeout_ms, 300_000); // 5 minutes
//!
//! // Tuned config
//! let config = SliceManagerConfig {
//!     route_cleanup_delay_ms: 10_000,
//!     default_reducer_name: "cleanup".into(),
//!     ..Default::default()
//! };
//! ```

use serde::Deserialize;

/// Engine-wide defaults applied when a [`SliceConfig`](crate::SliceConfig)
/// leaves a field unset.
#[derive(Debug, Clone, Deserialize)]
pub struct SliceManagerConfig {
    /// Delay before evicting a `component` slice (default: 2 s)
    #[serde(default = "default_component_cleanup_delay_ms")]
    pub component_cleanup_delay_ms: u64,

    /// Delay before evicting a `route` slice (default: 5 s)
    #[serde(default = "default_route_cleanup_delay_ms")]
    pub route_cleanup_delay_ms: u64,

    /// Freshness window for `cached` slices (default: 5 min)
    #[serde(default = "default_cache_timeout_ms")]
    pub cache_timeout_ms: u64,

    /// Action-type suffix used when a slice names no reducer
    #[serde(default = "default_reducer_name")]
    pub default_reducer_name: String,

    /// TTL for fetch-cache entries when the slice has no `cache_timeout`
    #[serde(default = "default_fetch_cache_ttl_ms")]
    pub fetch_cache_ttl_ms: u64,
}

fn default_component_cleanup_delay_ms() -> u64 { 2000 }
fn default_route_cleanup_delay_ms() -> u64 { 5000 }
fn default_cache_timeout_ms() -> u64 { 300_000 } // 5 min
fn default_reducer_name() -> String { "reset".to_string() }
fn default_fetch_cache_ttl_ms() -> u64 { 300_000 }

impl Default for SliceManagerConfig {
    fn default() -> Self {
        Self {
            component_cleanup_delay_ms: default_component_cleanup_delay_ms(),
            route_cleanup_delay_ms: default_route_cleanup_delay_ms(),
            cache_timeout_ms: default_cache_timeout_ms(),
            default_reducer_name: default_reducer_name(),
            fetch_cache_ttl_ms: default_fetch_cache_ttl_ms(),
        }
    }
}
