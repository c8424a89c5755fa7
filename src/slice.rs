// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Static slice and feature configuration.
//!
//! A [`SliceConfig`] names one independently evictable partition of client
//! state and the [`CleanupStrategy`] that governs it. A [`FeatureRouteConfig`]
//! groups slices under a set of route patterns; navigating to a matching path
//! marks every slice of that feature as route-active.
//!
//! # Example
//!
//! ```
//! use slice_lifecycle::{SliceConfig, CleanupStrategy, FeatureRouteConfig};
//!
//! let posts = SliceConfig::new("posts", "blogDemo", CleanupStrategy::Cached)
//!     .with_cache_timeout(600_000)
//!     .with_reducer("cleanup");
//! assert_eq!(posts.reducer_name(), Some("cleanup"));
//!
//! let blog = FeatureRouteConfig::new("blogDemo", &[r"^/blog($|/)"], &["posts"]).unwrap();
//! assert!(blog.matches("/blog/42"));
//! assert!(!blog.matches("/wallet"));
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building configuration.
///
/// Registration itself never fails; these only surface when compiling
/// route patterns or parsing a manifest.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid route pattern '{pattern}' for feature '{feature}': {source}")]
    InvalidRoutePattern {
        feature: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Malformed slice manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// Eviction policy assigned to a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanupStrategy {
    /// Evict once no component depends on the slice
    Component,
    /// Evict once the owning feature's routes are inactive and no component depends on it
    Route,
    /// Evict once the cache timeout elapsed since last access
    Cached,
    /// Never evict automatically
    Persistent,
    /// Evict only on explicit request
    Manual,
}

impl std::fmt::Display for CleanupStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Component => write!(f, "component"),
            Self::Route => write!(f, "route"),
            Self::Cached => write!(f, "cached"),
            Self::Persistent => write!(f, "persistent"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// What prompted a cleanup evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupTrigger {
    /// A component unregistered
    Component,
    /// The owning feature's routes became inactive
    Route,
    /// Explicit request (unpin, manual strategy)
    Manual,
}

impl std::fmt::Display for CleanupTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Component => write!(f, "component"),
            Self::Route => write!(f, "route"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Immutable configuration of one slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceConfig {
    /// Unique slice name
    pub name: String,
    /// Owning feature name (not validated)
    pub feature: String,
    /// Eviction policy
    pub cleanup_strategy: CleanupStrategy,
    /// Delay before a scheduled eviction fires (ms). `None` or `0` uses the strategy default.
    #[serde(default)]
    pub cleanup_delay: Option<u64>,
    /// Freshness window for `cached` slices (ms). `None` uses the engine's
    /// `cache_timeout_ms`. Unlike `cleanup_delay`, `Some(0)` is honored: the
    /// slice counts as stale as soon as any time has passed since its last
    /// access.
    #[serde(default)]
    pub cache_timeout: Option<u64>,
    /// Action-type suffix dispatched on eviction (defaults to `reset`)
    #[serde(default)]
    pub cleanup_reducer_name: Option<String>,
}

impl SliceConfig {
    pub fn new(name: impl Into<String>, feature: impl Into<String>, cleanup_strategy: CleanupStrategy) -> Self {
        Self {
            name: name.into(),
            feature: feature.into(),
            cleanup_strategy,
            cleanup_delay: None,
            cache_timeout: None,
            cleanup_reducer_name: None,
        }
    }

    #[must_use]
    pub fn with_cleanup_delay(mut self, delay_ms: u64) -> Self {
        self.cleanup_delay = Some(delay_ms);
        self
    }

    #[must_use]
    pub fn with_cache_timeout(mut self, timeout_ms: u64) -> Self {
        self.cache_timeout = Some(timeout_ms);
        self
    }

    #[must_use]
    pub fn with_reducer(mut self, reducer_name: impl Into<String>) -> Self {
        self.cleanup_reducer_name = Some(reducer_name.into());
        self
    }

    /// Configured reducer suffix, ignoring empty strings.
    pub fn reducer_name(&self) -> Option<&str> {
        self.cleanup_reducer_name.as_deref().filter(|s| !s.is_empty())
    }

    /// Configured delay, treating `0` as unset.
    pub fn effective_delay(&self) -> Option<u64> {
        self.cleanup_delay.filter(|d| *d > 0)
    }
}

/// A feature: slices activated together by a set of route patterns.
#[derive(Debug, Clone)]
pub struct FeatureRouteConfig {
    pub name: String,
    /// Patterns tested in order; any match activates the feature
    pub routes: Vec<Regex>,
    pub slices: Vec<String>,
}

impl FeatureRouteConfig {
    /// Compile a feature from raw pattern strings.
    pub fn new(name: impl Into<String>, patterns: &[&str], slices: &[&str]) -> Result<Self, ConfigError> {
        let name = name.into();
        let routes = patterns
            .iter()
            .map(|p| compile_route(&name, p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name,
            routes,
            slices: slices.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Build from already-compiled patterns.
    pub fn from_regexes(name: impl Into<String>, routes: Vec<Regex>, slices: Vec<String>) -> Self {
        Self {
            name: name.into(),
            routes,
            slices,
        }
    }

    /// True if any route pattern matches `path`.
    pub fn matches(&self, path: &str) -> bool {
        self.routes.iter().any(|r| r.is_match(path))
    }
}

pub(crate) fn compile_route(feature: &str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidRoutePattern {
        feature: feature.to_string(),
        pattern: pattern.to_string(),
        source,
    })
}
