// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Fetch-side integration: staleness checks, keyed fetch deduplication and
//! the `smart_fetch` flow that ties them together.
//!
//! # Flow
//!
//! ```text
//! smart_fetch(slice, params)
//!       │
//!       ├─ force_refresh? ──────────────────────────┐
//!       ▼                                           │
//! should_fetch_data ── false ──► return store data  │
//!       │ true                                      │
//!       ▼                                           ▼
//! create_cache_key(slice, "fetch", params) ──► FetchCache::with_slice_cache
//!                                                   │
//!                               ┌───────────────────┼─────────────────┐
//!                           cache hit        join in-flight       run fetcher
//!                          (cached only)       request           (store if cached)
//! ```
//!
//! Fetch flows only hold a [`SliceManagerHandle`](crate::SliceManagerHandle).
//! Engine lookups that fail because the engine is gone degrade to defaults
//! (see [`integration`]).

mod cache_key;
pub mod integration;
mod params;
mod slice_cache;
mod smart_fetch;
mod staleness;

pub use cache_key::create_cache_key;
pub use params::{are_params_equal, FetchParams, ParamValue};
pub use slice_cache::{
    batch_cache_operations, BatchOperation, CacheOptions, FetchCache, FetchCacheStats, SliceCache,
};
pub use smart_fetch::{SmartFetchOptions, SmartFetcher};
pub use staleness::{should_fetch_data, DataPresence, FreshnessCheck, Selector};

use thiserror::Error;

/// Errors from fetch flows, generic over the fetcher's own error.
#[derive(Error, Debug)]
pub enum FetchError<E> {
    /// The fetcher itself failed
    #[error("fetch failed: {0}")]
    Fetch(#[source] E),

    /// Cancelled through the cancellation token
    #[error("fetch cancelled")]
    Cancelled,

    /// A coalesced request produced a value or error of a different type
    #[error("cached value for '{key}' has an unexpected type")]
    TypeMismatch { key: String },
}

impl<E> FetchError<E> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The fetcher error, if that is what this is.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Fetch(e) => Some(e),
            _ => None,
        }
    }
}
