// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Keyed fetch deduplication.
//!
//! [`FetchCache`] is the seam `smart_fetch` delegates to once it has decided
//! to go to the network. [`SliceCache`] is the in-process implementation:
//!
//! - Results are stored only for `cached`-strategy slices, with a TTL of the
//!   slice's `cache_timeout` (or the configured default). Other strategies
//!   rely on the application store plus the staleness check.
//! - Concurrent calls on the same key share one fetcher invocation, whatever
//!   the strategy, and all of them see its outcome. A failure is not retried
//!   by the callers that joined it. A leader dropped mid-fetch hands the key
//!   to one of its joiners.
//! - Keys are stored as `"{slice}:{cache_key}"`, so a slice's entries can be
//!   cleared by prefix.
//!
//! # Flow
//!
//! ```text
//! with_slice_cache(slice, key, fetcher)
//!       │
//!       ▼
//! ┌──────────────────────────────┐
//! │ cached && !force_refresh ?   │──► entry fresh? ──► Hit (bump access)
//! └──────────────────────────────┘
//!       │ miss / expired
//!       ▼
//! ┌──────────────────────────────┐
//! │ in_flight[key]               │──► present ──► await leader's outcome
//! └──────────────────────────────┘          (Ok or Err, shared)
//!       │ absent
//!       ▼
//! run fetcher ──► store (cached only) ──► publish ──► release slot
//! ```

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::any::Any;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::clock::Clock;
use crate::lifecycle::{SliceLifecycleManager, SliceManagerHandle};

use super::integration;
use super::FetchError;

type CachedValue = Arc<dyn Any + Send + Sync>;

/// What a leader publishes to callers that joined its fetch. The error side
/// is erased too; joiners downcast both to their own types.
type Outcome = Result<CachedValue, CachedValue>;

/// Receiving end of an in-flight fetch. `None` until the leader finishes.
type Flight = Arc<watch::Receiver<Option<Outcome>>>;

/// Per-call cache behaviour.
#[derive(Debug, Clone, Copy)]
pub struct CacheOptions {
    /// Skip the cache read (the result is still stored)
    pub force_refresh: bool,
    /// Bump the slice's access time after a hit or a fetch
    pub update_access_time: bool,
    /// Override the slice's TTL for the stored result
    pub ttl_ms: Option<u64>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            force_refresh: false,
            update_access_time: true,
            ttl_ms: None,
        }
    }
}

/// Keyed fetch wrapper.
#[async_trait]
pub trait FetchCache: Send + Sync {
    /// Return cached data for `cache_key` or run `fetcher`.
    ///
    /// Callers that arrive while a fetch for the same key is running share
    /// its outcome, errors included.
    async fn with_slice_cache<T, E, F, Fut>(
        &self,
        slice_name: &str,
        cache_key: &str,
        fetcher: F,
        options: CacheOptions,
    ) -> Result<T, FetchError<E>>
    where
        T: Clone + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send;
}

#[derive(Clone)]
struct CacheEntry {
    data: CachedValue,
    /// Key bytes plus the shallow size of the value
    size_bytes: usize,
    stored_at: u64,
    ttl_ms: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: u64) -> bool {
        now > self.stored_at.saturating_add(self.ttl_ms)
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct FetchCacheStats {
    /// Entries currently stored (including expired ones not yet cleaned)
    pub total_entries: usize,
    /// Approximate footprint in bytes: keys plus shallow value sizes.
    /// Heap data owned by a value (a `Vec`'s elements) is not counted.
    pub total_size: usize,
    pub expired_entries: usize,
    /// Entry count per slice name
    pub slice_breakdown: BTreeMap<String, usize>,
    pub hits: u64,
    pub misses: u64,
    /// Calls that joined an in-flight request
    pub coalesced: u64,
}

/// In-process [`FetchCache`].
pub struct SliceCache {
    /// "{slice}:{cache_key}" → stored result
    entries: DashMap<String, CacheEntry>,
    /// "{slice}:{cache_key}" → request currently running
    in_flight: DashMap<String, Flight>,
    handle: SliceManagerHandle,
    clock: Arc<dyn Clock>,
    default_ttl_ms: u64,
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
}

impl SliceCache {
    /// Cache bound to `manager`, sharing its clock and default TTL.
    pub fn new(manager: &SliceLifecycleManager) -> Self {
        Self::with_clock(
            manager.handle(),
            Arc::clone(&manager.shared.clock),
            manager.config().fetch_cache_ttl_ms,
        )
    }

    pub fn with_clock(handle: SliceManagerHandle, clock: Arc<dyn Clock>, default_ttl_ms: u64) -> Self {
        Self {
            entries: DashMap::new(),
            in_flight: DashMap::new(),
            handle,
            clock,
            default_ttl_ms,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            coalesced: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fresh cached value of type `T`. Expired entries are dropped on read.
    fn lookup<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        let now = self.clock.now_millis();
        let entry = self.entries.get(key)?;
        if entry.is_expired(now) {
            drop(entry); // Release read lock before removing
            self.entries.remove(key);
            debug!(key = %key, "Cache expired");
            return None;
        }
        let data = (*entry.data).downcast_ref::<T>().cloned();
        if data.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            crate::metrics::record_fetch_cache("hit");
            debug!(key = %key, "Cache hit");
        }
        data
    }

    fn store(&self, key: String, data: CachedValue, value_size: usize, ttl_ms: u64) {
        debug!(key = %key, ttl_ms, "Cache stored");
        let stored_at = self.clock.now_millis();
        let size_bytes = key.len() + value_size;
        self.entries.insert(key, CacheEntry { data, size_bytes, stored_at, ttl_ms });
        crate::metrics::set_fetch_cache_entries(self.entries.len());
    }

    /// Drop every entry of one slice. Returns the number removed.
    pub fn clear_slice(&self, slice_name: &str) -> usize {
        let prefix = format!("{}:", slice_name);
        self.remove_where(|key, _| key.starts_with(&prefix))
    }

    /// Drop everything. Returns the number removed.
    pub fn clear_all(&self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        crate::metrics::set_fetch_cache_entries(0);
        debug!(count, "All cache cleared");
        count
    }

    /// Drop a slice's entries whose key contains `fragment`.
    pub fn invalidate_matching(&self, slice_name: &str, fragment: &str) -> usize {
        let prefix = format!("{}:", slice_name);
        self.remove_where(|key, _| {
            key.strip_prefix(&prefix)
                .is_some_and(|rest| rest.contains(fragment))
        })
    }

    /// Drop expired entries. Returns the number removed.
    pub fn clean_expired(&self) -> usize {
        let now = self.clock.now_millis();
        self.remove_where(|_, entry| entry.is_expired(now))
    }

    fn remove_where(&self, mut predicate: impl FnMut(&str, &CacheEntry) -> bool) -> usize {
        let mut removed = 0;
        self.entries.retain(|key, entry| {
            let doomed = predicate(key.as_str(), &*entry);
            if doomed {
                removed += 1;
            }
            !doomed
        });
        if removed > 0 {
            debug!(removed, "Cache entries removed");
            crate::metrics::set_fetch_cache_entries(self.entries.len());
        }
        removed
    }

    pub fn stats(&self) -> FetchCacheStats {
        let now = self.clock.now_millis();
        let mut stats = FetchCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            ..Default::default()
        };
        for item in self.entries.iter() {
            stats.total_entries += 1;
            stats.total_size += item.value().size_bytes;
            if item.value().is_expired(now) {
                stats.expired_entries += 1;
            }
            if let Some((slice, _)) = item.key().split_once(':') {
                *stats.slice_breakdown.entry(slice.to_string()).or_insert(0) += 1;
            }
        }
        stats
    }
}

#[async_trait]
impl FetchCache for SliceCache {
    async fn with_slice_cache<T, E, F, Fut>(
        &self,
        slice_name: &str,
        cache_key: &str,
        fetcher: F,
        options: CacheOptions,
    ) -> Result<T, FetchError<E>>
    where
        T: Clone + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        let use_cache = integration::should_use_slice_cache(&self.handle, slice_name);
        let key = format!("{}:{}", slice_name, cache_key);

        if use_cache && !options.force_refresh {
            if let Some(data) = self.lookup::<T>(&key) {
                if options.update_access_time {
                    integration::update_slice_access_time(&self.handle, slice_name);
                }
                return Ok(data);
            }
        }

        loop {
            let (publisher, flight) = match self.in_flight.entry(key.clone()) {
                Entry::Occupied(e) => (None, Arc::clone(e.get())),
                Entry::Vacant(e) => {
                    let (tx, rx) = watch::channel(None);
                    let flight = Arc::new(rx);
                    e.insert(Arc::clone(&flight));
                    (Some(tx), flight)
                }
            };

            let Some(publisher) = publisher else {
                self.coalesced.fetch_add(1, Ordering::Relaxed);
                crate::metrics::record_fetch_cache("coalesced");
                debug!(key = %key, "Joining in-flight fetch");

                let mut rx = (*flight).clone();
                let finished = rx.wait_for(Option::is_some).await.is_ok();
                let published = if finished { (*rx.borrow()).clone() } else { None };
                let Some(outcome) = published else {
                    // Leader was dropped before finishing; race for the slot again
                    debug!(key = %key, "In-flight fetch abandoned");
                    continue;
                };
                return self.joined_outcome(slice_name, &key, outcome, options);
            };

            // Clears the in-flight slot even when this caller is dropped mid-fetch
            let slot = InFlightSlot {
                in_flight: &self.in_flight,
                key: &key,
                flight: &flight,
            };

            // A leader that finished between our read and our claim has already stored
            if use_cache && !options.force_refresh {
                if let Some(data) = self.lookup::<T>(&key) {
                    publisher.send_replace(Some(Ok(Arc::new(data.clone()) as CachedValue)));
                    drop(slot);
                    if options.update_access_time {
                        integration::update_slice_access_time(&self.handle, slice_name);
                    }
                    return Ok(data);
                }
            }

            self.misses.fetch_add(1, Ordering::Relaxed);
            crate::metrics::record_fetch_cache("miss");
            debug!(key = %key, "Fetching fresh data");

            let result = fetcher().await;
            let outcome: Outcome = match &result {
                Ok(data) => {
                    let value: CachedValue = Arc::new(data.clone());
                    if use_cache {
                        let ttl_ms = self.ttl_for(slice_name, options);
                        self.store(key.clone(), Arc::clone(&value), std::mem::size_of::<T>(), ttl_ms);
                    }
                    Ok(value)
                }
                Err(error) => {
                    debug!(key = %key, "Fetch failed");
                    Err(Arc::new(error.clone()) as CachedValue)
                }
            };

            // Stored and published before the slot is released
            publisher.send_replace(Some(outcome));
            drop(slot);

            if result.is_ok() && options.update_access_time {
                integration::update_slice_access_time(&self.handle, slice_name);
            }
            return result.map_err(FetchError::Fetch);
        }
    }
}

impl SliceCache {
    /// `ttl_ms` override, then the slice's `cache_timeout`, then the default.
    fn ttl_for(&self, slice_name: &str, options: CacheOptions) -> u64 {
        options
            .ttl_ms
            .or_else(|| integration::slice_config(&self.handle, slice_name).and_then(|c| c.cache_timeout))
            .unwrap_or(self.default_ttl_ms)
    }

    /// Turn a leader's published outcome into this caller's result.
    fn joined_outcome<T, E>(
        &self,
        slice_name: &str,
        key: &str,
        outcome: Outcome,
        options: CacheOptions,
    ) -> Result<T, FetchError<E>>
    where
        T: Clone + 'static,
        E: Clone + 'static,
    {
        let mismatch = || FetchError::TypeMismatch { key: key.to_string() };
        match outcome {
            Ok(value) => {
                let data = (*value).downcast_ref::<T>().cloned().ok_or_else(mismatch)?;
                if options.update_access_time {
                    integration::update_slice_access_time(&self.handle, slice_name);
                }
                Ok(data)
            }
            Err(error) => {
                let error = (*error).downcast_ref::<E>().cloned().ok_or_else(mismatch)?;
                Err(FetchError::Fetch(error))
            }
        }
    }
}

struct InFlightSlot<'a> {
    in_flight: &'a DashMap<String, Flight>,
    key: &'a str,
    flight: &'a Flight,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.in_flight
            .remove_if(self.key, |_, current| Arc::ptr_eq(current, self.flight));
    }
}

impl std::fmt::Debug for SliceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SliceCache")
            .field("entries", &self.entries.len())
            .field("in_flight", &self.in_flight.len())
            .field("default_ttl_ms", &self.default_ttl_ms)
            .finish()
    }
}

/// One keyed fetch for [`batch_cache_operations`].
pub struct BatchOperation<F> {
    pub slice_name: String,
    pub cache_key: String,
    pub fetcher: F,
    pub options: CacheOptions,
}

impl<F> BatchOperation<F> {
    pub fn new(slice_name: impl Into<String>, cache_key: impl Into<String>, fetcher: F) -> Self {
        Self {
            slice_name: slice_name.into(),
            cache_key: cache_key.into(),
            fetcher,
            options: CacheOptions::default(),
        }
    }
}

/// Run several keyed fetches concurrently. Results keep input order.
///
/// Each operation runs on its own tokio task, so this needs a runtime.
pub async fn batch_cache_operations<C, T, E, F, Fut>(
    cache: &Arc<C>,
    operations: Vec<BatchOperation<F>>,
) -> Vec<Result<T, FetchError<E>>>
where
    C: FetchCache + 'static,
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let tasks: Vec<_> = operations
        .into_iter()
        .map(|op| {
            let cache = Arc::clone(cache);
            tokio::spawn(async move {
                cache
                    .with_slice_cache(&op.slice_name, &op.cache_key, op.fetcher, op.options)
                    .await
            })
        })
        .collect();

    let mut results = Vec::with_capacity(tasks.len());
    for task in tasks {
        results.push(match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(FetchError::Cancelled),
        });
    }
    results
}
