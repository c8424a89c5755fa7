// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! `smart_fetch`: check staleness, then fetch through the keyed cache.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::lifecycle::{SliceLifecycleManager, SliceManagerHandle};
use crate::slice::CleanupStrategy;

use super::cache_key::create_cache_key;
use super::integration;
use super::params::FetchParams;
use super::slice_cache::{CacheOptions, FetchCache, SliceCache};
use super::staleness::{should_fetch_data, DataPresence, FreshnessCheck, Selector};
use super::FetchError;

/// Options for [`SmartFetcher::smart_fetch`].
pub struct SmartFetchOptions<'f, S> {
    /// Skip the staleness check and the cache read
    pub force_refresh: bool,
    pub update_access_time: bool,
    pub ttl_ms: Option<u64>,
    /// Reads the language the stored data was fetched in
    pub language_selector: Option<Selector<'f, S, str>>,
    /// Reads the params of the last successful fetch; enables param tracking
    pub last_fetch_params_selector: Option<Selector<'f, S, FetchParams>>,
    /// Abort the fetch once this flips to `true`
    pub cancel: Option<watch::Receiver<bool>>,
}

impl<S> Default for SmartFetchOptions<'_, S> {
    fn default() -> Self {
        Self {
            force_refresh: false,
            update_access_time: true,
            ttl_ms: None,
            language_selector: None,
            last_fetch_params_selector: None,
            cancel: None,
        }
    }
}

impl<'f, S> SmartFetchOptions<'f, S> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn force_refresh(mut self) -> Self {
        self.force_refresh = true;
        self
    }

    #[must_use]
    pub fn with_language_selector(mut self, selector: Selector<'f, S, str>) -> Self {
        self.language_selector = Some(selector);
        self
    }

    #[must_use]
    pub fn with_last_fetch_params(mut self, selector: Selector<'f, S, FetchParams>) -> Self {
        self.last_fetch_params_selector = Some(selector);
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, token: watch::Receiver<bool>) -> Self {
        self.cancel = Some(token);
        self
    }

    fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            force_refresh: self.force_refresh,
            update_access_time: self.update_access_time,
            ttl_ms: self.ttl_ms,
        }
    }
}

/// Why an existing value was reused, for logs and metrics.
fn skip_reason(strategy: Option<CleanupStrategy>) -> &'static str {
    match strategy {
        Some(CleanupStrategy::Persistent) => "data is persistent",
        Some(CleanupStrategy::Manual) => "data requires manual cleanup",
        Some(CleanupStrategy::Component) => "component still active",
        Some(CleanupStrategy::Route) => "route still active",
        Some(CleanupStrategy::Cached) => "data is fresh",
        None => "data exists",
    }
}

/// Resolves once `token` reads `true`. Pends forever if the sender is
/// dropped first.
async fn cancelled(mut token: watch::Receiver<bool>) {
    if token.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Fetch flow entry point: a handle to the engine plus a keyed cache.
pub struct SmartFetcher<C = SliceCache> {
    handle: SliceManagerHandle,
    cache: Arc<C>,
}

impl SmartFetcher<SliceCache> {
    /// Fetcher with a fresh [`SliceCache`] bound to `manager`.
    pub fn from_manager(manager: &SliceLifecycleManager) -> Self {
        Self::new(manager.handle(), Arc::new(SliceCache::new(manager)))
    }
}

impl<C> Clone for SmartFetcher<C> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<C: FetchCache> SmartFetcher<C> {
    pub fn new(handle: SliceManagerHandle, cache: Arc<C>) -> Self {
        Self { handle, cache }
    }

    pub fn cache(&self) -> &Arc<C> {
        &self.cache
    }

    pub fn handle(&self) -> &SliceManagerHandle {
        &self.handle
    }

    /// See [`should_fetch_data`](super::should_fetch_data).
    pub fn should_fetch_data<S, D>(&self, state: &S, check: &FreshnessCheck<'_, S, D>) -> bool
    where
        D: DataPresence + ?Sized,
    {
        should_fetch_data(&self.handle, state, check)
    }

    /// Return existing data when it is still usable, otherwise fetch.
    ///
    /// The requested language is `params["language"]` when it is a string.
    /// The fetch goes through the cache under
    /// `create_cache_key(slice_name, "fetch", params)`.
    pub async fn smart_fetch<S, D, E, F, Fut>(
        &self,
        state: &S,
        slice_name: &str,
        params: &FetchParams,
        data_selector: Selector<'_, S, D>,
        fetcher: F,
        options: SmartFetchOptions<'_, S>,
    ) -> Result<D, FetchError<E>>
    where
        D: DataPresence + Clone + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<D, E>> + Send,
    {
        if !options.force_refresh {
            let mut check = FreshnessCheck::new(slice_name, data_selector)
                .with_language(options.language_selector, params.language());
            if options.last_fetch_params_selector.is_some() {
                check = check.with_params(params, options.last_fetch_params_selector);
            }

            if !should_fetch_data(&self.handle, state, &check) {
                if let Some(existing) = data_selector(state) {
                    let strategy = integration::slice_config(&self.handle, slice_name).map(|c| c.cleanup_strategy);
                    let reason = skip_reason(strategy);
                    debug!(slice = %slice_name, reason, "Skipping fetch");
                    crate::metrics::record_fetch_skipped(reason);
                    return Ok(existing.clone());
                }
            }
        }

        let cache_key = create_cache_key(slice_name, "fetch", Some(params));
        let fetch = self
            .cache
            .with_slice_cache(slice_name, &cache_key, fetcher, options.cache_options());

        match options.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = cancelled(token) => {
                    debug!(slice = %slice_name, "Fetch cancelled");
                    Err(FetchError::Cancelled)
                }
                result = fetch => result,
            },
            None => fetch.await,
        }
    }
}
