// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Staleness decision: should a data flow hit the network or reuse what the
//! store already holds?
//!
//! # Precedence
//!
//! ```text
//! no data ─────────────────────────► fetch
//! params tracked && params changed ─► fetch
//! language requested && differs ───► fetch
//! no slice config ─────────────────► reuse
//! cached ──────────► fetch iff now - last_accessed > cache_timeout
//! anything else ───────────────────► reuse
//! ```
//!
//! Param and language changes win over strategy, so a persistent slice still
//! refetches when the request changes.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

use crate::lifecycle::SliceManagerHandle;
use crate::slice::CleanupStrategy;

use super::integration;
use super::params::{are_params_equal, FetchParams};

/// Borrowing selector over application state.
pub type Selector<'f, S, T> = &'f (dyn for<'a> Fn(&'a S) -> Option<&'a T> + Send + Sync);

/// Whether selected data counts as "present". Empty collections do not.
pub trait DataPresence {
    fn has_data(&self) -> bool;
}

impl<T> DataPresence for Vec<T> {
    fn has_data(&self) -> bool {
        !self.is_empty()
    }
}

impl<T> DataPresence for [T] {
    fn has_data(&self) -> bool {
        !self.is_empty()
    }
}

impl DataPresence for String {
    fn has_data(&self) -> bool {
        !self.is_empty()
    }
}

impl DataPresence for str {
    fn has_data(&self) -> bool {
        !self.is_empty()
    }
}

impl<K, V> DataPresence for BTreeMap<K, V> {
    fn has_data(&self) -> bool {
        !self.is_empty()
    }
}

impl<K, V, H> DataPresence for HashMap<K, V, H> {
    fn has_data(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: DataPresence> DataPresence for Option<T> {
    fn has_data(&self) -> bool {
        self.as_ref().is_some_and(DataPresence::has_data)
    }
}

impl<T: DataPresence + ?Sized> DataPresence for Arc<T> {
    fn has_data(&self) -> bool {
        (**self).has_data()
    }
}

impl<T: DataPresence + ?Sized> DataPresence for Box<T> {
    fn has_data(&self) -> bool {
        (**self).has_data()
    }
}

impl DataPresence for serde_json::Value {
    fn has_data(&self) -> bool {
        use serde_json::Value;
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
        }
    }
}

/// Inputs to [`should_fetch_data`].
pub struct FreshnessCheck<'f, S, D: ?Sized> {
    pub slice_name: &'f str,
    pub data: Selector<'f, S, D>,
    pub language: Option<Selector<'f, S, str>>,
    pub requested_language: Option<&'f str>,
    pub params: Option<&'f FetchParams>,
    pub last_fetch_params: Option<Selector<'f, S, FetchParams>>,
}

impl<'f, S, D: ?Sized> FreshnessCheck<'f, S, D> {
    pub fn new(slice_name: &'f str, data: Selector<'f, S, D>) -> Self {
        Self {
            slice_name,
            data,
            language: None,
            requested_language: None,
            params: None,
            last_fetch_params: None,
        }
    }

    /// Refetch when the stored language differs from `requested`.
    #[must_use]
    pub fn with_language(mut self, selector: Option<Selector<'f, S, str>>, requested: Option<&'f str>) -> Self {
        self.language = selector;
        self.requested_language = requested;
        self
    }

    /// Refetch when `params` differ from the last recorded fetch params.
    /// Tracking is only active when both are given.
    #[must_use]
    pub fn with_params(mut self, params: &'f FetchParams, last: Option<Selector<'f, S, FetchParams>>) -> Self {
        self.params = Some(params);
        self.last_fetch_params = last;
        self
    }
}

/// Decide whether the caller must fetch.
///
/// Engine lookups go through `handle`; a dead engine means "no config",
/// which reuses existing data.
pub fn should_fetch_data<S, D>(handle: &SliceManagerHandle, state: &S, check: &FreshnessCheck<'_, S, D>) -> bool
where
    D: DataPresence + ?Sized,
{
    let slice = check.slice_name;

    if !(check.data)(state).is_some_and(DataPresence::has_data) {
        debug!(slice = %slice, "No data present, fetch required");
        return true;
    }

    if let (Some(params), Some(select_last)) = (check.params, check.last_fetch_params) {
        let last = select_last(state);
        if !are_params_equal(last, params) {
            debug!(slice = %slice, previous = ?last, current = ?params, "Params changed");
            return true;
        }
    }

    if let Some(requested) = check.requested_language {
        let stored = check.language.and_then(|select| select(state));
        if stored != Some(requested) {
            debug!(slice = %slice, stored = ?stored, requested = %requested, "Language changed");
            return true;
        }
    }

    let Some(config) = integration::slice_config(handle, slice) else {
        return false;
    };

    match config.cleanup_strategy {
        CleanupStrategy::Cached => {
            let timeout = config
                .cache_timeout
                .unwrap_or_else(|| integration::default_cache_timeout(handle));
            let last_accessed = integration::get_slice_last_accessed(handle, slice);
            let age = integration::now_millis(handle).saturating_sub(last_accessed);
            age > timeout
        }
        _ => false,
    }
}
