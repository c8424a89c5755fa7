// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Outbound reset actions.
//!
//! Eviction is the only point where the engine affects anything outside
//! itself: it emits a [`SliceAction`] through the injected [`Dispatch`] sink,
//! and the application's store reduces it (typically by resetting the slice).

use serde::Serialize;

/// Payload attached to every lifecycle reset action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupPayload {
    pub slice_name: String,
    pub feature: String,
    /// Epoch millis at dispatch time
    pub timestamp: u64,
    /// Always `"lifecycle"`
    pub trigger: &'static str,
}

/// A generic store action: `{type, payload}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SliceAction {
    #[serde(rename = "type")]
    pub action_type: String,
    pub payload: CleanupPayload,
}

impl SliceAction {
    /// Build the reset action `{feature}/{slice}/{reducer}`.
    pub fn cleanup(feature: &str, slice_name: &str, reducer: &str, timestamp: u64) -> Self {
        Self {
            action_type: format!("{}/{}/{}", feature, slice_name, reducer),
            payload: CleanupPayload {
                slice_name: slice_name.to_string(),
                feature: feature.to_string(),
                timestamp,
                trigger: "lifecycle",
            },
        }
    }
}

/// Sink for reset actions.
///
/// Called without any engine lock held, so implementations may call back
/// into the engine.
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, action: SliceAction);
}

impl<F> Dispatch for F
where
    F: Fn(SliceAction) + Send + Sync,
{
    fn dispatch(&self, action: SliceAction) {
        self(action)
    }
}
