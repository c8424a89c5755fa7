// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Cancellable deferred eviction.
//!
//! A [`CleanupTimer`] is an owned handle to a tokio task that sleeps for the
//! cleanup delay and then runs a callback. Cancelling aborts the task. Abort
//! only takes effect at an await point, so the callback may still run after a
//! cancel if it had already woken; callers compare [`CleanupTimer::id`]
//! against the slice's current timer to detect that case.

use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::warn;

#[derive(Debug)]
pub struct CleanupTimer {
    id: u64,
    delay: Duration,
    task: JoinHandle<()>,
}

impl CleanupTimer {
    /// Spawn a timer on the current tokio runtime.
    ///
    /// Returns `None` when called outside a runtime; the eviction is then
    /// simply not scheduled.
    pub fn spawn<F>(id: u64, delay: Duration, on_fire: F) -> Option<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(delay_ms = delay.as_millis() as u64, "No tokio runtime - deferred cleanup not scheduled");
                return None;
            }
        };

        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire();
        });

        Some(Self { id, delay, task })
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn cancel(self) {
        self.task.abort();
    }
}
