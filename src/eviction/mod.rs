//! Eviction policy for state slices.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Eviction Module                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │  policy.rs   - Strategy state machine (pure)                 │
//! │  └─ CleanupPolicy::decide: config + state → decision         │
//! │  └─ CleanupPolicy::should_abort: re-check before dispatch    │
//! ├──────────────────────────────────────────────────────────────┤
//! │  timer.rs    - Deferred eviction handle                      │
//! │  └─ CleanupTimer: one tokio task per pending eviction        │
//! │  └─ Generation ids so a superseded task exits quietly        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The lifecycle manager owns the state tables and calls into this module;
//! nothing here touches the registry or dispatches actions.

pub mod policy;
pub mod timer;

pub use policy::{CleanupDecision, CleanupPolicy, SliceView};
pub use timer::CleanupTimer;
