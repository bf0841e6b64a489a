//! Session lifecycle management.
//!
//! This module provides the `SessionController` that owns:
//! - The `Idle → Initializing → Active → Closing` state machine
//! - The at-most-one-active-session-per-owner invariant
//! - Transcription backend bring-up under a pluggable backoff policy
//! - Graceful stop and process-level shutdown

mod controller;
pub mod retry;

pub use controller::{LifecycleState, SessionController};
pub use retry::{BackoffPolicy, FixedDelayBackoff};
