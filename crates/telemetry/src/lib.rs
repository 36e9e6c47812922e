//! SLI accounting and error tracking for chatloop.
//!
//! Implements the telemetry seams from `chatloop-core`: an in-process
//! `SliEngine` for the first-token error-rate and apdex series, and error
//! trackers that log or retain every tracked execution failure.

pub mod engine;
pub mod model;
pub mod tracker;

pub use engine::SliEngine;
pub use model::{FIRST_TOKEN_SLI, SliCounter, SliKind, SliSnapshot, TrackedError};
pub use tracker::{ErrorLog, TracingErrorTracker};
