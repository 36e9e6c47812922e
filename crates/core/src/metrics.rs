//! Telemetry collaborators: SLI counters and error tracking.
//!
//! The orchestrator reports through these traits only. Implementations live
//! in `chatloop-telemetry`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ExecutionError;

/// Labels attached to every SLI sample.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SliLabels {
    pub feature_category: String,
    pub service_class: String,
}

impl Default for SliLabels {
    fn default() -> Self {
        Self {
            feature_category: "duo_chat".into(),
            service_class: "Gitlab::Llm::Completions::Chat".into(),
        }
    }
}

/// Sink for the `llm_chat_first_token` SLI.
pub trait SliSink: Send + Sync {
    /// Record one execution outcome; `error` is true for a failed execution.
    fn increment_error_rate(&self, labels: &SliLabels, error: bool);

    /// Record one time-to-first-token sample against the apdex target.
    fn increment_apdex(&self, labels: &SliLabels, success: bool);
}

/// Receives every tracked execution failure.
pub trait ErrorTracker: Send + Sync {
    fn track(&self, error: &ExecutionError, context: &Map<String, Value>);
}

/// Sink that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl SliSink for NoopTelemetry {
    fn increment_error_rate(&self, _labels: &SliLabels, _error: bool) {}

    fn increment_apdex(&self, _labels: &SliLabels, _success: bool) {}
}

impl ErrorTracker for NoopTelemetry {
    fn track(&self, _error: &ExecutionError, _context: &Map<String, Value>) {}
}
