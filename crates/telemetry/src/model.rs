//! Data model for SLI counters and tracked errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chatloop_core::{ExecutionError, SliLabels};

// ── SLI ───────────────────────────────────────────────────────────────────

/// Name of the SLI both counters belong to.
pub const FIRST_TOKEN_SLI: &str = "llm_chat_first_token";

/// Which of the two SLI series a sample belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SliKind {
    /// Execution outcome; a sample is bad when the execution failed.
    ErrorRate,
    /// Time to first token; a sample is bad when it missed the target.
    Apdex,
}

impl std::fmt::Display for SliKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ErrorRate => write!(f, "error_rate"),
            Self::Apdex => write!(f, "apdex"),
        }
    }
}

/// Good/total counts for one series.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SliCounter {
    pub total: u64,
    /// Samples that met the objective.
    pub good: u64,
}

impl SliCounter {
    pub fn record(&mut self, good: bool) {
        self.total += 1;
        if good {
            self.good += 1;
        }
    }

    pub fn bad(&self) -> u64 {
        self.total - self.good
    }

    /// Fraction of good samples, `None` before the first sample.
    pub fn ratio(&self) -> Option<f64> {
        (self.total > 0).then(|| self.good as f64 / self.total as f64)
    }
}

/// Point-in-time view of one labelled series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SliSnapshot {
    pub sli: String,
    pub kind: SliKind,
    pub labels: SliLabels,
    pub counter: SliCounter,
}

// ── Tracked errors ────────────────────────────────────────────────────────

/// One failure reported through the error tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedError {
    pub id: String,
    /// Machine-readable class, e.g. `exhausted_loop_error`.
    pub kind: String,
    /// Client-facing error code.
    pub error_code: String,
    pub message: String,
    pub context: serde_json::Map<String, serde_json::Value>,
    pub recorded_at: DateTime<Utc>,
}

impl TrackedError {
    pub fn new(
        error: &ExecutionError,
        context: &serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: error.kind().to_string(),
            error_code: error.error_code().as_str().to_string(),
            message: error.to_string(),
            context: context.clone(),
            recorded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_ratio() {
        let mut counter = SliCounter::default();
        assert_eq!(counter.ratio(), None);

        counter.record(true);
        counter.record(true);
        counter.record(false);
        counter.record(true);

        assert_eq!(counter.total, 4);
        assert_eq!(counter.bad(), 1);
        assert_eq!(counter.ratio(), Some(0.75));
    }

    #[test]
    fn tracked_error_captures_kind_and_code() {
        let error = ExecutionError::ExhaustedLoop { iterations: 2 };
        let mut context = serde_json::Map::new();
        context.insert("user".into(), "alice".into());

        let tracked = TrackedError::new(&error, &context);
        assert_eq!(tracked.kind, "exhausted_loop_error");
        assert_eq!(tracked.error_code, "A1006");
        assert!(tracked.message.contains("2 iterations"));
        assert_eq!(tracked.context["user"], "alice");
    }

    #[test]
    fn kind_display() {
        assert_eq!(SliKind::ErrorRate.to_string(), "error_rate");
        assert_eq!(
            serde_json::to_string(&SliKind::Apdex).unwrap(),
            "\"apdex\""
        );
    }
}
