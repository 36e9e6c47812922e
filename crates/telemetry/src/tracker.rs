//! Error trackers.
//!
//! `TracingErrorTracker` turns each tracked failure into a structured log
//! line. `ErrorLog` keeps the most recent failures in memory so they can be
//! inspected after the fact.

use std::sync::{PoisonError, RwLock};

use chatloop_core::{ErrorTracker, ExecutionError};
use serde_json::{Map, Value};
use tracing::error;

use crate::model::TrackedError;

/// Logs every tracked failure at `error` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorTracker;

impl ErrorTracker for TracingErrorTracker {
    fn track(&self, err: &ExecutionError, context: &Map<String, Value>) {
        let context = Value::Object(context.clone());
        error!(
            error_kind = err.kind(),
            error_code = %err.error_code(),
            context = %context,
            "{err}"
        );
    }
}

/// Bounded in-memory record of tracked failures, oldest dropped first.
pub struct ErrorLog {
    capacity: usize,
    entries: RwLock<Vec<TrackedError>>,
}

impl ErrorLog {
    const DEFAULT_CAPACITY: usize = 1_000;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Most recent entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<TrackedError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.iter().rev().take(limit).cloned().collect()
    }

    /// Entries of one kind, oldest first.
    pub fn by_kind(&self, kind: &str) -> Vec<TrackedError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.iter().filter(|e| e.kind == kind).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorTracker for ErrorLog {
    fn track(&self, err: &ExecutionError, context: &Map<String, Value>) {
        let entry = TrackedError::new(err, context);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.len() >= self.capacity {
            let overflow = entries.len() + 1 - self.capacity;
            entries.drain(..overflow);
        }
        entries.push(entry);
    }
}
