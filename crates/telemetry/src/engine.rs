//! Thread-safe SLI engine: counts first-token error-rate and apdex samples
//! per label set and serves snapshots.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chatloop_core::{SliLabels, SliSink};

use crate::model::{FIRST_TOKEN_SLI, SliCounter, SliKind, SliSnapshot};

/// The core SLI engine.
///
/// Thread-safe via `RwLock`; one instance is shared by every concurrent
/// execution.
#[derive(Default)]
pub struct SliEngine {
    counters: RwLock<HashMap<(SliLabels, SliKind), SliCounter>>,
}

impl SliEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, labels: &SliLabels, kind: SliKind, good: bool) {
        let mut counters = self
            .counters
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        counters
            .entry((labels.clone(), kind))
            .or_default()
            .record(good);

        tracing::debug!(
            sli = FIRST_TOKEN_SLI,
            kind = %kind,
            feature_category = %labels.feature_category,
            good,
            "SLI sample recorded"
        );
    }

    /// Counter for one series, zeroed if nothing was recorded yet.
    pub fn counter(&self, labels: &SliLabels, kind: SliKind) -> SliCounter {
        let counters = self
            .counters
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        counters
            .get(&(labels.clone(), kind))
            .copied()
            .unwrap_or_default()
    }

    /// Fraction of executions that failed, `None` before the first sample.
    pub fn error_rate(&self, labels: &SliLabels) -> Option<f64> {
        self.counter(labels, SliKind::ErrorRate)
            .ratio()
            .map(|good| 1.0 - good)
    }

    /// Fraction of first tokens that met the target, `None` before the first sample.
    pub fn apdex(&self, labels: &SliLabels) -> Option<f64> {
        self.counter(labels, SliKind::Apdex).ratio()
    }

    /// All series, ordered by kind then feature category.
    pub fn snapshot(&self) -> Vec<SliSnapshot> {
        let counters = self
            .counters
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut snapshot: Vec<SliSnapshot> = counters
            .iter()
            .map(|((labels, kind), counter)| SliSnapshot {
                sli: FIRST_TOKEN_SLI.to_string(),
                kind: *kind,
                labels: labels.clone(),
                counter: *counter,
            })
            .collect();
        snapshot.sort_by(|a, b| {
            (a.kind as u8, &a.labels.feature_category, &a.labels.service_class).cmp(&(
                b.kind as u8,
                &b.labels.feature_category,
                &b.labels.service_class,
            ))
        });
        snapshot
    }

    pub fn reset(&self) {
        self.counters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl SliSink for SliEngine {
    fn increment_error_rate(&self, labels: &SliLabels, error: bool) {
        self.record(labels, SliKind::ErrorRate, !error);
    }

    fn increment_apdex(&self, labels: &SliLabels, success: bool) {
        self.record(labels, SliKind::Apdex, success);
    }
}
