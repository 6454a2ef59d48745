use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::Serialize;

use relata_db::sync::models::{SyncKind, SyncStatus};

/// In-process sink for sync observability: run-status transition counters
/// keyed by (kind, status), failed-run counters keyed by kind, and the
/// most recent processing lag per kind. Readers only ever get owned
/// snapshots; the live maps never escape the mutex.
#[derive(Default)]
pub struct SyncMetrics {
    inner: Mutex<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    run_status_counts: BTreeMap<String, u64>,
    failed_runs: BTreeMap<String, u64>,
    lag_ms: BTreeMap<String, i64>,
}

/// Owned point-in-time copy of the sink. Keys are `kind:status` for
/// transition counters and `kind` for the rest.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub run_status_counts: BTreeMap<String, u64>,
    pub failed_runs: BTreeMap<String, u64>,
    pub lag_ms: BTreeMap<String, i64>,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MetricsInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn record_transition(&self, kind: SyncKind, status: SyncStatus) {
        let mut inner = self.lock();
        let key = format!("{}:{}", kind.as_str(), status.as_str());
        *inner.run_status_counts.entry(key).or_default() += 1;

        if status == SyncStatus::Failed {
            *inner
                .failed_runs
                .entry(kind.as_str().to_string())
                .or_default() += 1;
        }
    }

    /// Record processing lag for `kind`, clamped at zero so items with a
    /// future occurrence time never drive the gauge negative.
    pub fn record_lag(&self, kind: SyncKind, lag_ms: i64) {
        self.lock()
            .lag_ms
            .insert(kind.as_str().to_string(), lag_ms.max(0));
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.lock();
        MetricsSnapshot {
            run_status_counts: inner.run_status_counts.clone(),
            failed_runs: inner.failed_runs.clone(),
            lag_ms: inner.lag_ms.clone(),
        }
    }
}
