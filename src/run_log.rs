//! Run statistics.
//!
//! Counts what a merge run loaded, accepted and skipped. Counters are
//! atomic so normalization workers can record into one shared log.

use crate::records::SourceKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Statistics for a single merge run.
#[derive(Debug)]
pub struct RunLog {
    sleep_loaded: AtomicU64,
    workouts_loaded: AtomicU64,
    sleep_accepted: AtomicU64,
    workouts_accepted: AtomicU64,
    sleep_skipped: AtomicU64,
    workouts_skipped: AtomicU64,
    days_reported: AtomicU64,
    /// Run start time
    started_at: DateTime<Utc>,
}

impl RunLog {
    pub fn new() -> Self {
        Self {
            sleep_loaded: AtomicU64::new(0),
            workouts_loaded: AtomicU64::new(0),
            sleep_accepted: AtomicU64::new(0),
            workouts_accepted: AtomicU64::new(0),
            sleep_skipped: AtomicU64::new(0),
            workouts_skipped: AtomicU64::new(0),
            days_reported: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    fn counters(&self, kind: SourceKind) -> (&AtomicU64, &AtomicU64, &AtomicU64) {
        match kind {
            SourceKind::Sleep => (&self.sleep_loaded, &self.sleep_accepted, &self.sleep_skipped),
            SourceKind::Workout => (
                &self.workouts_loaded,
                &self.workouts_accepted,
                &self.workouts_skipped,
            ),
        }
    }

    /// Record raw records read from a feed.
    pub fn record_loaded(&self, kind: SourceKind, count: u64) {
        self.counters(kind).0.fetch_add(count, Ordering::Relaxed);
    }

    /// Record records that normalized successfully.
    pub fn record_accepted(&self, kind: SourceKind, count: u64) {
        self.counters(kind).1.fetch_add(count, Ordering::Relaxed);
    }

    /// Record records excluded with a warning.
    pub fn record_skipped(&self, kind: SourceKind, count: u64) {
        self.counters(kind).2.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_days_reported(&self, count: u64) {
        self.days_reported.fetch_add(count, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> RunStats {
        RunStats {
            sleep_loaded: self.sleep_loaded.load(Ordering::Relaxed),
            workouts_loaded: self.workouts_loaded.load(Ordering::Relaxed),
            sleep_accepted: self.sleep_accepted.load(Ordering::Relaxed),
            workouts_accepted: self.workouts_accepted.load(Ordering::Relaxed),
            sleep_skipped: self.sleep_skipped.load(Ordering::Relaxed),
            workouts_skipped: self.workouts_skipped.load(Ordering::Relaxed),
            days_reported: self.days_reported.load(Ordering::Relaxed),
            started_at: self.started_at,
            elapsed_ms: (Utc::now() - self.started_at).num_milliseconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Run Statistics:\n\
             - Sleep records: {} loaded, {} merged, {} skipped\n\
             - Workout records: {} loaded, {} merged, {} skipped\n\
             - Days reported: {}\n\
             - Elapsed: {} ms",
            stats.sleep_loaded,
            stats.sleep_accepted,
            stats.sleep_skipped,
            stats.workouts_loaded,
            stats.workouts_accepted,
            stats.workouts_skipped,
            stats.days_reported,
            stats.elapsed_ms
        )
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of run statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub sleep_loaded: u64,
    pub workouts_loaded: u64,
    pub sleep_accepted: u64,
    pub workouts_accepted: u64,
    pub sleep_skipped: u64,
    pub workouts_skipped: u64,
    pub days_reported: u64,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Thread-safe shared run log.
pub type SharedRunLog = Arc<RunLog>;

/// Create a new shared run log.
pub fn create_shared_log() -> SharedRunLog {
    Arc::new(RunLog::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_log_counting() {
        let log = RunLog::new();

        log.record_loaded(SourceKind::Sleep, 3);
        log.record_accepted(SourceKind::Sleep, 2);
        log.record_skipped(SourceKind::Sleep, 1);
        log.record_loaded(SourceKind::Workout, 4);
        log.record_days_reported(2);

        let stats = log.stats();
        assert_eq!(stats.sleep_loaded, 3);
        assert_eq!(stats.sleep_accepted, 2);
        assert_eq!(stats.sleep_skipped, 1);
        assert_eq!(stats.workouts_loaded, 4);
        assert_eq!(stats.workouts_accepted, 0);
        assert_eq!(stats.days_reported, 2);
    }

    #[test]
    fn test_shared_log_across_threads() {
        let log = create_shared_log();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let log = log.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        log.record_accepted(SourceKind::Workout, 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(log.stats().workouts_accepted, 400);
    }

    #[test]
    fn test_summary_format() {
        let log = RunLog::new();
        let summary = log.summary();

        assert!(summary.contains("Sleep records"));
        assert!(summary.contains("Workout records"));
        assert!(summary.contains("Days reported"));
    }
}
