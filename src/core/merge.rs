//! Date-keyed merge of normalized records.
//!
//! Records are bucketed by canonical (UTC) date only. The civil date a
//! workout was logged on travels with the record but never picks its bucket.

use crate::core::report::{AggregateReport, DailySummary, SleepSummary, WorkoutSummary};
use crate::records::{NormalizedRecord, NormalizedSleep, NormalizedWorkout};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// All records assigned to one canonical date, split by feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyBucket {
    pub sleep: Vec<NormalizedSleep>,
    pub workouts: Vec<NormalizedWorkout>,
}

impl DailyBucket {
    /// Add a record to this bucket.
    pub fn add_record(&mut self, record: NormalizedRecord) {
        match record {
            NormalizedRecord::Sleep(r) => self.sleep.push(r),
            NormalizedRecord::Workout(r) => self.workouts.push(r),
        }
    }

    /// Check if the bucket has any records.
    pub fn is_empty(&self) -> bool {
        self.sleep.is_empty() && self.workouts.is_empty()
    }

    /// Get the total number of records in this bucket.
    pub fn record_count(&self) -> usize {
        self.sleep.len() + self.workouts.len()
    }
}

/// Buckets keyed by canonical date. Iteration order is chronological.
pub type BucketMap = BTreeMap<NaiveDate, DailyBucket>;

/// Group both feeds by canonical date.
///
/// A bucket exists for every date seen in either feed and is created on the
/// first record that lands in it.
pub fn group_by_canonical_date(
    sleep: Vec<NormalizedSleep>,
    workouts: Vec<NormalizedWorkout>,
) -> BucketMap {
    let mut buckets = BucketMap::new();

    let records = sleep
        .into_iter()
        .map(NormalizedRecord::from)
        .chain(workouts.into_iter().map(NormalizedRecord::from));

    for record in records {
        buckets
            .entry(record.canonical_date())
            .or_default()
            .add_record(record);
    }

    buckets
}

/// Aggregate one day's records.
///
/// Average quality over zero sleep records is 0, not NaN.
pub fn summarize_day(
    date: NaiveDate,
    sleep: Vec<NormalizedSleep>,
    workouts: Vec<NormalizedWorkout>,
) -> DailySummary {
    let total_duration_hours: f64 = sleep.iter().map(|r| r.raw.duration_hours).sum();
    let average_quality_score = if sleep.is_empty() {
        0.0
    } else {
        sleep.iter().map(|r| r.raw.quality_score).sum::<f64>() / sleep.len() as f64
    };

    let total_duration_minutes: f64 = workouts.iter().map(|r| r.raw.duration_minutes).sum();
    let total_calories_burned: f64 = workouts.iter().map(|r| r.raw.calories_burned).sum();

    DailySummary {
        date,
        sleep: SleepSummary {
            count: sleep.len(),
            total_duration_hours,
            average_quality_score,
            records: sleep,
        },
        workouts: WorkoutSummary {
            count: workouts.len(),
            total_duration_minutes,
            total_calories_burned,
            records: workouts,
        },
    }
}

/// Build the report: one summary per bucket in ascending date order.
pub fn build_report(buckets: BucketMap) -> AggregateReport {
    let days: Vec<DailySummary> = buckets
        .into_iter()
        .map(|(date, bucket)| summarize_day(date, bucket.sleep, bucket.workouts))
        .collect();

    tracing::debug!(days = days.len(), "built daily report");
    AggregateReport::from_days(days)
}
