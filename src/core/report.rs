//! Daily report types and the export envelope.
//!
//! An [`AggregateReport`] is deterministic: the same normalized records
//! always serialize to the same bytes. Per-run details (run id, generation
//! time, skipped records) live in the [`AggregationOutput`] envelope built
//! around it.

use crate::core::normalize::NormalizationWarning;
use crate::records::{NormalizedSleep, NormalizedWorkout, SourceKind};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The name of this producer.
pub const PRODUCER_NAME: &str = "synheart-health-merge";

/// Sleep aggregate for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepSummary {
    pub count: usize,
    pub total_duration_hours: f64,
    /// 0 when the day has no sleep records
    pub average_quality_score: f64,
    pub records: Vec<NormalizedSleep>,
}

/// Workout aggregate for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSummary {
    pub count: usize,
    pub total_duration_minutes: f64,
    pub total_calories_burned: f64,
    pub records: Vec<NormalizedWorkout>,
}

/// Everything merged onto one canonical date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub sleep: SleepSummary,
    pub workouts: WorkoutSummary,
}

/// First and last canonical date in a report. Both are `None` for an empty
/// report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn is_empty(&self) -> bool {
        self.start.is_none()
    }
}

/// Counts describing what a report contains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub sleep_records_processed: usize,
    pub workout_records_processed: usize,
    pub dates_covered: usize,
    pub date_range: DateRange,
}

/// Daily summaries in strictly ascending date order, plus metadata derived
/// from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    metadata: ReportMetadata,
    #[serde(rename = "detailed report", alias = "detailed_report")]
    days: Vec<DailySummary>,
}

impl AggregateReport {
    /// Build a report from day summaries. Days are ordered by date here, so
    /// callers cannot produce an out-of-order report.
    pub fn from_days(mut days: Vec<DailySummary>) -> Self {
        days.sort_by_key(|d| d.date);

        let metadata = ReportMetadata {
            sleep_records_processed: days.iter().map(|d| d.sleep.count).sum(),
            workout_records_processed: days.iter().map(|d| d.workouts.count).sum(),
            dates_covered: days.len(),
            date_range: DateRange {
                start: days.first().map(|d| d.date),
                end: days.last().map(|d| d.date),
            },
        };

        Self { metadata, days }
    }

    pub fn metadata(&self) -> &ReportMetadata {
        &self.metadata
    }

    pub fn days(&self) -> &[DailySummary] {
        &self.days
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn into_days(self) -> Vec<DailySummary> {
        self.days
    }

    /// Look up the summary for one date.
    pub fn day(&self, date: NaiveDate) -> Option<&DailySummary> {
        self.days
            .binary_search_by_key(&date, |d| d.date)
            .ok()
            .map(|i| &self.days[i])
    }

    /// Every normalized record in the report, sleep first, in report order.
    pub fn into_records(self) -> (Vec<NormalizedSleep>, Vec<NormalizedWorkout>) {
        let mut sleep = Vec::new();
        let mut workouts = Vec::new();
        for day in self.days {
            sleep.extend(day.sleep.records);
            workouts.extend(day.workouts.records);
        }
        (sleep, workouts)
    }
}

/// Per-run information attached to an exported report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub producer: String,
    pub version: String,
    pub sleep_records_skipped: usize,
    pub workout_records_skipped: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<NormalizationWarning>,
}

/// What gets written to disk: run info plus the report itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationOutput {
    pub run: RunInfo,
    #[serde(flatten)]
    pub report: AggregateReport,
}

/// Wraps reports into export envelopes for one run.
pub struct ReportBuilder {
    run_id: Uuid,
}

impl ReportBuilder {
    /// Create a new builder with a unique run ID.
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
        }
    }

    /// Get the run ID.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Build the export envelope for a finished report.
    pub fn build(
        &self,
        report: AggregateReport,
        warnings: Vec<NormalizationWarning>,
    ) -> AggregationOutput {
        let skipped = |kind: SourceKind| warnings.iter().filter(|w| w.kind == kind).count();

        AggregationOutput {
            run: RunInfo {
                run_id: self.run_id,
                generated_at: Utc::now(),
                producer: PRODUCER_NAME.to_string(),
                version: crate::VERSION.to_string(),
                sleep_records_skipped: skipped(SourceKind::Sleep),
                workout_records_skipped: skipped(SourceKind::Workout),
                warnings,
            },
            report,
        }
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}
