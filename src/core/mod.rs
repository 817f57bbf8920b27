//! Core functionality for the health merge.
//!
//! This module contains:
//! - Timestamp normalization and the timezone registry
//! - Per-record normalization with failure isolation
//! - Date-keyed grouping and daily summaries
//! - Report types and cross-feed metrics

pub mod merge;
pub mod metrics;
pub mod normalize;
pub mod report;
pub mod timestamp;

// Re-export commonly used types
pub use merge::{build_report, group_by_canonical_date, summarize_day, BucketMap, DailyBucket};
pub use metrics::{
    average_calories_on_low_sleep_days, low_sleep_summary, sleep_calorie_correlation,
    LowSleepSummary, DEFAULT_LOW_SLEEP_THRESHOLD_HOURS,
};
pub use normalize::{
    normalize_sleep, normalize_sleep_value, normalize_workout, normalize_workout_value,
    BatchNormalizer, NormalizationCause, NormalizationError, NormalizationWarning,
    NormalizedBatch,
};
pub use report::{
    AggregateReport, AggregationOutput, DailySummary, DateRange, ReportBuilder, ReportMetadata,
    RunInfo, SleepSummary, WorkoutSummary, PRODUCER_NAME,
};
pub use timestamp::{
    canonical_date, parse_local_instant, parse_utc_instant, resolve_timezone,
    StaticTimezoneRegistry, TimestampError, TimezoneRegistry,
};
