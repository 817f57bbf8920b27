//! Cross-feed metrics over a finished daily report.

use crate::core::report::{AggregateReport, DailySummary};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Default cut-off below which a night counts as short, in hours.
pub const DEFAULT_LOW_SLEEP_THRESHOLD_HOURS: f64 = 7.0;

/// Calories burned on short-sleep days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LowSleepSummary {
    pub threshold_hours: f64,
    /// Days with at least one sleep record and less sleep than the threshold
    pub qualifying_days: usize,
    pub total_calories: f64,
    /// Truncated mean, 0 when no day qualifies
    pub average_calories: i64,
}

/// A day is "low sleep" only if sleep was tracked and came in strictly under
/// the threshold. A day with no sleep record is not a zero-hour night.
fn is_low_sleep_day(day: &DailySummary, threshold_hours: f64) -> bool {
    day.sleep.count > 0 && day.sleep.total_duration_hours < threshold_hours
}

/// Tally qualifying days and their calories.
pub fn low_sleep_summary(report: &AggregateReport, threshold_hours: f64) -> LowSleepSummary {
    let (total_calories, qualifying_days) = report
        .days()
        .iter()
        .filter(|day| is_low_sleep_day(day, threshold_hours))
        .fold((0.0, 0usize), |(calories, days), day| {
            (calories + day.workouts.total_calories_burned, days + 1)
        });

    let average_calories = if qualifying_days == 0 {
        0
    } else {
        (total_calories / qualifying_days as f64).trunc() as i64
    };

    LowSleepSummary {
        threshold_hours,
        qualifying_days,
        total_calories,
        average_calories,
    }
}

/// Average calories burned on days with less than `threshold_hours` of
/// tracked sleep, truncated toward zero. Returns 0 when no day qualifies.
pub fn average_calories_on_low_sleep_days(report: &AggregateReport, threshold_hours: f64) -> i64 {
    low_sleep_summary(report, threshold_hours).average_calories
}

/// Pearson correlation between nightly sleep hours and calories burned,
/// over days that have sleep tracked.
///
/// `None` with fewer than two such days or when either series is flat.
pub fn sleep_calorie_correlation(report: &AggregateReport) -> Option<f64> {
    let (hours, calories): (Vec<f64>, Vec<f64>) = report
        .days()
        .iter()
        .filter(|day| day.sleep.count > 0)
        .map(|day| (day.sleep.total_duration_hours, day.workouts.total_calories_burned))
        .unzip();

    if hours.len() < 2 {
        return None;
    }

    let sd_hours = hours.iter().std_dev();
    let sd_calories = calories.iter().std_dev();
    if !(sd_hours > 0.0 && sd_calories > 0.0) {
        return None;
    }

    let covariance = hours.iter().covariance(calories.iter());
    Some((covariance / (sd_hours * sd_calories)).clamp(-1.0, 1.0))
}
