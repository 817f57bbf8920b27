//! Record normalization.
//!
//! Each raw record becomes a normalized record carrying UTC instants, the
//! canonical (UTC) date used for merging and, for workouts, the civil date
//! the user logged it on. Failures are per record: a batch keeps going and
//! reports what it skipped.

use crate::core::timestamp::{
    canonical_date, parse_local_instant, parse_utc_instant, TimestampError, TimezoneRegistry,
};
use crate::records::types::id_from_value;
use crate::records::{
    NormalizedSleep, NormalizedWorkout, RawSleepRecord, RawWorkoutRecord, SourceKind,
};
use crate::run_log::SharedRunLog;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Why a single record could not be normalized.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizationCause {
    /// A timestamp or timezone label was rejected
    Timestamp(TimestampError),
    /// The record is missing required fields or has the wrong field types
    InvalidRecord(String),
}

/// Per-record normalization failure.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationError {
    pub kind: SourceKind,
    /// The record's own identifier, when it has one
    pub record_id: Option<String>,
    pub cause: NormalizationCause,
}

impl NormalizationError {
    fn timestamp(kind: SourceKind, record_id: Option<String>, err: TimestampError) -> Self {
        Self {
            kind,
            record_id,
            cause: NormalizationCause::Timestamp(err),
        }
    }
}

impl std::fmt::Display for NormalizationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to normalize {} record", self.kind)?;
        if let Some(id) = &self.record_id {
            write!(f, " {id}")?;
        }
        match &self.cause {
            NormalizationCause::Timestamp(e) => write!(f, ": {e}"),
            NormalizationCause::InvalidRecord(msg) => write!(f, ": invalid record: {msg}"),
        }
    }
}

impl std::error::Error for NormalizationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            NormalizationCause::Timestamp(e) => Some(e),
            NormalizationCause::InvalidRecord(_) => None,
        }
    }
}

/// Normalize a sleep record. The canonical date comes from the start
/// instant, never the end instant.
pub fn normalize_sleep(mut raw: RawSleepRecord) -> Result<NormalizedSleep, NormalizationError> {
    let fail = |e| NormalizationError::timestamp(SourceKind::Sleep, raw.id.clone(), e);

    let start = parse_utc_instant(&raw.start_time).map_err(fail)?;
    let end = parse_utc_instant(&raw.end_time).map_err(fail)?;

    raw.strip_derived();
    Ok(NormalizedSleep {
        raw,
        start_time_utc: start,
        end_time_utc: end,
        canonical_date: canonical_date(&start),
        source: SourceKind::Sleep,
    })
}

/// Normalize a workout record, converting its wall-clock time to UTC.
pub fn normalize_workout(
    registry: &dyn TimezoneRegistry,
    mut raw: RawWorkoutRecord,
) -> Result<NormalizedWorkout, NormalizationError> {
    let (utc, local_date) = parse_local_instant(registry, &raw.timestamp, &raw.timezone)
        .map_err(|e| {
            NormalizationError::timestamp(SourceKind::Workout, raw.workout_id.clone(), e)
        })?;

    raw.strip_derived();
    Ok(NormalizedWorkout {
        timestamp_local: raw.timestamp.clone(),
        raw,
        timestamp_utc: utc,
        local_date,
        canonical_date: canonical_date(&utc),
        source: SourceKind::Workout,
    })
}

/// Read and normalize a loosely-typed sleep record.
pub fn normalize_sleep_value(value: Value) -> Result<NormalizedSleep, NormalizationError> {
    let record_id = id_from_value(&value, "id");
    let raw = RawSleepRecord::from_value(value).map_err(|e| NormalizationError {
        kind: SourceKind::Sleep,
        record_id,
        cause: NormalizationCause::InvalidRecord(e.to_string()),
    })?;
    normalize_sleep(raw)
}

/// Read and normalize a loosely-typed workout record.
pub fn normalize_workout_value(
    registry: &dyn TimezoneRegistry,
    value: Value,
) -> Result<NormalizedWorkout, NormalizationError> {
    let record_id = id_from_value(&value, "workout_id");
    let raw = RawWorkoutRecord::from_value(value).map_err(|e| NormalizationError {
        kind: SourceKind::Workout,
        record_id,
        cause: NormalizationCause::InvalidRecord(e.to_string()),
    })?;
    normalize_workout(registry, raw)
}

/// A record that was skipped during batch normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationWarning {
    pub kind: SourceKind,
    /// Position of the record in its input feed
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    pub message: String,
}

impl NormalizationWarning {
    fn from_error(index: usize, err: NormalizationError) -> Self {
        Self {
            kind: err.kind,
            index,
            message: err.to_string(),
            record_id: err.record_id,
        }
    }
}

impl std::fmt::Display for NormalizationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.record_id {
            Some(id) => write!(f, "Skipping {} record {id}: {}", self.kind, self.message),
            None => write!(
                f,
                "Skipping {} record #{}: {}",
                self.kind, self.index, self.message
            ),
        }
    }
}

/// Accepted records of both kinds plus a warning for each skipped one.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub sleep: Vec<NormalizedSleep>,
    pub workouts: Vec<NormalizedWorkout>,
    pub warnings: Vec<NormalizationWarning>,
}

/// One normalized item, tagged with its feed and input position.
enum Outcome {
    Sleep(usize, Result<NormalizedSleep, NormalizationError>),
    Workout(usize, Result<NormalizedWorkout, NormalizationError>),
}

/// Normalizes whole feeds, isolating per-record failures.
///
/// With `parallel` set, the sleep and workout feeds are normalized on two
/// worker threads and their outcomes collected over a channel. Either way
/// the accepted records keep their input order.
pub struct BatchNormalizer<'a> {
    registry: &'a dyn TimezoneRegistry,
    parallel: bool,
    run_log: Option<SharedRunLog>,
}

impl<'a> BatchNormalizer<'a> {
    pub fn new(registry: &'a dyn TimezoneRegistry) -> Self {
        Self {
            registry,
            parallel: false,
            run_log: None,
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Count accepted and skipped records into a shared run log.
    pub fn with_run_log(mut self, run_log: SharedRunLog) -> Self {
        self.run_log = Some(run_log);
        self
    }

    pub fn run(&self, sleep: Vec<Value>, workouts: Vec<Value>) -> NormalizedBatch {
        tracing::debug!(
            sleep = sleep.len(),
            workouts = workouts.len(),
            parallel = self.parallel,
            "normalizing records"
        );

        let outcomes = if self.parallel {
            self.run_parallel(sleep, workouts)
        } else {
            self.run_sequential(sleep, workouts)
        };

        self.partition(outcomes)
    }

    fn run_sequential(&self, sleep: Vec<Value>, workouts: Vec<Value>) -> Vec<Outcome> {
        let registry = self.registry;
        sleep
            .into_iter()
            .enumerate()
            .map(|(i, v)| Outcome::Sleep(i, normalize_sleep_value(v)))
            .chain(
                workouts
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| Outcome::Workout(i, normalize_workout_value(registry, v))),
            )
            .collect()
    }

    fn run_parallel(&self, sleep: Vec<Value>, workouts: Vec<Value>) -> Vec<Outcome> {
        let registry = self.registry;
        let (sender, receiver) = crossbeam_channel::unbounded();

        std::thread::scope(|scope| {
            let sleep_sender = sender.clone();
            scope.spawn(move || {
                for (i, value) in sleep.into_iter().enumerate() {
                    let _ = sleep_sender.send(Outcome::Sleep(i, normalize_sleep_value(value)));
                }
            });

            let workout_sender = sender;
            scope.spawn(move || {
                for (i, value) in workouts.into_iter().enumerate() {
                    let outcome = normalize_workout_value(registry, value);
                    let _ = workout_sender.send(Outcome::Workout(i, outcome));
                }
            });
        });

        // Every sender has been dropped once the scope joins
        receiver.iter().collect()
    }

    fn partition(&self, outcomes: Vec<Outcome>) -> NormalizedBatch {
        let mut sleep = Vec::new();
        let mut workouts = Vec::new();
        let mut sleep_failures = Vec::new();
        let mut workout_failures = Vec::new();

        for outcome in outcomes {
            match outcome {
                Outcome::Sleep(i, Ok(record)) => sleep.push((i, record)),
                Outcome::Sleep(i, Err(e)) => sleep_failures.push((i, e)),
                Outcome::Workout(i, Ok(record)) => workouts.push((i, record)),
                Outcome::Workout(i, Err(e)) => workout_failures.push((i, e)),
            }
        }

        sleep.sort_by_key(|(i, _)| *i);
        workouts.sort_by_key(|(i, _)| *i);
        sleep_failures.sort_by_key(|(i, _)| *i);
        workout_failures.sort_by_key(|(i, _)| *i);

        let warnings: Vec<NormalizationWarning> = sleep_failures
            .into_iter()
            .chain(workout_failures)
            .map(|(i, e)| NormalizationWarning::from_error(i, e))
            .collect();

        for warning in &warnings {
            tracing::warn!(
                kind = %warning.kind,
                index = warning.index,
                record_id = warning.record_id.as_deref().unwrap_or("-"),
                "{}",
                warning.message
            );
        }

        if let Some(log) = &self.run_log {
            log.record_accepted(SourceKind::Sleep, sleep.len() as u64);
            log.record_accepted(SourceKind::Workout, workouts.len() as u64);
            for warning in &warnings {
                log.record_skipped(warning.kind, 1);
            }
        }

        NormalizedBatch {
            sleep: sleep.into_iter().map(|(_, r)| r).collect(),
            workouts: workouts.into_iter().map(|(_, r)| r).collect(),
            warnings,
        }
    }
}
