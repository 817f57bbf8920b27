//! End-to-end merge run.
//!
//! ```text
//! sleep.json ──┐                                     ┌──▶ report.json
//!              ├─▶ normalize ─▶ group ─▶ summarize ──┤
//! workouts ────┘   (per record)  (by UTC date)       └──▶ metrics
//! ```
//!
//! Loading and writing are thin file wrappers. A feed that is missing or is
//! not a JSON array aborts the run; a bad record inside a feed does not.

use crate::core::merge::{build_report, group_by_canonical_date};
use crate::core::normalize::{BatchNormalizer, NormalizationWarning};
use crate::core::report::{AggregateReport, AggregationOutput, ReportBuilder};
use crate::core::timestamp::TimezoneRegistry;
use crate::records::SourceKind;
use crate::run_log::{create_shared_log, SharedRunLog};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Failure to read an input feed or report.
#[derive(Debug)]
pub enum LoadError {
    NotFound(PathBuf),
    Io { path: PathBuf, message: String },
    Parse { path: PathBuf, message: String },
    /// Top-level JSON is not an array of records
    NotAnArray(PathBuf),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::NotFound(path) => write!(f, "File not found: {}", path.display()),
            LoadError::Io { path, message } => {
                write!(f, "Could not read {}: {message}", path.display())
            }
            LoadError::Parse { path, message } => {
                write!(f, "Invalid JSON in {}: {message}", path.display())
            }
            LoadError::NotAnArray(path) => {
                write!(f, "Expected a JSON array of records in {}", path.display())
            }
        }
    }
}

impl std::error::Error for LoadError {}

/// Failure to write a report.
#[derive(Debug)]
pub enum OutputError {
    Io(String),
    Serialize(String),
}

impl std::fmt::Display for OutputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputError::Io(e) => write!(f, "IO error: {e}"),
            OutputError::Serialize(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for OutputError {}

/// How a report is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// The whole envelope as one JSON document
    #[default]
    Json,
    /// One daily summary per line
    Jsonl,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Jsonl => "jsonl",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "jsonl" => Ok(OutputFormat::Jsonl),
            other => Err(format!("unknown format '{other}' (expected json or jsonl)")),
        }
    }
}

fn read_json(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Read a feed: a JSON array of loosely-typed records.
pub fn load_records(path: &Path) -> Result<Vec<Value>, LoadError> {
    match read_json(path)? {
        Value::Array(records) => Ok(records),
        _ => Err(LoadError::NotAnArray(path.to_path_buf())),
    }
}

/// Read a previously written report (bare or inside an output envelope).
///
/// Day order and metadata are recomputed from the days in the file.
pub fn load_report(path: &Path) -> Result<AggregateReport, LoadError> {
    let report: AggregateReport =
        serde_json::from_value(read_json(path)?).map_err(|e| LoadError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    Ok(AggregateReport::from_days(report.into_days()))
}

/// Where a run's output goes when no path is given.
pub fn default_output_path(
    export_dir: &Path,
    format: OutputFormat,
    generated_at: DateTime<Utc>,
) -> PathBuf {
    export_dir.join(format!(
        "merge_{}.{}",
        generated_at.format("%Y%m%d_%H%M%S"),
        format.extension()
    ))
}

/// Write an output envelope.
pub fn write_output(
    output: &AggregationOutput,
    path: &Path,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| OutputError::Io(e.to_string()))?;
        }
    }

    let content = match format {
        OutputFormat::Json if pretty => serde_json::to_string_pretty(output),
        OutputFormat::Json => serde_json::to_string(output),
        OutputFormat::Jsonl => output
            .report
            .days()
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()
            .map(|lines| lines.join("\n")),
    }
    .map_err(|e| OutputError::Serialize(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| OutputError::Io(e.to_string()))
}

/// The result of merging two in-memory feeds.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub report: AggregateReport,
    pub warnings: Vec<NormalizationWarning>,
}

/// Runs normalize → group → summarize over two feeds.
pub struct Aggregator<'a> {
    registry: &'a dyn TimezoneRegistry,
    parallel: bool,
    run_log: SharedRunLog,
}

impl<'a> Aggregator<'a> {
    pub fn new(registry: &'a dyn TimezoneRegistry) -> Self {
        Self {
            registry,
            parallel: false,
            run_log: create_shared_log(),
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_run_log(mut self, run_log: SharedRunLog) -> Self {
        self.run_log = run_log;
        self
    }

    pub fn run_log(&self) -> &SharedRunLog {
        &self.run_log
    }

    /// Merge already-loaded feeds.
    pub fn merge(&self, sleep: Vec<Value>, workouts: Vec<Value>) -> MergeOutcome {
        self.run_log.record_loaded(SourceKind::Sleep, sleep.len() as u64);
        self.run_log.record_loaded(SourceKind::Workout, workouts.len() as u64);

        let batch = BatchNormalizer::new(self.registry)
            .parallel(self.parallel)
            .with_run_log(self.run_log.clone())
            .run(sleep, workouts);

        let buckets = group_by_canonical_date(batch.sleep, batch.workouts);
        tracing::debug!(dates = buckets.len(), "grouped records by canonical date");

        let report = build_report(buckets);
        self.run_log.record_days_reported(report.days().len() as u64);

        MergeOutcome {
            report,
            warnings: batch.warnings,
        }
    }

    /// Load both feeds from disk and merge them into an export envelope.
    pub fn run(&self, sleep_file: &Path, workout_file: &Path) -> Result<AggregationOutput, LoadError> {
        let sleep = load_records(sleep_file)?;
        let workouts = load_records(workout_file)?;
        tracing::info!(
            sleep = sleep.len(),
            workouts = workouts.len(),
            "loaded input feeds"
        );

        let outcome = self.merge(sleep, workouts);
        Ok(ReportBuilder::new().build(outcome.report, outcome.warnings))
    }
}
