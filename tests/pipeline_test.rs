//! Integration tests for the file-to-report merge pipeline

use chrono::NaiveDate;
use serde_json::{json, Value};
use std::path::Path;
use synheart_health_merge::core::{
    average_calories_on_low_sleep_days, build_report, low_sleep_summary, BucketMap,
};
use synheart_health_merge::pipeline::{load_report, write_output, Aggregator, OutputFormat};
use synheart_health_merge::StaticTimezoneRegistry;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn write_feed(dir: &Path, name: &str, records: Value) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string(&records).unwrap()).unwrap();
    path
}

fn sample_sleep() -> Value {
    json!([
        {
            "id": "sleep_001",
            "device": "Oura Ring",
            "start_time": "2023-10-01T08:00:00Z",
            "end_time": "2023-10-01T16:00:00Z",
            "duration_hours": 8.0,
            "quality_score": 85
        },
        {
            "id": "sleep_002",
            "device": "Oura Ring",
            "start_time": "2023-10-02T07:30:00Z",
            "end_time": "2023-10-02T13:30:00Z",
            "duration_hours": 6.0,
            "quality_score": 70
        },
        {
            "id": "sleep_003",
            "device": "Oura Ring",
            "start_time": "2023-10-03T08:30:00Z",
            "end_time": "2023-10-03T14:00:00Z",
            "duration_hours": 5.5,
            "quality_score": 60,
            "hrv_avg": 42
        }
    ])
}

fn sample_workouts() -> Value {
    json!([
        {
            "workout_id": "w001",
            "app": "Strava",
            "timestamp": "2023-10-01 23:45:00",
            "timezone": "PST",
            "exercise_type": "running",
            "duration_minutes": 45,
            "calories_burned": 800
        },
        {
            "workout_id": "w002",
            "app": "Strava",
            "timestamp": "2023-10-03 07:00:00",
            "timezone": "EST",
            "exercise_type": "cycling",
            "duration_minutes": 60,
            "calories_burned": 600
        },
        {
            "workout_id": "w003",
            "app": "Strava",
            "timestamp": "2023-10-01 09:00:00",
            "timezone": "EST",
            "exercise_type": "yoga",
            "duration_minutes": 30,
            "calories_burned": 500
        }
    ])
}

#[test]
fn test_sleep_alone_on_its_day_keeps_its_quality() {
    let registry = StaticTimezoneRegistry::default();
    let outcome = Aggregator::new(&registry).merge(
        vec![json!({
            "id": "sleep_001",
            "start_time": "2023-10-01T08:00:00Z",
            "end_time": "2023-10-01T16:00:00Z",
            "duration_hours": 8,
            "quality_score": 85
        })],
        vec![],
    );

    let day = outcome.report.day(date("2023-10-01")).unwrap();
    assert_eq!(day.sleep.count, 1);
    assert_eq!(day.sleep.average_quality_score, 85.0);
    assert_eq!(day.sleep.records[0].canonical_date, date("2023-10-01"));
}

#[test]
fn test_late_pacific_workout_moves_to_next_utc_day() {
    let registry = StaticTimezoneRegistry::default();
    let outcome = Aggregator::new(&registry).merge(
        vec![],
        vec![json!({
            "workout_id": "w001",
            "timestamp": "2023-10-01 23:45:00",
            "timezone": "PST",
            "calories_burned": 450
        })],
    );

    assert!(outcome.report.day(date("2023-10-01")).is_none());
    let day = outcome.report.day(date("2023-10-02")).unwrap();
    let workout = &day.workouts.records[0];
    assert_eq!(workout.canonical_date, date("2023-10-02"));
    assert_eq!(workout.local_date, date("2023-10-01"));
    assert_eq!(workout.timestamp_local, "2023-10-01 23:45:00");
}

#[test]
fn test_low_sleep_average_over_merged_files() {
    let dir = tempfile::tempdir().unwrap();
    let sleep_file = write_feed(dir.path(), "sleep.json", sample_sleep());
    let workout_file = write_feed(dir.path(), "workouts.json", sample_workouts());

    let registry = StaticTimezoneRegistry::default();
    let output = Aggregator::new(&registry)
        .parallel(true)
        .run(&sleep_file, &workout_file)
        .unwrap();

    // 10-01: 8h sleep, w003 (500). 10-02: 6h sleep, w001 (800). 10-03: 5.5h, w002 (600)
    let report = &output.report;
    assert_eq!(report.days().len(), 3);
    assert_eq!(
        report.day(date("2023-10-01")).unwrap().workouts.total_calories_burned,
        500.0
    );

    let summary = low_sleep_summary(report, 7.0);
    assert_eq!(summary.qualifying_days, 2);
    assert_eq!(summary.average_calories, 700);
    assert_eq!(average_calories_on_low_sleep_days(report, 7.0), 700);
}

#[test]
fn test_empty_inputs_produce_empty_report() {
    let report = build_report(BucketMap::new());
    assert!(report.is_empty());
    assert_eq!(average_calories_on_low_sleep_days(&report, 7.0), 0);

    let dir = tempfile::tempdir().unwrap();
    let sleep_file = write_feed(dir.path(), "sleep.json", json!([]));
    let workout_file = write_feed(dir.path(), "workouts.json", json!([]));

    let registry = StaticTimezoneRegistry::default();
    let output = Aggregator::new(&registry)
        .run(&sleep_file, &workout_file)
        .unwrap();
    assert!(output.report.days().is_empty());
    assert!(output.report.metadata().date_range.is_empty());
    assert_eq!(average_calories_on_low_sleep_days(&output.report, 7.0), 0);
}

#[test]
fn test_bad_records_are_skipped_with_warnings() {
    let dir = tempfile::tempdir().unwrap();
    let mut workouts = sample_workouts();
    if let Value::Array(records) = &mut workouts {
        records.push(json!({
            "workout_id": 404,
            "timestamp": "2023-10-02 10:00:00",
            "timezone": "Mars/Olympus"
        }));
        records.push(json!({"workout_id": "w-bad", "timezone": "PST"}));
    }
    let sleep_file = write_feed(dir.path(), "sleep.json", sample_sleep());
    let workout_file = write_feed(dir.path(), "workouts.json", workouts);

    let registry = StaticTimezoneRegistry::default();
    let output = Aggregator::new(&registry)
        .run(&sleep_file, &workout_file)
        .unwrap();

    assert_eq!(output.run.workout_records_skipped, 2);
    assert_eq!(output.run.sleep_records_skipped, 0);
    assert_eq!(output.report.metadata().workout_records_processed, 3);

    let ids: Vec<_> = output
        .run
        .warnings
        .iter()
        .map(|w| w.record_id.as_deref())
        .collect();
    assert_eq!(ids, vec![Some("404"), Some("w-bad")]);
    assert!(output.run.warnings[0].message.contains("Mars/Olympus"));
}

#[test]
fn test_odd_label_types_do_not_drop_records() {
    let registry = StaticTimezoneRegistry::default();
    let outcome = Aggregator::new(&registry).merge(
        vec![json!({
            "id": "s1",
            "device": 7,
            "start_time": "2023-10-01T08:00:00Z",
            "end_time": "2023-10-01T14:00:00Z",
            "duration_hours": 6,
            "quality_score": 75
        })],
        vec![
            json!({
                "workout_id": "w1",
                "app": {"name": "Strava"},
                "timestamp": "2023-10-01 09:00:00",
                "timezone": "EST",
                "calories_burned": 400
            }),
            json!({
                "workout_id": true,
                "timestamp": "2023-10-01 10:00:00",
                "timezone": "EST",
                "calories_burned": 200
            }),
        ],
    );

    assert!(outcome.warnings.is_empty());
    let day = outcome.report.day(date("2023-10-01")).unwrap();
    assert_eq!(day.sleep.count, 1);
    assert_eq!(day.workouts.count, 2);
    assert_eq!(day.workouts.total_calories_burned, 600.0);
    assert_eq!(day.sleep.records[0].raw.device, Some(json!(7)));
    assert_eq!(day.workouts.records[1].raw.workout_id, None);
    assert_eq!(average_calories_on_low_sleep_days(&outcome.report, 7.0), 600);
}

#[test]
fn test_parallel_and_sequential_runs_agree() {
    let registry = StaticTimezoneRegistry::default();
    let sleep: Vec<Value> = serde_json::from_value(sample_sleep()).unwrap();
    let workouts: Vec<Value> = serde_json::from_value(sample_workouts()).unwrap();

    let sequential = Aggregator::new(&registry).merge(sleep.clone(), workouts.clone());
    let parallel = Aggregator::new(&registry)
        .parallel(true)
        .merge(sleep, workouts);

    assert_eq!(sequential.report, parallel.report);
}

#[test]
fn test_remerging_report_records_is_stable() {
    let registry = StaticTimezoneRegistry::default();
    let sleep: Vec<Value> = serde_json::from_value(sample_sleep()).unwrap();
    let workouts: Vec<Value> = serde_json::from_value(sample_workouts()).unwrap();

    let first = Aggregator::new(&registry).merge(sleep, workouts).report;
    let first_json = serde_json::to_string(&first).unwrap();

    let (sleep, workouts) = first.into_records();
    let sleep: Vec<Value> = sleep.iter().map(|r| serde_json::to_value(r).unwrap()).collect();
    let workouts: Vec<Value> = workouts
        .iter()
        .map(|r| serde_json::to_value(r).unwrap())
        .collect();

    let second = Aggregator::new(&registry).merge(sleep, workouts);
    assert!(second.warnings.is_empty());
    assert_eq!(serde_json::to_string(&second.report).unwrap(), first_json);
}

#[test]
fn test_written_envelope_reloads_as_report() {
    let dir = tempfile::tempdir().unwrap();
    let sleep_file = write_feed(dir.path(), "sleep.json", sample_sleep());
    let workout_file = write_feed(dir.path(), "workouts.json", sample_workouts());

    let registry = StaticTimezoneRegistry::default();
    let output = Aggregator::new(&registry)
        .run(&sleep_file, &workout_file)
        .unwrap();

    let out_path = dir.path().join("out").join("report.json");
    write_output(&output, &out_path, OutputFormat::Json, true).unwrap();

    let written: Value =
        serde_json::from_str(&std::fs::read_to_string(&out_path).unwrap()).unwrap();
    assert!(written.get("metadata").is_some());
    assert!(written.get("detailed report").is_some());
    assert!(written["run"]["run_id"].is_string());
    assert_eq!(written["detailed report"][0]["sleep"]["records"][0]["date"], "2023-10-01");

    let reloaded = load_report(&out_path).unwrap();
    assert_eq!(reloaded, output.report);
    assert_eq!(average_calories_on_low_sleep_days(&reloaded, 7.0), 700);
}

#[test]
fn test_jsonl_writes_one_day_per_line() {
    let dir = tempfile::tempdir().unwrap();
    let sleep_file = write_feed(dir.path(), "sleep.json", sample_sleep());
    let workout_file = write_feed(dir.path(), "workouts.json", sample_workouts());

    let registry = StaticTimezoneRegistry::default();
    let output = Aggregator::new(&registry)
        .run(&sleep_file, &workout_file)
        .unwrap();

    let out_path = dir.path().join("days.jsonl");
    write_output(&output, &out_path, OutputFormat::Jsonl, false).unwrap();

    let content = std::fs::read_to_string(&out_path).unwrap();
    let dates: Vec<String> = content
        .lines()
        .map(|line| {
            let day: Value = serde_json::from_str(line).unwrap();
            day["date"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(dates, vec!["2023-10-01", "2023-10-02", "2023-10-03"]);
}
