//! Synheart Health Merge CLI
//!
//! Merges a UTC sleep feed and a local-time workout feed into daily summaries.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use synheart_health_merge::{
    config::Config,
    core::{low_sleep_summary, sleep_calorie_correlation, AggregateReport, TimezoneRegistry},
    pipeline::{default_output_path, load_report, write_output, Aggregator, OutputFormat},
    run_log::create_shared_log,
    VERSION,
};

#[derive(Parser)]
#[command(name = "synheart-merge")]
#[command(author = "Synheart")]
#[command(version = VERSION)]
#[command(about = "Merge health datasets with proper timezone normalization", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a sleep feed (UTC) and a workout feed (local time) by UTC date
    Merge {
        /// Path to sleep data file (JSON, timestamps in UTC)
        sleep_file: PathBuf,

        /// Path to workout data file (JSON, timestamps in local time)
        workout_file: PathBuf,

        /// Output file (defaults to a timestamped file in the export directory)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Output format (json or jsonl)
        #[arg(long, default_value = "json")]
        format: OutputFormat,

        /// Low-sleep threshold in hours (defaults to the configured value)
        #[arg(long)]
        threshold: Option<f64>,

        /// Normalize both feeds on the calling thread
        #[arg(long)]
        sequential: bool,
    },

    /// Compute metrics over a previously written report
    Metrics {
        /// Report file written by `merge`
        report_file: PathBuf,

        /// Low-sleep threshold in hours (defaults to the configured value)
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// List recognized timezone labels
    Timezones,

    /// Show configuration
    Config {
        /// Write the default configuration file if none exists
        #[arg(long)]
        init: bool,
    },
}

fn main() {
    init_logging();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Merge {
            sleep_file,
            workout_file,
            output,
            format,
            threshold,
            sequential,
        } => cmd_merge(
            &sleep_file,
            &workout_file,
            output.as_deref(),
            format,
            threshold,
            sequential,
        ),
        Commands::Metrics {
            report_file,
            threshold,
        } => cmd_metrics(&report_file, threshold),
        Commands::Timezones => cmd_timezones(),
        Commands::Config { init } => cmd_config(init),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config() -> Config {
    Config::load().unwrap_or_else(|e| {
        tracing::warn!("Could not load config, using defaults: {e}");
        Config::default()
    })
}

fn cmd_merge(
    sleep_file: &Path,
    workout_file: &Path,
    output: Option<&Path>,
    format: OutputFormat,
    threshold: Option<f64>,
    sequential: bool,
) -> Result<()> {
    let config = load_config();
    let registry = config
        .build_registry()
        .context("building timezone registry")?;
    let threshold = threshold.unwrap_or(config.low_sleep_threshold_hours);

    println!("Synheart Health Merge v{VERSION}");
    println!("{}", "=".repeat(50));

    let run_log = create_shared_log();
    let aggregator = Aggregator::new(&registry)
        .parallel(config.parallel && !sequential)
        .with_run_log(run_log.clone());

    println!();
    println!("Loading and normalizing timestamps to UTC...");
    let result = aggregator
        .run(sleep_file, workout_file)
        .context("loading input data")?;

    // Each skipped record was already logged as a warning
    let skipped = result.run.sleep_records_skipped + result.run.workout_records_skipped;
    if skipped > 0 {
        println!("Skipped {skipped} record(s), see warnings above");
    }
    println!("Dates merged");

    let meta = result.report.metadata();
    println!();
    println!("Report:");
    println!("  Sleep records processed: {}", meta.sleep_records_processed);
    println!("  Workout records processed: {}", meta.workout_records_processed);
    println!("  Dates covered: {}", meta.dates_covered);
    match (meta.date_range.start, meta.date_range.end) {
        (Some(start), Some(end)) => println!("  Date range: {start} to {end}"),
        _ => println!("  Date range: (empty)"),
    }

    print_metrics(&result.report, threshold);

    let path = match output {
        Some(path) => path.to_path_buf(),
        None => {
            config
                .ensure_directories()
                .context("creating export directory")?;
            default_output_path(&config.export_path, format, result.run.generated_at)
        }
    };

    println!();
    println!("Writing result to {}...", path.display());
    write_output(&result, &path, format, config.pretty)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Result written");

    println!();
    println!("{}", run_log.summary());
    println!();
    println!("Aggregation completed!");
    Ok(())
}

fn cmd_metrics(report_file: &Path, threshold: Option<f64>) -> Result<()> {
    let config = load_config();
    let threshold = threshold.unwrap_or(config.low_sleep_threshold_hours);

    let report = load_report(report_file)
        .with_context(|| format!("reading report {}", report_file.display()))?;
    println!("Report: {} day(s)", report.days().len());
    print_metrics(&report, threshold);
    Ok(())
}

fn print_metrics(report: &AggregateReport, threshold: f64) {
    let low_sleep = low_sleep_summary(report, threshold);

    println!();
    println!("Metrics:");
    println!(
        "  Average calories on days with < {}h sleep: {} ({} day(s))",
        low_sleep.threshold_hours, low_sleep.average_calories, low_sleep.qualifying_days
    );
    match sleep_calorie_correlation(report) {
        Some(r) => println!("  Sleep/calorie correlation: {r:.3}"),
        None => println!("  Sleep/calorie correlation: n/a"),
    }
}

fn cmd_timezones() -> Result<()> {
    let config = load_config();
    let registry = config
        .build_registry()
        .context("building timezone registry")?;

    println!("Recognized timezone labels");
    println!("==========================");
    println!();
    for (label, zone) in registry.entries() {
        println!("  {label:<6} {}", zone.name());
    }
    Ok(())
}

fn cmd_config(init: bool) -> Result<()> {
    let config = load_config();
    let path = Config::config_path();

    if init {
        if path.exists() {
            println!("Config file already exists: {path:?}");
        } else {
            config.save().context("writing configuration")?;
            println!("Wrote default configuration to {path:?}");
        }
        println!();
    }

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {path:?}");
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).context("serializing configuration")?
    );
    Ok(())
}
