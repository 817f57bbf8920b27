//! Synheart Health Merge - timezone-aware daily merge of health feeds.
//!
//! Two feeds describe the same person's days on different clocks: sleep
//! trackers report UTC instants, workout apps report a local wall-clock time
//! plus a timezone label. This library puts both on the UTC timeline, keys
//! every record by its UTC calendar date and produces one summary per day.
//!
//! # Day boundaries
//!
//! A workout logged at 23:45 in Los Angeles lands on the *next* UTC date.
//! Each workout keeps both dates: `local_date` is the day the user logged it,
//! `date` is the UTC day it is merged on. They are never conflated.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Synheart Health Merge                     │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌─────────────┐   ┌────────────┐           │
//! │  │ Timestamp  │──▶│   Record    │──▶│    Date    │           │
//! │  │ Normalizer │   │ Normalizer  │   │   Merger   │           │
//! │  └────────────┘   └─────────────┘   └────────────┘           │
//! │        ▲                 │                 │                  │
//! │        │                 ▼                 ▼                  │
//! │  ┌────────────┐   ┌─────────────┐   ┌────────────┐           │
//! │  │  Timezone  │   │  Warnings / │   │  Metrics   │           │
//! │  │  Registry  │   │   Run log   │   │   Engine   │           │
//! │  └────────────┘   └─────────────┘   └────────────┘           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use synheart_health_merge::{core, Aggregator, StaticTimezoneRegistry};
//!
//! let registry = StaticTimezoneRegistry::default();
//! let outcome = Aggregator::new(&registry).merge(
//!     vec![json!({
//!         "id": "sleep_001",
//!         "start_time": "2023-10-01T08:00:00Z",
//!         "end_time": "2023-10-01T16:00:00Z",
//!         "duration_hours": 8,
//!         "quality_score": 85
//!     })],
//!     vec![json!({
//!         "workout_id": "w001",
//!         "timestamp": "2023-10-01 23:45:00",
//!         "timezone": "PST",
//!         "calories_burned": 450
//!     })],
//! );
//!
//! // The late workout lands on the next UTC day
//! assert_eq!(outcome.report.days().len(), 2);
//! assert_eq!(core::average_calories_on_low_sleep_days(&outcome.report, 7.0), 0);
//! ```

pub mod config;
pub mod core;
pub mod pipeline;
pub mod records;
pub mod run_log;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use crate::core::{
    AggregateReport, AggregationOutput, DailySummary, NormalizationError, NormalizationWarning,
    ReportBuilder, StaticTimezoneRegistry, TimestampError, TimezoneRegistry,
};
pub use pipeline::{Aggregator, LoadError, MergeOutcome, OutputError, OutputFormat};
pub use records::{NormalizedRecord, NormalizedSleep, NormalizedWorkout, SourceKind};
pub use run_log::{RunLog, RunStats, SharedRunLog};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
