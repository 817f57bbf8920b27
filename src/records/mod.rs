//! Record shapes for the two health feeds.
//!
//! Sleep records arrive anchored to UTC; workout records arrive as a local
//! wall-clock reading plus a timezone label.

pub mod types;

// Re-export commonly used types
pub use types::{
    Extra, NormalizedRecord, NormalizedSleep, NormalizedWorkout, RawSleepRecord,
    RawWorkoutRecord, SourceKind,
};
