//! Raw and normalized health record shapes.
//!
//! Raw records carry the fields the merge needs plus an open extension bag,
//! so anything else a device or app writes passes through untouched.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Unrecognized fields carried through normalization.
pub type Extra = BTreeMap<String, Value>;

/// Which feed a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Sleep,
    Workout,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Sleep => write!(f, "sleep"),
            SourceKind::Workout => write!(f, "workout"),
        }
    }
}

/// A sleep interval as reported by a tracker. Both instants are UTC text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSleepRecord {
    #[serde(
        default,
        deserialize_with = "lenient_id::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    /// Free-form label; any JSON type is carried as-is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<Value>,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub duration_hours: f64,
    #[serde(default)]
    pub quality_score: f64,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A discrete workout logged against the user's wall clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawWorkoutRecord {
    #[serde(
        default,
        deserialize_with = "lenient_id::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub workout_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<Value>,
    /// Civil date-time with no offset, e.g. `2023-10-01 23:45:00`
    pub timestamp: String,
    /// Registry label such as `PST`
    pub timezone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_type: Option<Value>,
    #[serde(default)]
    pub duration_minutes: f64,
    #[serde(default)]
    pub calories_burned: f64,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Keys written by sleep normalization. Stripped from the extension bag when
/// a normalized record is fed back in.
pub const SLEEP_DERIVED_KEYS: &[&str] = &[
    "start_time_utc",
    "end_time_utc",
    "date",
    "canonical_date",
    "source",
];

/// Keys written by workout normalization.
pub const WORKOUT_DERIVED_KEYS: &[&str] = &[
    "timestamp_utc",
    "timestamp_local",
    "local_date",
    "date",
    "canonical_date",
    "source",
];

impl RawSleepRecord {
    /// Read a sleep record out of a loosely-typed JSON value.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Drop keys that normalization owns.
    pub(crate) fn strip_derived(&mut self) {
        for key in SLEEP_DERIVED_KEYS {
            self.extra.remove(*key);
        }
    }
}

impl RawWorkoutRecord {
    /// Read a workout record out of a loosely-typed JSON value.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub(crate) fn strip_derived(&mut self) {
        for key in WORKOUT_DERIVED_KEYS {
            self.extra.remove(*key);
        }
    }
}

/// A sleep record tagged with its UTC instants and canonical date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSleep {
    #[serde(flatten)]
    pub raw: RawSleepRecord,
    pub start_time_utc: DateTime<Utc>,
    pub end_time_utc: DateTime<Utc>,
    /// UTC calendar date of `start_time_utc`; the merge key
    #[serde(rename = "date", alias = "canonical_date")]
    pub canonical_date: NaiveDate,
    pub source: SourceKind,
}

/// A workout record tagged with its UTC instant, canonical date and the
/// civil date it was logged on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedWorkout {
    #[serde(flatten)]
    pub raw: RawWorkoutRecord,
    pub timestamp_utc: DateTime<Utc>,
    /// Verbatim copy of the raw wall-clock text
    pub timestamp_local: String,
    pub local_date: NaiveDate,
    #[serde(rename = "date", alias = "canonical_date")]
    pub canonical_date: NaiveDate,
    pub source: SourceKind,
}

/// Either kind of normalized record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedRecord {
    Sleep(NormalizedSleep),
    Workout(NormalizedWorkout),
}

impl NormalizedRecord {
    pub fn canonical_date(&self) -> NaiveDate {
        match self {
            NormalizedRecord::Sleep(r) => r.canonical_date,
            NormalizedRecord::Workout(r) => r.canonical_date,
        }
    }
}

impl From<NormalizedSleep> for NormalizedRecord {
    fn from(record: NormalizedSleep) -> Self {
        NormalizedRecord::Sleep(record)
    }
}

impl From<NormalizedWorkout> for NormalizedRecord {
    fn from(record: NormalizedWorkout) -> Self {
        NormalizedRecord::Workout(record)
    }
}

/// Identifier field of a raw JSON record, as text.
///
/// Works on the loosely-typed value so a record can be named in warnings
/// even when it fails to deserialize.
pub fn id_from_value(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Some feeds write numeric identifiers; keep them as text. Any other
/// shape leaves the record unnamed rather than invalid.
mod lenient_id {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(_) => Ok(None),
        }
    }
}
