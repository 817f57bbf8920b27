//! Timestamp normalization.
//!
//! Sleep feeds report instants already on the UTC clock. Workout feeds report
//! a civil wall-clock reading plus a timezone label. Everything here turns
//! both into UTC instants so the two feeds can be keyed by the same
//! calendar date.
//!
//! Timezone labels resolve to rule-based IANA zones, never to a fixed
//! offset: `PST` means "America/Los_Angeles", which is UTC-8 in January and
//! UTC-7 in October.

use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;
use std::collections::BTreeMap;

/// Accepted layouts for civil date-times. The workout feed writes
/// `%Y-%m-%d %H:%M:%S`; fractional seconds are optional.
const LOCAL_LAYOUTS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Errors raised while parsing timestamps or resolving timezones.
#[derive(Debug, Clone, PartialEq)]
pub enum TimestampError {
    /// Text is not a valid calendar date-time
    MalformedTimestamp { text: String },
    /// Label is not in the timezone registry
    UnknownTimezone { label: String },
    /// A local timestamp could not be converted; carries both inputs
    InvalidLocalTimestamp {
        text: String,
        label: String,
        source: Box<TimestampError>,
    },
}

impl std::fmt::Display for TimestampError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimestampError::MalformedTimestamp { text } => {
                write!(f, "Invalid timestamp format: {text}")
            }
            TimestampError::UnknownTimezone { label } => write!(f, "Unknown timezone: {label}"),
            TimestampError::InvalidLocalTimestamp { text, label, source } => write!(
                f,
                "Invalid local timestamp format or timezone: {text}, {label} ({source})"
            ),
        }
    }
}

impl std::error::Error for TimestampError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TimestampError::InvalidLocalTimestamp { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Lookup from feed timezone labels to rule-based zones.
pub trait TimezoneRegistry: Send + Sync {
    /// Resolve a label, or `None` if it is not registered.
    fn lookup(&self, label: &str) -> Option<Tz>;

    /// All registered labels with their zones, sorted by label.
    fn entries(&self) -> Vec<(String, Tz)>;
}

/// Table-backed registry.
///
/// The default table covers the four continental North American zones by
/// their standard abbreviations plus the `UTC`/`GMT` aliases. Labels match
/// exactly; `pst` is not `PST`.
#[derive(Debug, Clone)]
pub struct StaticTimezoneRegistry {
    zones: BTreeMap<String, Tz>,
}

impl StaticTimezoneRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            zones: BTreeMap::new(),
        }
    }

    /// Register (or replace) a label.
    pub fn with_zone(mut self, label: impl Into<String>, zone: Tz) -> Self {
        self.zones.insert(label.into(), zone);
        self
    }

    /// Register a label by IANA name, e.g. `("CET", "Europe/Paris")`.
    pub fn with_iana_alias(self, label: impl Into<String>, iana: &str) -> Result<Self, TimestampError> {
        let zone: Tz = iana.parse().map_err(|_| TimestampError::UnknownTimezone {
            label: iana.to_string(),
        })?;
        Ok(self.with_zone(label, zone))
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

impl Default for StaticTimezoneRegistry {
    fn default() -> Self {
        Self::empty()
            .with_zone("UTC", Tz::UTC)
            .with_zone("GMT", Tz::UTC)
            .with_zone("PST", Tz::America__Los_Angeles)
            .with_zone("MST", Tz::America__Denver)
            .with_zone("CST", Tz::America__Chicago)
            .with_zone("EST", Tz::America__New_York)
    }
}

impl TimezoneRegistry for StaticTimezoneRegistry {
    fn lookup(&self, label: &str) -> Option<Tz> {
        self.zones.get(label).copied()
    }

    fn entries(&self) -> Vec<(String, Tz)> {
        self.zones.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }
}

/// Parse an ISO-8601 instant on the UTC clock.
///
/// `Z` and `+00:00` are equivalent. Any other explicit offset is honoured and
/// converted. Text without an offset is read as UTC.
pub fn parse_utc_instant(text: &str) -> Result<DateTime<Utc>, TimestampError> {
    let trimmed = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    parse_civil(trimmed)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| TimestampError::MalformedTimestamp {
            text: text.to_string(),
        })
}

/// Resolve a timezone label against a registry.
pub fn resolve_timezone(
    registry: &dyn TimezoneRegistry,
    label: &str,
) -> Result<Tz, TimestampError> {
    registry
        .lookup(label)
        .ok_or_else(|| TimestampError::UnknownTimezone {
            label: label.to_string(),
        })
}

/// Convert a civil wall-clock reading in a labelled zone to a UTC instant.
///
/// Returns the instant and, independently, the civil date exactly as it was
/// written. The offset applied is the zone's offset on that date.
pub fn parse_local_instant(
    registry: &dyn TimezoneRegistry,
    text: &str,
    label: &str,
) -> Result<(DateTime<Utc>, NaiveDate), TimestampError> {
    let invalid = |source: TimestampError| TimestampError::InvalidLocalTimestamp {
        text: text.to_string(),
        label: label.to_string(),
        source: Box::new(source),
    };

    let naive = parse_civil(text.trim()).ok_or_else(|| {
        invalid(TimestampError::MalformedTimestamp {
            text: text.to_string(),
        })
    })?;
    let zone = resolve_timezone(registry, label).map_err(invalid)?;

    Ok((localize(&zone, naive), naive.date()))
}

/// The calendar date of a UTC instant.
pub fn canonical_date(instant: &DateTime<Utc>) -> NaiveDate {
    instant.date_naive()
}

/// Attach a zone to a civil time and convert to UTC.
///
/// Fall-back overlaps take the earlier instant. Spring-forward gaps are read
/// with the offset in force before the transition.
fn localize(zone: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            let before = zone
                .offset_from_utc_datetime(&(naive - Duration::days(1)))
                .fix();
            let utc = naive - Duration::seconds(i64::from(before.local_minus_utc()));
            Utc.from_utc_datetime(&utc)
        }
    }
}

fn parse_civil(text: &str) -> Option<NaiveDateTime> {
    LOCAL_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(text, layout).ok())
}
