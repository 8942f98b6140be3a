//! Calendar-side event types.
//!
//! `NormalizedEvent` is what the engine wants the calendar to show for one
//! source record. `TargetEvent` is what the calendar actually holds.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTime {
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
}

impl EventTime {
    /// Sort key: all-day times count from midnight UTC.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            EventTime::DateTime(dt) => *dt,
            EventTime::Date(d) => d.and_time(NaiveTime::MIN).and_utc(),
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    /// Same instant or day, ignoring sub-second precision.
    pub fn same_as(&self, other: &EventTime) -> bool {
        match (self, other) {
            (EventTime::Date(a), EventTime::Date(b)) => a == b,
            (EventTime::DateTime(a), EventTime::DateTime(b)) => {
                a.with_nanosecond(0) == b.with_nanosecond(0)
            }
            _ => false,
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M UTC")),
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// The canonical calendar event derived from one source record.
///
/// Deterministic in the record: the same record always yields a byte-identical
/// serialization, so change detection compares fingerprints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub source_id: String,
    pub title: String,
    pub start: EventTime,
    /// Exclusive end (the day after the last day for all-day events)
    pub end: EventTime,
    pub description: String,
}

impl NormalizedEvent {
    pub fn is_all_day(&self) -> bool {
        self.start.is_date()
    }

    /// Hex SHA-256 of the JSON serialization.
    pub fn fingerprint(&self) -> String {
        // Only strings and dates in here, serialization cannot fail.
        let serialized = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&serialized))
    }
}

impl fmt::Display for NormalizedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// An event as currently stored in the target calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetEvent {
    pub id: String,
    pub title: String,
    pub start: EventTime,
    pub end: EventTime,
    pub description: String,
}

impl TargetEvent {
    /// Whether the calendar still shows exactly what `event` asks for.
    pub fn matches(&self, event: &NormalizedEvent) -> bool {
        self.title == event.title
            && self.description.trim() == event.description.trim()
            && self.start.same_as(&event.start)
            && self.end.same_as(&event.end)
    }
}
