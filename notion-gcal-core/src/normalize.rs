//! Maps a source record onto the event the calendar should show.

use chrono::{Days, Duration};

use crate::content::{FlattenOptions, flatten};
use crate::event::{EventTime, NormalizedEvent};
use crate::record::{RecordSchedule, SourceRecord};

/// Marks events as managed by the sync.
pub const DEFAULT_TITLE_PREFIX: &str = "‣ ";
pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOptions {
    pub title_prefix: String,
    /// Length of a timed event that has no end
    pub default_duration: Duration,
    pub flatten: FlattenOptions,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        NormalizeOptions {
            title_prefix: DEFAULT_TITLE_PREFIX.to_string(),
            default_duration: Duration::hours(1),
            flatten: FlattenOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    options: NormalizeOptions,
}

impl Normalizer {
    pub fn new(options: NormalizeOptions) -> Self {
        Normalizer { options }
    }

    /// Pure and total: every record maps to exactly one event.
    ///
    /// - date only: all-day, end is the day after the last day
    /// - timed: end defaults to `start + default_duration`
    /// - an end that is not after the start counts as missing
    pub fn normalize(&self, record: &SourceRecord) -> NormalizedEvent {
        let (start, end) = match &record.schedule {
            RecordSchedule::Date { start, end } => {
                let last_day = end.filter(|e| e >= start).unwrap_or(*start);
                let exclusive_end = last_day.checked_add_days(Days::new(1)).unwrap_or(last_day);
                (EventTime::Date(*start), EventTime::Date(exclusive_end))
            }
            RecordSchedule::Timed { start, end } => {
                let end = end
                    .filter(|e| e > start)
                    .unwrap_or(*start + self.options.default_duration);
                (EventTime::DateTime(*start), EventTime::DateTime(end))
            }
        };

        NormalizedEvent {
            source_id: record.id.clone(),
            title: self.title(&record.title),
            start,
            end,
            description: flatten(&record.content, &self.options.flatten),
        }
    }

    fn title(&self, raw: &str) -> String {
        let title = raw.trim();
        let title = if title.is_empty() { UNTITLED } else { title };
        format!("{}{}", self.options.title_prefix, title)
    }
}
