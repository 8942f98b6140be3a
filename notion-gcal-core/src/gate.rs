//! Cheap "did anything change?" check run before a full reconciliation.

use chrono::{DateTime, Duration, Utc};

/// Notion rounds `last_edited_time` down to the minute.
fn source_resolution() -> Duration {
    Duration::minutes(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Skip,
    Proceed,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeGate;

impl ChangeGate {
    /// Skip when the collection has not been modified since the watermark.
    pub fn check(
        &self,
        last_modified: DateTime<Utc>,
        watermark: Option<DateTime<Utc>>,
        force: bool,
    ) -> GateDecision {
        if force {
            return GateDecision::Proceed;
        }

        match watermark {
            Some(watermark) if last_modified <= watermark => GateDecision::Skip,
            _ => GateDecision::Proceed,
        }
    }

    /// The watermark to store after a clean pass that started at
    /// `started_at` and saw `last_modified`.
    ///
    /// An edit made later in the same minute as `last_modified` reports the
    /// same timestamp, so within that minute the watermark stays one step
    /// behind and the next check proceeds.
    pub fn watermark_after(
        &self,
        last_modified: DateTime<Utc>,
        started_at: DateTime<Utc>,
    ) -> DateTime<Utc> {
        if started_at - last_modified < source_resolution() {
            last_modified - source_resolution()
        } else {
            last_modified
        }
    }
}
