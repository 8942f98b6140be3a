//! Source-side types: one record of the mirrored database.
//!
//! Records are read-only snapshots fetched fresh on every run.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single record from the source collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Stable identity in the source system
    pub id: String,
    pub title: String,
    pub schedule: RecordSchedule,
    /// Page body as a forest of blocks
    pub content: Vec<ContentBlock>,
    /// False when the body could not be fetched. `content` is then empty
    /// and says nothing about the page.
    #[serde(default = "body_fetched")]
    pub content_complete: bool,
    pub last_edited: DateTime<Utc>,
}

fn body_fetched() -> bool {
    true
}

/// When a record happens.
///
/// Records without any date never reach the engine: the source collaborator
/// drops them, so they count as absent from the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordSchedule {
    /// Date only, `end` inclusive
    Date {
        start: NaiveDate,
        end: Option<NaiveDate>,
    },
    /// Date and time
    Timed {
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    /// Heading with its level (1-3)
    Heading(u8),
    Paragraph,
    BulletedItem,
    NumberedItem,
    ToDo { checked: bool },
    Quote,
    /// Any other block that carries text (callouts, toggles, ...)
    Other,
}

/// One node of a page body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub kind: BlockKind,
    pub text: String,
    #[serde(default)]
    pub children: Vec<ContentBlock>,
}

impl ContentBlock {
    pub fn new(kind: BlockKind, text: impl Into<String>) -> Self {
        ContentBlock {
            kind,
            text: text.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<ContentBlock>) -> Self {
        self.children = children;
        self
    }
}
