//! Notion's JSON shapes and how they map onto source records.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use notion_gcal_core::{BlockKind, RecordSchedule};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct Database {
    pub last_edited_time: DateTime<Utc>,
}

/// One page of a paginated list endpoint.
#[derive(Debug, Deserialize)]
pub struct ListPage<T> {
    pub results: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Page {
    pub id: String,
    pub last_edited_time: DateTime<Utc>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub in_trash: bool,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
}

impl Page {
    pub fn is_live(&self) -> bool {
        !self.archived && !self.in_trash
    }

    /// First fragment of the title property, like the Notion UI shows it.
    pub fn title(&self, property: &str) -> String {
        let Some(first) = self
            .properties
            .get(property)
            .and_then(|p| p.get("title"))
            .and_then(Value::as_array)
            .and_then(|fragments| fragments.first())
        else {
            return String::new();
        };

        first
            .get("plain_text")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| first.pointer("/text/content").and_then(Value::as_str))
            .unwrap_or_default()
            .to_string()
    }

    pub fn schedule(&self, property: &str) -> Option<RecordSchedule> {
        let date = self.properties.get(property)?.get("date")?;
        let start = date.get("start")?.as_str()?;
        let end = date.get("end").and_then(Value::as_str);
        parse_schedule(start, end)
    }
}

enum WireDate {
    Date(NaiveDate),
    Timed(DateTime<Utc>),
}

fn parse_date(value: &str) -> Option<WireDate> {
    if let Ok(d) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(WireDate::Date(d));
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| WireDate::Timed(dt.with_timezone(&Utc)))
}

/// Notion sends `YYYY-MM-DD` for all-day dates and RFC 3339 otherwise.
pub fn parse_schedule(start: &str, end: Option<&str>) -> Option<RecordSchedule> {
    let end = end.and_then(parse_date);

    match parse_date(start)? {
        WireDate::Date(start) => Some(RecordSchedule::Date {
            start,
            end: match end {
                Some(WireDate::Date(d)) => Some(d),
                Some(WireDate::Timed(dt)) => Some(dt.date_naive()),
                None => None,
            },
        }),
        WireDate::Timed(start) => Some(RecordSchedule::Timed {
            start,
            end: match end {
                Some(WireDate::Timed(dt)) => Some(dt),
                _ => None,
            },
        }),
    }
}

#[derive(Debug, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub has_children: bool,
    /// The type-specific payload lives under a key named after the type
    #[serde(flatten)]
    pub payload: HashMap<String, Value>,
}

impl Block {
    fn body(&self) -> Option<&Value> {
        self.payload.get(&self.kind)
    }

    pub fn block_kind(&self) -> BlockKind {
        match self.kind.as_str() {
            "heading_1" => BlockKind::Heading(1),
            "heading_2" => BlockKind::Heading(2),
            "heading_3" => BlockKind::Heading(3),
            "paragraph" => BlockKind::Paragraph,
            "bulleted_list_item" => BlockKind::BulletedItem,
            "numbered_list_item" => BlockKind::NumberedItem,
            "to_do" => BlockKind::ToDo {
                checked: self
                    .body()
                    .and_then(|b| b.get("checked"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            },
            "quote" => BlockKind::Quote,
            _ => BlockKind::Other,
        }
    }

    /// All rich-text fragments joined. Blocks without rich text give "".
    pub fn text(&self) -> String {
        self.body()
            .and_then(|b| b.get("rich_text"))
            .and_then(Value::as_array)
            .map(|fragments| {
                fragments
                    .iter()
                    .filter_map(|f| f.get("plain_text").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }
}
