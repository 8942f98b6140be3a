use google_calendar::types::{Event, EventDateTime};
use notion_gcal_core::{EventTime, NormalizedEvent, RemoteError, TargetEvent};
use serde_json::json;

/// Private extended property set on every event the sync writes.
pub const MANAGED_KEY: &str = "source";
pub const MANAGED_VALUE: &str = "notion-sync";

/// The `privateExtendedProperty` filter that lists managed events.
pub fn managed_filter() -> String {
    format!("{MANAGED_KEY}={MANAGED_VALUE}")
}

fn to_google_time(time: &EventTime) -> EventDateTime {
    match time {
        EventTime::Date(d) => EventDateTime {
            date: Some(*d),
            date_time: None,
            time_zone: String::new(),
        },
        EventTime::DateTime(dt) => EventDateTime {
            date: None,
            date_time: Some(*dt),
            time_zone: String::new(),
        },
    }
}

fn from_google_time(time: Option<&EventDateTime>) -> Option<EventTime> {
    let time = time?;
    match (time.date_time, time.date) {
        (Some(dt), _) => Some(EventTime::DateTime(dt)),
        (None, Some(d)) => Some(EventTime::Date(d)),
        (None, None) => None,
    }
}

/// The body sent on insert and update, as JSON. Google assigns the id.
pub fn event_body(event: &NormalizedEvent) -> serde_json::Value {
    let mut body = json!({
        "summary": event.title,
        "description": event.description,
        "start": to_google_time(&event.start),
        "end": to_google_time(&event.end),
    });
    body["extendedProperties"]["private"][MANAGED_KEY] = json!(MANAGED_VALUE);
    body
}

pub fn to_google_event(event: &NormalizedEvent) -> Result<Event, RemoteError> {
    serde_json::from_value(event_body(event))
        .map_err(|e| RemoteError::permanent(format!("Could not build event body: {e}")))
}

/// `None` for cancelled events, which Google keeps around after deletion.
pub fn from_google_event(event: Event) -> Result<Option<TargetEvent>, RemoteError> {
    if event.status == "cancelled" {
        return Ok(None);
    }

    let (Some(start), Some(end)) = (
        from_google_time(event.start.as_ref()),
        from_google_time(event.end.as_ref()),
    ) else {
        return Err(RemoteError::permanent(format!(
            "Event {} has no start or end",
            event.id
        )));
    };

    Ok(Some(TargetEvent {
        id: event.id,
        title: event.summary,
        start,
        end,
        description: event.description,
    }))
}
