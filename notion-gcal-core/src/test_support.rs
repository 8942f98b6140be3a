//! In-memory collaborators for engine and trigger tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::engine::{Engine, EngineSettings};
use crate::error::RemoteError;
use crate::event::{NormalizedEvent, TargetEvent};
use crate::normalize::NormalizeOptions;
use crate::record::{RecordSchedule, SourceRecord};
use crate::remote::{SourceCollection, TargetCalendar};

pub(crate) const COLLECTION: &str = "db-1234";

pub(crate) fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
}

pub(crate) fn date_record(id: &str, title: &str, date: &str) -> SourceRecord {
    SourceRecord {
        id: id.to_string(),
        title: title.to_string(),
        schedule: RecordSchedule::Date {
            start: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            end: None,
        },
        content: vec![],
        content_complete: true,
        last_edited: at(1, 0),
    }
}

pub(crate) fn timed_record(
    id: &str,
    title: &str,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
) -> SourceRecord {
    SourceRecord {
        id: id.to_string(),
        title: title.to_string(),
        schedule: RecordSchedule::Timed { start, end },
        content: vec![],
        content_complete: true,
        last_edited: at(1, 0),
    }
}

pub(crate) fn settings(dir: &Path) -> EngineSettings {
    EngineSettings {
        collection_id: COLLECTION.to_string(),
        state_file: dir.join("synced_events.json"),
        lock_file: dir.join("synced_events.lock"),
        safety_threshold: 10,
        request_timeout: Duration::from_secs(5),
        fetch_timeout: Duration::from_secs(5),
        verify_target: false,
        normalize: NormalizeOptions::default(),
    }
}

pub(crate) fn engine_with(
    settings: EngineSettings,
    source: &Arc<FakeSource>,
    target: &Arc<FakeTarget>,
) -> Engine {
    Engine::new(settings, source.clone(), target.clone())
}

pub(crate) struct FakeSource {
    records: Mutex<Vec<SourceRecord>>,
    last_modified: Mutex<DateTime<Utc>>,
    failure: Mutex<Option<RemoteError>>,
    list_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(records: Vec<SourceRecord>) -> Arc<Self> {
        Arc::new(FakeSource {
            records: Mutex::new(records),
            last_modified: Mutex::new(at(1, 0)),
            failure: Mutex::new(None),
            list_calls: AtomicUsize::new(0),
        })
    }

    pub fn set_records(&self, records: Vec<SourceRecord>) {
        *self.records.lock().unwrap() = records;
    }

    pub fn touch(&self, last_modified: DateTime<Utc>) {
        *self.last_modified.lock().unwrap() = last_modified;
    }

    pub fn fail_with(&self, error: RemoteError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceCollection for FakeSource {
    async fn last_modified(&self, collection_id: &str) -> Result<DateTime<Utc>, RemoteError> {
        assert_eq!(collection_id, COLLECTION);
        Ok(*self.last_modified.lock().unwrap())
    }

    async fn list_records(&self, _collection_id: &str) -> Result<Vec<SourceRecord>, RemoteError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failure.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self.records.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub(crate) struct FakeTarget {
    events: Mutex<BTreeMap<String, NormalizedEvent>>,
    next_id: AtomicUsize,
    /// Keyed by source id (create/update) or target id (delete)
    failures: Mutex<HashMap<String, RemoteError>>,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
    /// Events created by someone else, never listed as managed
    foreign: Mutex<HashSet<String>>,
    list_failure: Mutex<Option<RemoteError>>,
}

impl FakeTarget {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeTarget::default())
    }

    /// Pretend `target_id` already holds `event`.
    pub fn seed(&self, target_id: &str, event: NormalizedEvent) {
        self.events.lock().unwrap().insert(target_id.to_string(), event);
    }

    /// An event in the calendar that was not created by the sync.
    pub fn seed_foreign(&self, target_id: &str, event: NormalizedEvent) {
        self.foreign.lock().unwrap().insert(target_id.to_string());
        self.seed(target_id, event);
    }

    pub fn fail_listing_with(&self, error: RemoteError) {
        *self.list_failure.lock().unwrap() = Some(error);
    }

    pub fn remove(&self, target_id: &str) {
        self.events.lock().unwrap().remove(target_id);
    }

    pub fn fail_on(&self, key: &str, error: RemoteError) {
        self.failures.lock().unwrap().insert(key.to_string(), error);
    }

    pub fn delay_by(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn events(&self) -> BTreeMap<String, NormalizedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn event_for(&self, source_id: &str) -> Option<(String, NormalizedEvent)> {
        self.events()
            .into_iter()
            .find(|(_, e)| e.source_id == source_id)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self, key: &str) -> Result<(), RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.failures.lock().unwrap().get(key) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TargetCalendar for FakeTarget {
    async fn create_event(&self, event: &NormalizedEvent) -> Result<String, RemoteError> {
        self.enter(&event.source_id).await?;
        let id = format!("g-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.seed(&id, event.clone());
        Ok(id)
    }

    async fn update_event(
        &self,
        target_id: &str,
        event: &NormalizedEvent,
    ) -> Result<(), RemoteError> {
        self.enter(&event.source_id).await?;
        let mut events = self.events.lock().unwrap();
        match events.get_mut(target_id) {
            Some(existing) => {
                *existing = event.clone();
                Ok(())
            }
            None => Err(RemoteError::not_found(format!("{target_id} not found"))),
        }
    }

    async fn delete_event(&self, target_id: &str) -> Result<(), RemoteError> {
        self.enter(target_id).await?;
        self.remove(target_id);
        Ok(())
    }

    async fn get_event(&self, target_id: &str) -> Result<Option<TargetEvent>, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.events.lock().unwrap().get(target_id).map(|e| TargetEvent {
            id: target_id.to_string(),
            title: e.title.clone(),
            start: e.start.clone(),
            end: e.end.clone(),
            description: e.description.clone(),
        }))
    }

    async fn list_managed_events(&self) -> Result<Vec<String>, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.list_failure.lock().unwrap().clone() {
            return Err(error);
        }
        let foreign = self.foreign.lock().unwrap().clone();
        Ok(self
            .events()
            .into_keys()
            .filter(|id| !foreign.contains(id))
            .collect())
    }
}
