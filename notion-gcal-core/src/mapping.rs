//! Durable source id -> target id mapping, plus the sync watermark.
//!
//! Stored as JSON. Loading never fails: a missing file is an empty store,
//! an unreadable one is an empty store in degraded mode.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult};

const STATE_VERSION: u32 = 1;

fn current_version() -> u32 {
    STATE_VERSION
}

/// Link between one source record and the target event it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub target_id: String,
    /// Fingerprint of the last event pushed for this record
    #[serde(default)]
    pub event_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<DateTime<Utc>>,
}

impl MappingEntry {
    pub fn new(target_id: impl Into<String>, event_hash: impl Into<String>) -> Self {
        MappingEntry {
            target_id: target_id.into(),
            event_hash: event_hash.into(),
            synced_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct MappingFile {
    #[serde(default = "current_version")]
    version: u32,
    #[serde(default)]
    watermark: Option<DateTime<Utc>>,
    #[serde(default)]
    entries: BTreeMap<String, MappingEntry>,
}

impl Default for MappingFile {
    fn default() -> Self {
        MappingFile {
            version: STATE_VERSION,
            watermark: None,
            entries: BTreeMap::new(),
        }
    }
}

impl MappingFile {
    fn parse(content: &str) -> Result<Self, serde_json::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let value: serde_json::Value = serde_json::from_str(content)?;

        // A bare list of synced page ids has no calendar ids to map to.
        // `reset` finds those events by their tag instead.
        if value.is_array() {
            return Err(serde::de::Error::custom(
                "mapping file lists page ids without calendar event ids; run `reset` to remove \
                 the events it refers to",
            ));
        }

        let is_current = value.as_object().is_some_and(|o| {
            o.contains_key("version") || o.contains_key("entries") || o.contains_key("watermark")
        });

        if is_current {
            return serde_json::from_value(value);
        }

        // Unversioned files are a flat {source_id: target_id} object.
        // Entries come back without a hash, so each is pushed once more.
        let legacy: BTreeMap<String, String> = serde_json::from_value(value)?;
        let entries = legacy
            .into_iter()
            .map(|(source_id, target_id)| {
                (
                    source_id,
                    MappingEntry {
                        target_id,
                        event_hash: String::new(),
                        synced_at: None,
                    },
                )
            })
            .collect();

        Ok(MappingFile {
            entries,
            ..Self::default()
        })
    }
}

/// In-memory view of the mapping file.
#[derive(Debug, Clone)]
pub struct MappingStore {
    path: PathBuf,
    data: MappingFile,
    degraded: bool,
}

impl MappingStore {
    /// An empty store that will be written to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        MappingStore {
            path: path.into(),
            data: MappingFile::default(),
            degraded: false,
        }
    }

    pub fn load(path: impl Into<PathBuf>) -> Self {
        let mut store = Self::empty(path);

        let content = match std::fs::read_to_string(&store.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %store.path.display(), "No mapping file yet, starting empty");
                return store;
            }
            Err(e) => {
                warn!(
                    path = %store.path.display(),
                    error = %e,
                    "Could not read mapping file, starting from an empty mapping"
                );
                store.degraded = true;
                return store;
            }
        };

        match MappingFile::parse(&content) {
            Ok(data) => store.data = data,
            Err(e) => {
                warn!(
                    path = %store.path.display(),
                    error = %e,
                    "Mapping file is corrupt, starting from an empty mapping"
                );
                store.degraded = true;
            }
        }

        store
    }

    /// Write to `<file>.tmp`, then rename over the real file.
    pub fn save(&self) -> SyncResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(&self.data)
            .map_err(|e| SyncError::Serialization(e.to_string()))?;

        let temp = self.temp_path();
        std::fs::write(&temp, content)
            .map_err(|e| SyncError::Store(format!("Could not write {}: {e}", temp.display())))?;
        std::fs::rename(&temp, &self.path).map_err(|e| {
            SyncError::Store(format!("Could not replace {}: {e}", self.path.display()))
        })?;

        Ok(())
    }

    /// Remove the backing file. Missing files are fine.
    pub fn delete_file(&self) -> SyncResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when the file existed but could not be read or parsed.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn get(&self, source_id: &str) -> Option<&MappingEntry> {
        self.data.entries.get(source_id)
    }

    pub fn target_id(&self, source_id: &str) -> Option<&str> {
        self.get(source_id).map(|e| e.target_id.as_str())
    }

    /// Insert or replace the entry for `source_id`.
    ///
    /// Target ids stay unique: another entry pointing at the same target is
    /// dropped.
    pub fn put(&mut self, source_id: impl Into<String>, entry: MappingEntry) {
        let source_id = source_id.into();

        let stale: Vec<String> = self
            .data
            .entries
            .iter()
            .filter(|(id, e)| **id != source_id && e.target_id == entry.target_id)
            .map(|(id, _)| id.clone())
            .collect();

        for id in stale {
            warn!(source_id = %id, target_id = %entry.target_id, "Dropping duplicate mapping");
            self.data.entries.remove(&id);
        }

        self.data.entries.insert(source_id, entry);
    }

    pub fn remove(&mut self, source_id: &str) -> Option<MappingEntry> {
        self.data.entries.remove(source_id)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &MappingEntry)> {
        self.data.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.data.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.entries.is_empty()
    }

    pub fn watermark(&self) -> Option<DateTime<Utc>> {
        self.data.watermark
    }

    pub fn set_watermark(&mut self, watermark: DateTime<Utc>) {
        self.data.watermark = Some(watermark);
    }
}

impl PartialEq for MappingStore {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}
