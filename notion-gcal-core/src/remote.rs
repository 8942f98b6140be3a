//! Collaborator traits for the source collection and the target calendar.
//!
//! Implementations own credentials, pagination and wire formats; they report
//! failures as `RemoteError` and never retry on the engine's behalf.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::RemoteError;
use crate::event::{NormalizedEvent, TargetEvent};
use crate::record::SourceRecord;

#[async_trait]
pub trait SourceCollection: Send + Sync {
    /// Single metadata fetch: when was anything in the collection last edited.
    async fn last_modified(&self, collection_id: &str) -> Result<DateTime<Utc>, RemoteError>;

    /// Every schedulable record currently in the collection.
    async fn list_records(&self, collection_id: &str) -> Result<Vec<SourceRecord>, RemoteError>;
}

#[async_trait]
pub trait TargetCalendar: Send + Sync {
    /// Returns the id the target assigned to the new event.
    async fn create_event(&self, event: &NormalizedEvent) -> Result<String, RemoteError>;

    async fn update_event(&self, target_id: &str, event: &NormalizedEvent)
    -> Result<(), RemoteError>;

    /// Deleting an event that is already gone succeeds.
    async fn delete_event(&self, target_id: &str) -> Result<(), RemoteError>;

    /// `None` when the event no longer exists.
    async fn get_event(&self, target_id: &str) -> Result<Option<TargetEvent>, RemoteError>;

    /// Ids of every live event this tool created, whether mapped or not.
    async fn list_managed_events(&self) -> Result<Vec<String>, RemoteError>;
}

/// Run a collaborator call, turning an elapsed `limit` into a timeout error.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, RemoteError>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(RemoteError::timeout(limit)),
    }
}
