//! Turning "something changed" notifications into engine runs.
//!
//! Triggers never block the caller. The worker runs one pass at a time and
//! at most one trigger waits behind the active pass; anything arriving while
//! that slot is taken folds into it.

use std::sync::Arc;

use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::engine::{Engine, RunOptions};
use crate::sync::RunOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// A change notification from the source
    Notification,
    /// The periodic poll ticker
    Schedule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerAck {
    /// A pass is now queued
    Accepted,
    /// A pass was already queued and will cover this change
    Coalesced,
    /// Not our collection, or the worker is gone
    Ignored,
}

/// Compare collection ids the way the source formats them in different
/// places: with or without dashes, in any case.
pub fn same_collection(a: &str, b: &str) -> bool {
    canonical_id(a) == canonical_id(b)
}

fn canonical_id(id: &str) -> String {
    id.chars()
        .filter(|c| *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// A bounded queue of one pending pass.
pub fn channel(collection_id: &str) -> (TriggerHandle, Receiver<TriggerReason>) {
    let (tx, rx) = mpsc::channel(1);
    let handle = TriggerHandle {
        collection_id: collection_id.to_string(),
        tx,
    };
    (handle, rx)
}

#[derive(Debug, Clone)]
pub struct TriggerHandle {
    collection_id: String,
    tx: Sender<TriggerReason>,
}

impl TriggerHandle {
    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    /// Queue a pass if `collection_id` names the synced collection.
    pub fn trigger(&self, collection_id: &str) -> TriggerAck {
        if !same_collection(collection_id, &self.collection_id) {
            debug!(collection_id, "Notification for another collection, ignoring");
            return TriggerAck::Ignored;
        }
        self.send(TriggerReason::Notification)
    }

    /// Queue a pass from the poll ticker.
    pub fn tick(&self) -> TriggerAck {
        self.send(TriggerReason::Schedule)
    }

    fn send(&self, reason: TriggerReason) -> TriggerAck {
        match self.tx.try_send(reason) {
            Ok(()) => TriggerAck::Accepted,
            Err(TrySendError::Full(_)) => {
                debug!(?reason, "A pass is already queued, coalescing");
                TriggerAck::Coalesced
            }
            Err(TrySendError::Closed(_)) => {
                warn!(?reason, "Sync worker has stopped, dropping trigger");
                TriggerAck::Ignored
            }
        }
    }
}

pub struct SyncWorker;

impl SyncWorker {
    /// Start the worker task. It exits once every handle is dropped.
    pub fn spawn(engine: Arc<Engine>) -> (TriggerHandle, JoinHandle<()>) {
        let (handle, mut rx) = channel(&engine.settings().collection_id);

        let task = tokio::spawn(async move {
            while let Some(reason) = rx.recv().await {
                debug!(?reason, "Starting triggered sync");
                // Deleting a page does not move the collection timestamp
                let options = RunOptions {
                    ignore_gate: reason == TriggerReason::Notification,
                    ..RunOptions::default()
                };
                match engine.run(options).await {
                    Ok(outcome) => log_outcome(&outcome),
                    Err(e) => error!(error = %e, "Triggered sync failed"),
                }
            }
            debug!("Trigger channel closed, sync worker exiting");
        });

        (handle, task)
    }
}

fn log_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Completed { summary } if summary.failed > 0 => {
            warn!(failed = summary.failed, "Triggered sync finished with failures")
        }
        RunOutcome::Completed { summary } => {
            info!(applied = summary.applied(), "Triggered sync finished")
        }
        RunOutcome::SafetyAbort { .. } => warn!("Triggered sync aborted by the safety guard"),
        RunOutcome::Busy => info!("Sync already running elsewhere, trigger dropped"),
        RunOutcome::Skipped { .. } | RunOutcome::DryRun { .. } => {}
    }
}
