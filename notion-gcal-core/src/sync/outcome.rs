//! What a run did, for logging and exit codes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{FailureKind, RemoteError};
use crate::sync::{ActionKind, SyncAction, SyncPlan};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionFailure {
    pub action: ActionKind,
    pub source_id: String,
    pub label: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Tally of an applied plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub failed: usize,
    pub failures_by_kind: BTreeMap<FailureKind, usize>,
    pub failures: Vec<ActionFailure>,
}

impl SyncSummary {
    pub fn record_success(&mut self, kind: ActionKind) {
        match kind {
            ActionKind::Create => self.created += 1,
            ActionKind::Update => self.updated += 1,
            ActionKind::Delete => self.deleted += 1,
        }
    }

    pub fn record_failure(&mut self, action: &SyncAction, error: &RemoteError) {
        self.record_error(action.kind(), action.source_id(), action.label(), error);
    }

    /// A failure that happened before there was an action to blame.
    pub fn record_error(
        &mut self,
        action: ActionKind,
        source_id: &str,
        label: &str,
        error: &RemoteError,
    ) {
        self.failed += 1;
        *self.failures_by_kind.entry(error.kind).or_insert(0) += 1;
        self.failures.push(ActionFailure {
            action,
            source_id: source_id.to_string(),
            label: label.to_string(),
            kind: error.kind,
            message: error.message.clone(),
        });
    }

    pub fn merge(&mut self, other: SyncSummary) {
        self.created += other.created;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.failed += other.failed;
        for (kind, count) in other.failures_by_kind {
            *self.failures_by_kind.entry(kind).or_insert(0) += count;
        }
        self.failures.extend(other.failures);
    }

    pub fn applied(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// How a run ended. Only fatal errors are `Err`; everything here is a
/// legitimate result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The collection has not changed since the last complete pass
    Skipped {
        last_modified: DateTime<Utc>,
        watermark: Option<DateTime<Utc>>,
    },
    /// Another pass holds the run lock; this trigger was dropped
    Busy,
    /// Refused a suspicious mass deletion; nothing was applied
    SafetyAbort {
        source_records: usize,
        mapped: usize,
        threshold: usize,
    },
    /// Plan computed but not applied
    DryRun { plan: SyncPlan },
    Completed { summary: SyncSummary },
}

impl RunOutcome {
    pub fn is_safety_abort(&self) -> bool {
        matches!(self, RunOutcome::SafetyAbort { .. })
    }
}
