//! Planning types for one reconciliation pass.

mod action;
mod outcome;
mod plan;

pub use action::{ActionKind, SyncAction};
pub use outcome::{ActionFailure, RunOutcome, SyncSummary};
pub use plan::{SyncPlan, TargetSnapshot};
