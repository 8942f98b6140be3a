//! Core of notion-gcal.
//!
//! This crate holds everything that decides *what* to do to the calendar:
//! - `record` and `event` for the source and target data shapes
//! - `content` and `normalize` to turn a source record into an event
//! - `mapping`, `gate` and `safety` for persistence and run guards
//! - `sync` and `engine` for planning and applying actions
//! - `trigger` for notification-driven runs
//!
//! Talking to Notion and Google lives in the provider crates, which implement
//! the traits in `remote`.

pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod event;
pub mod gate;
pub mod lock;
pub mod mapping;
pub mod normalize;
pub mod record;
pub mod remote;
pub mod safety;
pub mod sync;
pub mod trigger;

#[cfg(test)]
pub(crate) mod test_support;

pub use engine::{Engine, EngineSettings, RunOptions};
pub use error::{FailureKind, RemoteError, SyncError, SyncResult};
pub use event::{EventTime, NormalizedEvent, TargetEvent};
pub use record::{BlockKind, ContentBlock, RecordSchedule, SourceRecord};
pub use sync::{RunOutcome, SyncAction, SyncPlan, SyncSummary};
